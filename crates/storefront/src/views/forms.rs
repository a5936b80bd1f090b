//! The two checkout forms.
//!
//! Forms only echo state: every keystroke goes out as an intent, the order
//! model updates the draft and the presenter renders the new state back.

use std::cell::{Cell, RefCell};

use askama::Template;
use larek_core::PaymentMethod;

use super::{Result, Shell};
use crate::events::{ContactInput, DeliveryInput, Event, EventBus};
use crate::models::{ContactsFormState, FormField, OrderFormState};

/// A payment button of the delivery form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOption {
    pub name: &'static str,
    pub label: &'static str,
    pub active: bool,
}

impl PaymentOption {
    fn all(selected: Option<PaymentMethod>) -> Vec<Self> {
        PaymentMethod::ALL
            .into_iter()
            .map(|method| Self {
                name: method.as_str(),
                label: match method {
                    PaymentMethod::Card => "Online",
                    PaymentMethod::Cash => "On delivery",
                },
                active: selected == Some(method),
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "order.html")]
struct OrderTemplate<'a> {
    options: Vec<PaymentOption>,
    address: &'a str,
    errors: &'a str,
    submit_enabled: bool,
}

#[derive(Template)]
#[template(path = "contacts.html")]
struct ContactsTemplate<'a> {
    email: &'a str,
    phone: &'a str,
    errors: &'a str,
    submit_enabled: bool,
    submitting: bool,
}

// =============================================================================
// OrderForm
// =============================================================================

/// Delivery step: payment method and address.
#[derive(Debug)]
pub struct OrderForm {
    bus: EventBus,
    state: RefCell<OrderFormState>,
    html: RefCell<String>,
}

impl OrderForm {
    /// # Errors
    ///
    /// Fails when the shell has no `#order` template.
    pub fn new(bus: EventBus, shell: &Shell) -> Result<Self> {
        shell.ensure("order")?;
        Ok(Self {
            bus,
            state: RefCell::new(OrderFormState::default()),
            html: RefCell::new(String::new()),
        })
    }

    /// Render `state`. The submit button is enabled iff the step is valid.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, state: OrderFormState) -> Result<String> {
        let html = OrderTemplate {
            options: PaymentOption::all(state.payment),
            address: &state.address,
            errors: &state.errors,
            submit_enabled: state.valid,
        }
        .render()?;

        self.state.replace(state);
        self.html.replace(html.clone());
        Ok(html)
    }

    pub fn select_payment(&self, method: PaymentMethod) {
        self.bus
            .publish(Event::OrderInput(DeliveryInput::Payment(method)));
    }

    pub fn input_address(&self, value: &str) {
        self.bus
            .publish(Event::OrderInput(DeliveryInput::Address(value.to_string())));
    }

    pub fn blur_address(&self) {
        self.bus.publish(Event::FieldBlur(FormField::Address));
    }

    /// The form was submitted. The model decides whether the step passes.
    pub fn submit(&self) {
        self.bus.publish(Event::OrderSubmit);
    }

    #[must_use]
    pub fn state(&self) -> OrderFormState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn submit_enabled(&self) -> bool {
        self.state.borrow().valid
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.html.borrow().clone()
    }
}

// =============================================================================
// ContactsForm
// =============================================================================

/// Contacts step: email and phone.
///
/// Besides the model state it tracks whether an order is in flight (the
/// submit button stays disabled meanwhile) and an optional notice, such as
/// a retry message, shown in place of validation errors.
#[derive(Debug)]
pub struct ContactsForm {
    bus: EventBus,
    state: RefCell<ContactsFormState>,
    submitting: Cell<bool>,
    notice: RefCell<Option<String>>,
    html: RefCell<String>,
}

impl ContactsForm {
    /// # Errors
    ///
    /// Fails when the shell has no `#contacts` template.
    pub fn new(bus: EventBus, shell: &Shell) -> Result<Self> {
        shell.ensure("contacts")?;
        Ok(Self {
            bus,
            state: RefCell::new(ContactsFormState::default()),
            submitting: Cell::new(false),
            notice: RefCell::new(None),
            html: RefCell::new(String::new()),
        })
    }

    /// Render `state` with the current submitting flag and notice.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, state: ContactsFormState) -> Result<String> {
        self.state.replace(state);
        self.rerender()
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn set_submitting(&self, submitting: bool) -> Result<String> {
        self.submitting.set(submitting);
        self.rerender()
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn set_notice(&self, notice: Option<String>) -> Result<String> {
        self.notice.replace(notice);
        self.rerender()
    }

    pub fn input_email(&self, value: &str) {
        self.bus
            .publish(Event::ContactsInput(ContactInput::Email(value.to_string())));
    }

    pub fn input_phone(&self, value: &str) {
        self.bus
            .publish(Event::ContactsInput(ContactInput::Phone(value.to_string())));
    }

    pub fn blur(&self, field: FormField) {
        self.bus.publish(Event::FieldBlur(field));
    }

    pub fn submit(&self) {
        self.bus.publish(Event::ContactsSubmit);
    }

    #[must_use]
    pub fn state(&self) -> ContactsFormState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn submitting(&self) -> bool {
        self.submitting.get()
    }

    #[must_use]
    pub fn notice(&self) -> Option<String> {
        self.notice.borrow().clone()
    }

    /// Enabled iff the step is valid and no order is in flight.
    #[must_use]
    pub fn submit_enabled(&self) -> bool {
        self.state.borrow().valid && !self.submitting.get()
    }

    /// Message under the form: the notice if any, else validation errors.
    #[must_use]
    pub fn errors(&self) -> String {
        self.notice
            .borrow()
            .clone()
            .unwrap_or_else(|| self.state.borrow().errors.clone())
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.html.borrow().clone()
    }

    fn rerender(&self) -> Result<String> {
        let errors = self.errors();
        let html = {
            let state = self.state.borrow();
            ContactsTemplate {
                email: &state.email,
                phone: &state.phone,
                errors: &errors,
                submit_enabled: self.submit_enabled(),
                submitting: self.submitting.get(),
            }
            .render()?
        };
        self.html.replace(html.clone());
        Ok(html)
    }
}
