//! Checkout draft and its two-step validation state machine.
//!
//! ```text
//!   Closed --open_step1--> Delivery --submit_step1 (valid)--> Contacts
//!      ^                                                          |
//!      +------------- reset (order placed / checkout abandoned) --+
//! ```
//!
//! Error text is computed on demand and only shown once the matching
//! show-errors flag is up: after a failed submit or after leaving a required
//! field empty. Re-opening a step lowers its flag again.

use std::cell::{Cell, RefCell};

use larek_core::{Email, PaymentMethod, Phone};
use serde::Serialize;

use crate::api::OrderPayload;
use crate::events::{Event, EventBus};
use crate::models::CartModel;

/// User-facing validation messages.
pub mod messages {
    pub const ADDRESS_REQUIRED: &str = "address required";
    pub const PAYMENT_REQUIRED: &str = "payment method required";
    pub const EMAIL_REQUIRED: &str = "email required";
    pub const EMAIL_INVALID: &str = "email is invalid";
    pub const PHONE_REQUIRED: &str = "phone required";
    pub const PHONE_INVALID: &str = "phone is invalid";
    pub const BASKET_EMPTY: &str = "basket is empty";
    pub const STEP_NOT_OPEN: &str = "checkout step is not open";
}

/// A text field of the checkout forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Address,
    Email,
    Phone,
}

impl std::str::FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address" => Ok(Self::Address),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            _ => Err(format!("unknown form field: {s}")),
        }
    }
}

/// Which checkout step is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutStep {
    #[default]
    Closed,
    Delivery,
    Contacts,
}

/// The in-progress checkout form state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderDraft {
    pub payment: Option<PaymentMethod>,
    pub address: String,
    pub email: String,
    pub phone: String,
}

/// Outcome of a validation check. Never an error: an invalid draft only
/// blocks a transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub errors: String,
}

impl Validation {
    /// A passing check.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            valid: true,
            errors: String::new(),
        }
    }

    /// A failing check with `message`.
    #[must_use]
    pub fn fail(message: &str) -> Self {
        Self {
            valid: false,
            errors: message.to_string(),
        }
    }
}

/// Everything the delivery form renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderFormState {
    pub payment: Option<PaymentMethod>,
    pub address: String,
    pub valid: bool,
    /// Empty unless step 1 errors are shown.
    pub errors: String,
}

/// Everything the contacts form renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactsFormState {
    pub email: String,
    pub phone: String,
    pub valid: bool,
    /// Empty unless step 2 errors are shown.
    pub errors: String,
}

/// Checkout draft plus the UI flags gating its error messages.
#[derive(Debug)]
pub struct OrderModel {
    bus: EventBus,
    draft: RefCell<OrderDraft>,
    step: Cell<CheckoutStep>,
    show_step1_errors: Cell<bool>,
    show_step2_errors: Cell<bool>,
    last_blurred: Cell<Option<FormField>>,
}

impl OrderModel {
    /// Create an empty draft publishing on `bus`.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            draft: RefCell::new(OrderDraft::default()),
            step: Cell::new(CheckoutStep::Closed),
            show_step1_errors: Cell::new(false),
            show_step2_errors: Cell::new(false),
            last_blurred: Cell::new(None),
        }
    }

    // =========================================================================
    // Field setters
    // =========================================================================

    pub fn set_payment(&self, method: PaymentMethod) {
        self.draft.borrow_mut().payment = Some(method);
        self.bus.publish(Event::OrderChanged);
    }

    pub fn set_address(&self, address: &str) {
        address.clone_into(&mut self.draft.borrow_mut().address);
        self.bus.publish(Event::OrderChanged);
    }

    pub fn set_email(&self, email: &str) {
        email.clone_into(&mut self.draft.borrow_mut().email);
        self.bus.publish(Event::OrderChanged);
    }

    pub fn set_phone(&self, phone: &str) {
        phone.clone_into(&mut self.draft.borrow_mut().phone);
        self.bus.publish(Event::OrderChanged);
    }

    /// Snapshot of the draft.
    #[must_use]
    pub fn draft(&self) -> OrderDraft {
        self.draft.borrow().clone()
    }

    #[must_use]
    pub fn step(&self) -> CheckoutStep {
        self.step.get()
    }

    #[must_use]
    pub fn show_step1_errors(&self) -> bool {
        self.show_step1_errors.get()
    }

    #[must_use]
    pub fn show_step2_errors(&self) -> bool {
        self.show_step2_errors.get()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Delivery step: address first, then payment method.
    #[must_use]
    pub fn validate_step1(&self) -> Validation {
        let draft = self.draft.borrow();
        if draft.address.trim().is_empty() {
            return Validation::fail(messages::ADDRESS_REQUIRED);
        }
        if draft.payment.is_none() {
            return Validation::fail(messages::PAYMENT_REQUIRED);
        }
        Validation::ok()
    }

    /// Contacts step. Email is checked before phone unless `prefer` names
    /// the phone field.
    #[must_use]
    pub fn validate_step2(&self, prefer: Option<FormField>) -> Validation {
        let draft = self.draft.borrow();
        let email = check_email(&draft.email);
        let phone = check_phone(&draft.phone);

        let ordered = if prefer == Some(FormField::Phone) {
            [phone, email]
        } else {
            [email, phone]
        };

        ordered
            .into_iter()
            .flatten()
            .next()
            .map_or_else(Validation::ok, Validation::fail)
    }

    /// Both steps; the first failure wins.
    #[must_use]
    pub fn validate_all(&self) -> Validation {
        let step1 = self.validate_step1();
        if !step1.valid {
            return step1;
        }
        self.validate_step2(self.last_blurred.get())
    }

    // =========================================================================
    // Step transitions
    // =========================================================================

    /// Open the delivery step with its errors hidden.
    pub fn open_step1(&self) {
        self.step.set(CheckoutStep::Delivery);
        self.set_flag(&self.show_step1_errors, false);
    }

    /// Open the contacts step with its errors hidden.
    pub fn open_step2(&self) {
        self.step.set(CheckoutStep::Contacts);
        self.last_blurred.set(None);
        self.set_flag(&self.show_step2_errors, false);
    }

    /// Try to leave the delivery step. Moves to contacts when valid,
    /// otherwise shows the step 1 errors. Fails without side effects unless
    /// the delivery step is open.
    pub fn submit_step1(&self) -> Validation {
        if self.step.get() != CheckoutStep::Delivery {
            return Validation::fail(messages::STEP_NOT_OPEN);
        }
        let validation = self.validate_step1();
        if validation.valid {
            self.open_step2();
        } else {
            self.set_flag(&self.show_step1_errors, true);
        }
        validation
    }

    /// Check the whole draft before placing the order, showing the step 2
    /// errors when it fails. Fails without side effects unless the contacts
    /// step is open.
    pub fn submit_step2(&self) -> Validation {
        if self.step.get() != CheckoutStep::Contacts {
            return Validation::fail(messages::STEP_NOT_OPEN);
        }
        let validation = self.validate_all();
        if !validation.valid {
            self.set_flag(&self.show_step2_errors, true);
        }
        validation
    }

    /// The user left `field`. Leaving a required field empty shows the
    /// errors of its step.
    pub fn blur(&self, field: FormField) {
        self.last_blurred.set(Some(field));
        let draft = self.draft();
        match field {
            FormField::Address if draft.address.trim().is_empty() => {
                self.set_flag(&self.show_step1_errors, true);
            }
            FormField::Email if draft.email.trim().is_empty() => {
                self.set_flag(&self.show_step2_errors, true);
            }
            FormField::Phone if draft.phone.trim().is_empty() => {
                self.set_flag(&self.show_step2_errors, true);
            }
            _ => {}
        }
    }

    /// Leave checkout without touching the draft.
    pub fn close(&self) {
        self.step.set(CheckoutStep::Closed);
    }

    /// Empty the draft, hide all errors and close checkout.
    pub fn reset(&self) {
        self.draft.replace(OrderDraft::default());
        self.step.set(CheckoutStep::Closed);
        self.show_step1_errors.set(false);
        self.show_step2_errors.set(false);
        self.last_blurred.set(None);
        self.bus.publish(Event::OrderChanged);
    }

    // =========================================================================
    // View state
    // =========================================================================

    #[must_use]
    pub fn to_order_form_state(&self) -> OrderFormState {
        let validation = self.validate_step1();
        let draft = self.draft.borrow();
        OrderFormState {
            payment: draft.payment,
            address: draft.address.clone(),
            valid: validation.valid,
            errors: if self.show_step1_errors.get() {
                validation.errors
            } else {
                String::new()
            },
        }
    }

    #[must_use]
    pub fn to_contacts_form_state(&self) -> ContactsFormState {
        let validation = self.validate_step2(self.last_blurred.get());
        let draft = self.draft.borrow();
        ContactsFormState {
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            valid: validation.valid,
            errors: if self.show_step2_errors.get() {
                validation.errors
            } else {
                String::new()
            },
        }
    }

    /// Build the order payload from the draft and `cart`. `None` while no
    /// payment method is selected or a contact field does not parse.
    #[must_use]
    pub fn to_payload(&self, cart: &CartModel) -> Option<OrderPayload> {
        let draft = self.draft.borrow();
        Some(OrderPayload {
            payment: draft.payment?,
            address: draft.address.trim().to_string(),
            email: Email::parse(draft.email.trim()).ok()?,
            phone: Phone::parse(draft.phone.trim()).ok()?,
            items: cart.item_ids(),
            total: cart.total(),
        })
    }

    fn set_flag(&self, flag: &Cell<bool>, value: bool) {
        if flag.replace(value) != value {
            self.bus.publish(Event::OrderChanged);
        }
    }
}

fn check_email(raw: &str) -> Option<&'static str> {
    let email = raw.trim();
    if email.is_empty() {
        Some(messages::EMAIL_REQUIRED)
    } else if Email::parse(email).is_err() {
        Some(messages::EMAIL_INVALID)
    } else {
        None
    }
}

fn check_phone(raw: &str) -> Option<&'static str> {
    let phone = raw.trim();
    if phone.is_empty() {
        Some(messages::PHONE_REQUIRED)
    } else if Phone::parse(phone).is_err() {
        Some(messages::PHONE_INVALID)
    } else {
        None
    }
}
