//! Wires models, views and the API together over the event bus.
//!
//! # Flow
//!
//! ```text
//! view intent ──> bus ──> Storefront handler ──> model mutation
//!                                                    │
//!      view render <── Storefront handler <── bus <──┘ (model notification)
//! ```
//!
//! Handlers hold weak references to the [`Storefront`], so the bus never
//! keeps it alive. Order submission is the only asynchronous intent; it runs
//! with [`tokio::task::spawn_local`] and therefore needs a
//! [`tokio::task::LocalSet`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use larek_core::{Price, ProductId};
use tracing::{debug, info, warn};

use crate::api::{ApiError, CommerceApi, OrderPayload};
use crate::error::{add_breadcrumb, report_error};
use crate::events::{ContactInput, DeliveryInput, Event, EventBus, EventKind, Handler};
use crate::models::order::messages;
use crate::models::{
    CartModel, CartSummary, CheckoutStep, FormField, ImageResolver, OrderModel, Product,
    ProductModel, Validation,
};
use crate::views::{
    Basket, ContactsForm, Modal, OrderForm, Page, ProductCard, ProductPreview, Shell, SuccessView,
    ViewError,
};

/// Shown on the contacts form when the API refuses or cannot take an order.
pub const RETRY_MESSAGE: &str = "Could not place the order. Please try again.";

/// What the modal currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    None,
    Preview(ProductId),
    Basket,
    Delivery,
    Contacts,
    Success,
}

impl Screen {
    /// Whether this is one of the checkout steps.
    #[must_use]
    pub const fn is_checkout(&self) -> bool {
        matches!(self, Self::Delivery | Self::Contacts)
    }
}

/// Result of an order submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another submission is in flight; nothing was sent.
    AlreadySubmitting,
    /// The draft did not validate; nothing was sent.
    Invalid(Validation),
    /// The API accepted the order; carries the charged total.
    Placed(Price),
    /// The API call failed; carries the message shown to the user.
    Failed(String),
}

/// Holds the `submitting` latch for the lifetime of one submission.
#[derive(Debug)]
struct SubmitGuard(Rc<Cell<bool>>);

impl SubmitGuard {
    /// `None` when the latch is already held.
    fn engage(latch: &Rc<Cell<bool>>) -> Option<Self> {
        if latch.replace(true) {
            None
        } else {
            Some(Self(Rc::clone(latch)))
        }
    }
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A validated order waiting for the API.
#[derive(Debug)]
struct PendingOrder {
    payload: OrderPayload,
    guard: SubmitGuard,
}

type ViewResult = Result<(), ViewError>;

/// The checkout step a form field belongs to.
const fn step_of(field: FormField) -> CheckoutStep {
    match field {
        FormField::Address => CheckoutStep::Delivery,
        FormField::Email | FormField::Phone => CheckoutStep::Contacts,
    }
}

// =============================================================================
// Storefront
// =============================================================================

/// The storefront application: one bus, three models, the views and the API.
pub struct Storefront<A> {
    bus: EventBus,
    api: A,
    products: ProductModel,
    cart: CartModel,
    order: OrderModel,
    page: Page,
    modal: Modal,
    card: ProductCard,
    preview: ProductPreview,
    basket: Basket,
    order_form: OrderForm,
    contacts_form: ContactsForm,
    success: SuccessView,
    screen: RefCell<Screen>,
    submitting: Rc<Cell<bool>>,
    handlers: RefCell<Vec<(EventKind, Handler)>>,
}

impl<A> std::fmt::Debug for Storefront<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("screen", &self.screen.borrow())
            .field("products", &self.products.len())
            .field("cart", &self.cart.len())
            .field("submitting", &self.submitting.get())
            .finish_non_exhaustive()
    }
}

impl<A: CommerceApi + 'static> Storefront<A> {
    /// Build every model and view against `shell`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::TemplateMissing`] when the shell lacks an id a
    /// view needs.
    pub fn new(
        bus: EventBus,
        api: A,
        images: ImageResolver,
        shell: &Shell,
    ) -> Result<Rc<Self>, ViewError> {
        Ok(Rc::new(Self {
            products: ProductModel::new(bus.clone(), images),
            cart: CartModel::new(bus.clone()),
            order: OrderModel::new(bus.clone()),
            page: Page::new(bus.clone(), shell)?,
            modal: Modal::new(bus.clone(), shell)?,
            card: ProductCard::new(bus.clone(), shell)?,
            preview: ProductPreview::new(bus.clone(), shell)?,
            basket: Basket::new(bus.clone(), shell)?,
            order_form: OrderForm::new(bus.clone(), shell)?,
            contacts_form: ContactsForm::new(bus.clone(), shell)?,
            success: SuccessView::new(bus.clone(), shell)?,
            screen: RefCell::new(Screen::None),
            submitting: Rc::new(Cell::new(false)),
            handlers: RefCell::new(Vec::new()),
            bus,
            api,
        }))
    }

    /// Subscribe the storefront's handlers. Calling it twice is a no-op.
    ///
    /// # Panics
    ///
    /// A [`Event::ContactsSubmit`] published outside a
    /// [`tokio::task::LocalSet`] panics in `spawn_local`.
    pub fn bind(self: &Rc<Self>) {
        if !self.handlers.borrow().is_empty() {
            return;
        }

        // Model notifications
        self.handle(EventKind::CatalogLoaded, |this, event| match event {
            Event::CatalogLoaded(products) => this.render_catalog(products),
            _ => Ok(()),
        });
        self.handle(EventKind::CartChanged, |this, event| match event {
            Event::CartChanged(summary) => this.render_cart(summary),
            _ => Ok(()),
        });
        self.handle(EventKind::PreviewChanged, |this, event| match event {
            Event::PreviewChanged(product) => this.show_preview(product.as_ref()),
            _ => Ok(()),
        });
        self.handle(EventKind::OrderChanged, |this, _| this.render_active_form());

        // Catalog and basket intents
        self.handle(EventKind::CardSelect, |this, event| {
            if let Event::CardSelect(id) = event {
                this.select_product(id);
            }
            Ok(())
        });
        self.handle(EventKind::CartToggle, |this, event| {
            if let Event::CartToggle(id) = event {
                this.toggle_in_cart(id);
            }
            Ok(())
        });
        self.handle(EventKind::BasketOpen, |this, _| this.show_basket());
        self.handle(EventKind::BasketRemove, |this, event| {
            if let Event::BasketRemove(id) = event
                && this.cart.remove_item(id)
            {
                add_breadcrumb("cart", "Removed product", Some(&[("product_id", id.as_str())]));
            }
            Ok(())
        });

        // Checkout intents
        self.handle(EventKind::OrderOpen, |this, _| this.open_checkout());
        self.handle(EventKind::OrderInput, |this, event| {
            if this.order.step() != CheckoutStep::Delivery {
                debug!("delivery input outside the delivery step");
                return Ok(());
            }
            match event {
                Event::OrderInput(DeliveryInput::Payment(method)) => this.order.set_payment(*method),
                Event::OrderInput(DeliveryInput::Address(address)) => this.order.set_address(address),
                _ => {}
            }
            Ok(())
        });
        self.handle(EventKind::ContactsInput, |this, event| {
            if this.order.step() != CheckoutStep::Contacts {
                debug!("contacts input outside the contacts step");
                return Ok(());
            }
            if this.contacts_form.notice().is_some() {
                this.contacts_form.set_notice(None)?;
            }
            match event {
                Event::ContactsInput(ContactInput::Email(email)) => this.order.set_email(email),
                Event::ContactsInput(ContactInput::Phone(phone)) => this.order.set_phone(phone),
                _ => {}
            }
            Ok(())
        });
        self.handle(EventKind::FieldBlur, |this, event| {
            if let Event::FieldBlur(field) = event
                && this.order.step() == step_of(*field)
            {
                this.order.blur(*field);
            }
            Ok(())
        });
        self.handle(EventKind::OrderSubmit, |this, _| this.advance_checkout());

        let weak = Rc::downgrade(self);
        let handler = self.bus.on(EventKind::ContactsSubmit, move |_| {
            let Some(this) = weak.upgrade() else {
                return;
            };
            match this.prepare_submit() {
                Ok(pending) => {
                    tokio::task::spawn_local(async move {
                        this.finish_submit(pending).await;
                    });
                }
                Err(outcome) => debug!(?outcome, "order not sent"),
            }
        });
        self.handlers
            .borrow_mut()
            .push((EventKind::ContactsSubmit, handler));

        // Modal lifecycle
        self.handle(EventKind::ModalOpen, |this, _| this.page.set_locked(true));
        self.handle(EventKind::ModalClose, |this, _| this.on_modal_closed());
        self.handle(EventKind::SuccessClose, |this, _| this.modal.close());
    }

    /// Remove every handler installed by [`bind`](Self::bind).
    pub fn unbind(&self) {
        for (kind, handler) in self.handlers.borrow_mut().drain(..) {
            self.bus.unsubscribe(kind, &handler);
        }
    }

    /// Subscribe `f` through a weak reference. Render failures are reported
    /// and swallowed; the previous markup stays in place.
    fn handle(
        self: &Rc<Self>,
        kind: EventKind,
        f: impl Fn(&Self, &Event) -> ViewResult + 'static,
    ) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let handler = self.bus.on(kind, move |event| {
            let Some(this) = weak.upgrade() else {
                return;
            };
            if let Err(e) = f(&this, event) {
                report_error("failed to update view", &e);
            }
        });
        self.handlers.borrow_mut().push((kind, handler));
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch and install the catalog. A failing API leaves an empty catalog.
    ///
    /// Returns the number of products loaded.
    pub async fn load_catalog(&self) -> usize {
        match self.api.get_products().await {
            Ok(raw) => {
                let count = self.products.set_products(raw);
                info!(count, "catalog loaded");
                count
            }
            Err(e) => {
                report_error("failed to load catalog", &e);
                self.products.set_products(Vec::new())
            }
        }
    }

    /// Preview `id`, fetching it from the API when it is not in the catalog.
    ///
    /// # Errors
    ///
    /// Returns the API error when the product has to be fetched and cannot
    /// be, or [`ApiError::InvalidProduct`] when the fetched record is unusable.
    pub async fn open_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        if let Some(product) = self.products.get_product(id) {
            self.products.set_preview(Some(product.clone()));
            return Ok(product);
        }

        let raw = self.api.get_product_by_id(id).await?;
        let product = self.products.images().normalize(&raw)?;
        self.products.set_preview(Some(product.clone()));
        Ok(product)
    }

    fn render_catalog(&self, products: &[Product]) -> ViewResult {
        let cards = products
            .iter()
            .map(|p| self.card.render(p))
            .collect::<Result<Vec<_>, _>>()?;
        self.page.set_catalog(cards)
    }

    fn select_product(&self, id: &ProductId) {
        match self.products.get_product(id) {
            Some(product) => {
                add_breadcrumb("catalog", "Viewed product", Some(&[("product_id", id.as_str())]));
                self.products.set_preview(Some(product));
            }
            None => warn!(product_id = %id, "selected product is not in the catalog"),
        }
    }

    fn show_preview(&self, product: Option<&Product>) -> ViewResult {
        let Some(product) = product else {
            self.preview.clear();
            return Ok(());
        };
        let html = self.preview.render(product, self.cart.contains(&product.id))?;
        self.set_screen(Screen::Preview(product.id.clone()))?;
        self.modal.open(html)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    fn toggle_in_cart(&self, id: &ProductId) {
        let product = self
            .products
            .get_product(id)
            .or_else(|| self.products.preview().filter(|p| &p.id == id));
        let Some(product) = product else {
            warn!(product_id = %id, "cannot toggle unknown product");
            return;
        };

        let in_cart = self.cart.toggle(&product);
        add_breadcrumb(
            "cart",
            if in_cart { "Added product" } else { "Removed product" },
            Some(&[("product_id", id.as_str())]),
        );
    }

    fn render_cart(&self, summary: &CartSummary) -> ViewResult {
        self.page.set_counter(summary.count)?;
        let basket_html = self.basket.render(&self.cart.items(), summary.total)?;

        match self.screen() {
            Screen::Basket => self.modal.set_content(basket_html),
            Screen::Preview(id) => match self.products.preview().filter(|p| p.id == id) {
                Some(product) => {
                    let html = self.preview.render(&product, self.cart.contains(&id))?;
                    self.modal.set_content(html)
                }
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn show_basket(&self) -> ViewResult {
        let html = self.basket.render(&self.cart.items(), self.cart.total())?;
        self.set_screen(Screen::Basket)?;
        self.modal.open(html)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    fn open_checkout(&self) -> ViewResult {
        if self.cart.is_empty() {
            debug!("checkout requested with an empty basket");
            return Ok(());
        }
        self.set_screen(Screen::Delivery)?;
        self.order.open_step1();
        let html = self.order_form.render(self.order.to_order_form_state())?;
        self.modal.open(html)
    }

    fn advance_checkout(&self) -> ViewResult {
        if !self.order.submit_step1().valid {
            return Ok(());
        }
        self.set_screen(Screen::Contacts)?;
        self.contacts_form.set_notice(None)?;
        let html = self
            .contacts_form
            .render(self.order.to_contacts_form_state())?;
        self.modal.set_content(html)
    }

    fn render_active_form(&self) -> ViewResult {
        match self.screen() {
            Screen::Delivery => {
                let html = self.order_form.render(self.order.to_order_form_state())?;
                self.modal.set_content(html)
            }
            Screen::Contacts => {
                let html = self
                    .contacts_form
                    .render(self.order.to_contacts_form_state())?;
                self.modal.set_content(html)
            }
            _ => Ok(()),
        }
    }

    /// Validate and place the order.
    ///
    /// Only one submission runs at a time; the latch is released whether the
    /// API call succeeds or fails. On success the cart and draft are cleared
    /// and the success view shown. On failure both stay as they were and the
    /// contacts form shows [`RETRY_MESSAGE`].
    pub async fn submit_order(&self) -> SubmitOutcome {
        match self.prepare_submit() {
            Ok(pending) => self.finish_submit(pending).await,
            Err(outcome) => outcome,
        }
    }

    /// Whether an order is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    fn prepare_submit(&self) -> Result<PendingOrder, SubmitOutcome> {
        if self.submitting.get() {
            debug!("order already in flight");
            return Err(SubmitOutcome::AlreadySubmitting);
        }

        let validation = self.order.submit_step2();
        if !validation.valid {
            return Err(SubmitOutcome::Invalid(validation));
        }
        if self.cart.is_empty() {
            return Err(SubmitOutcome::Invalid(Validation::fail(messages::BASKET_EMPTY)));
        }
        let Some(payload) = self.order.to_payload(&self.cart) else {
            return Err(SubmitOutcome::Invalid(Validation::fail(messages::PAYMENT_REQUIRED)));
        };
        let Some(guard) = SubmitGuard::engage(&self.submitting) else {
            return Err(SubmitOutcome::AlreadySubmitting);
        };

        if let Err(e) = self
            .contacts_form
            .set_notice(None)
            .and_then(|_| self.contacts_form.set_submitting(true))
        {
            report_error("failed to update view", &e);
        }
        self.refresh_contacts_in_modal();

        Ok(PendingOrder { payload, guard })
    }

    async fn finish_submit(&self, pending: PendingOrder) -> SubmitOutcome {
        let PendingOrder { payload, guard } = pending;
        add_breadcrumb(
            "checkout",
            "Submitting order",
            Some(&[("payment", payload.payment.as_str())]),
        );

        let result = self.api.create_order(&payload).await;
        drop(guard);
        if let Err(e) = self.contacts_form.set_submitting(false) {
            report_error("failed to update view", &e);
        }

        match result {
            Ok(receipt) => {
                let total = receipt.charged(payload.total);
                info!(
                    order_id = ?receipt.id,
                    %total,
                    "order placed"
                );

                if let Err(e) = self.set_screen(Screen::Success) {
                    report_error("failed to update view", &e);
                }
                self.cart.clear_cart();
                self.order.reset();
                if let Err(e) = self
                    .success
                    .render(total)
                    .and_then(|html| self.modal.open(html))
                {
                    report_error("failed to show order confirmation", &e);
                }

                self.bus.publish(Event::OrderPlaced(total));
                SubmitOutcome::Placed(total)
            }
            Err(e) => {
                report_error("order submission failed", &e);
                if let Err(e) = self.contacts_form.set_notice(Some(RETRY_MESSAGE.to_string())) {
                    report_error("failed to update view", &e);
                }
                self.refresh_contacts_in_modal();

                self.bus.publish(Event::OrderFailed(RETRY_MESSAGE.to_string()));
                SubmitOutcome::Failed(RETRY_MESSAGE.to_string())
            }
        }
    }

    fn refresh_contacts_in_modal(&self) {
        if self.screen() == Screen::Contacts
            && let Err(e) = self.modal.set_content(self.contacts_form.html())
        {
            report_error("failed to update view", &e);
        }
    }

    // =========================================================================
    // Modal
    // =========================================================================

    /// Close the modal, abandoning checkout if it was open.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn close_modal(&self) -> ViewResult {
        self.modal.close()
    }

    fn on_modal_closed(&self) -> ViewResult {
        self.set_screen(Screen::None)?;
        self.order.close();
        self.preview.clear();
        self.page.set_locked(false)
    }

    fn screen(&self) -> Screen {
        self.screen.borrow().clone()
    }

    /// Switch screens. Leaving checkout for anything but the confirmation
    /// abandons the draft, so the checkout step always matches the screen.
    fn set_screen(&self, screen: Screen) -> ViewResult {
        debug!(?screen, "screen");
        let leaving_checkout = !screen.is_checkout() && screen != Screen::Success;
        let previous = self.screen.replace(screen);
        if previous.is_checkout() && leaving_checkout {
            info!("checkout abandoned");
            add_breadcrumb("checkout", "Abandoned checkout", None);
            self.order.reset();
            self.contacts_form.set_notice(None)?;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn current_screen(&self) -> Screen {
        self.screen()
    }

    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub const fn products(&self) -> &ProductModel {
        &self.products
    }

    #[must_use]
    pub const fn cart(&self) -> &CartModel {
        &self.cart
    }

    #[must_use]
    pub const fn order(&self) -> &OrderModel {
        &self.order
    }

    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub const fn modal(&self) -> &Modal {
        &self.modal
    }

    #[must_use]
    pub const fn card(&self) -> &ProductCard {
        &self.card
    }

    #[must_use]
    pub const fn preview(&self) -> &ProductPreview {
        &self.preview
    }

    #[must_use]
    pub const fn basket(&self) -> &Basket {
        &self.basket
    }

    #[must_use]
    pub const fn order_form(&self) -> &OrderForm {
        &self.order_form
    }

    #[must_use]
    pub const fn contacts_form(&self) -> &ContactsForm {
        &self.contacts_form
    }

    #[must_use]
    pub const fn success(&self) -> &SuccessView {
        &self.success
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use larek_core::PaymentMethod;
    use serde_json::json;

    use super::*;
    use crate::api::OrderReceipt;
    use crate::models::RawProduct;

    /// Serves a fixed catalog and accepts or refuses every order.
    struct StubApi {
        catalog: Option<Vec<RawProduct>>,
        accept: bool,
        orders: RefCell<Vec<OrderPayload>>,
    }

    impl StubApi {
        fn new(accept: bool) -> Self {
            let catalog = [("a", 750), ("b", 1450)]
                .into_iter()
                .map(|(id, cost)| {
                    RawProduct::from_value(json!({"id": id, "name": id, "cost": cost})).unwrap()
                })
                .collect();
            Self {
                catalog: Some(catalog),
                accept,
                orders: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommerceApi for StubApi {
        async fn get_products(&self) -> Result<Vec<RawProduct>, ApiError> {
            self.catalog
                .clone()
                .ok_or_else(|| ApiError::NotFound("/products".to_string()))
        }

        async fn get_product_by_id(&self, id: &ProductId) -> Result<RawProduct, ApiError> {
            let cost = if id.as_str() == "huge" { json!(1e30) } else { json!(5) };
            Ok(RawProduct::from_value(json!({"id": id.as_str(), "name": "remote", "cost": cost}))
                .unwrap())
        }

        async fn create_order(&self, payload: &OrderPayload) -> Result<OrderReceipt, ApiError> {
            self.orders.borrow_mut().push(payload.clone());
            if self.accept {
                Ok(OrderReceipt::default())
            } else {
                Err(ApiError::OrderRejected {
                    status: 500,
                    message: "boom".to_string(),
                })
            }
        }
    }

    async fn storefront(accept: bool) -> Rc<Storefront<StubApi>> {
        let app = Storefront::new(
            EventBus::new(),
            StubApi::new(accept),
            ImageResolver::default(),
            &Shell::default(),
        )
        .unwrap();
        app.bind();
        app.load_catalog().await;
        app
    }

    fn fill_checkout(app: &Storefront<StubApi>) {
        app.card().select(&ProductId::new("a"));
        app.preview().toggle();
        app.page().open_basket();
        app.basket().checkout();
        app.order_form().select_payment(PaymentMethod::Card);
        app.order_form().input_address("Elm St 5");
        app.order_form().submit();
        app.contacts_form().input_email("a@b.com");
        app.contacts_form().input_phone("12345678");
    }

    #[tokio::test]
    async fn test_catalog_renders_cards() {
        let app = storefront(true).await;
        assert_eq!(app.products().len(), 2);
        assert_eq!(app.page().card_count(), 2);
        assert!(app.page().html().contains(r#"data-id="b""#));
    }

    #[tokio::test]
    async fn test_failed_catalog_is_empty() {
        let mut api = StubApi::new(true);
        api.catalog = None;
        let app = Storefront::new(EventBus::new(), api, ImageResolver::default(), &Shell::default())
            .unwrap();
        app.bind();
        assert_eq!(app.load_catalog().await, 0);
        assert_eq!(app.page().card_count(), 0);
    }

    #[tokio::test]
    async fn test_preview_toggle_updates_counter_and_button() {
        let app = storefront(true).await;
        app.card().select(&ProductId::new("a"));
        assert_eq!(app.current_screen(), Screen::Preview(ProductId::new("a")));
        assert!(app.modal().is_open());
        assert!(app.page().locked());

        app.preview().toggle();
        assert_eq!(app.page().counter(), 1);
        assert!(app.preview().in_cart());
        assert!(app.modal().content().contains("Remove from basket"));

        app.preview().toggle();
        assert_eq!(app.page().counter(), 0);
        assert!(app.modal().content().contains("Add to basket"));
    }

    #[tokio::test]
    async fn test_checkout_walks_both_steps() {
        let app = storefront(true).await;
        fill_checkout(&app);

        assert_eq!(app.current_screen(), Screen::Contacts);
        assert_eq!(app.order().step(), CheckoutStep::Contacts);
        assert!(app.contacts_form().submit_enabled());

        let outcome = app.submit_order().await;
        assert_eq!(outcome, SubmitOutcome::Placed(Price::from_units(750)));
        assert_eq!(app.current_screen(), Screen::Success);
        assert!(app.cart().is_empty());
        assert_eq!(app.order().draft().address, "");
        assert!(app.modal().content().contains("Charged 750 synapses"));
        assert!(!app.is_submitting());

        app.success().close();
        assert!(!app.modal().is_open());
        assert!(!app.page().locked());
    }

    #[tokio::test]
    async fn test_failed_order_keeps_state() {
        let app = storefront(false).await;
        fill_checkout(&app);

        let outcome = app.submit_order().await;
        assert_eq!(outcome, SubmitOutcome::Failed(RETRY_MESSAGE.to_string()));
        assert_eq!(app.cart().len(), 1);
        assert_eq!(app.order().draft().email, "a@b.com");
        assert_eq!(app.current_screen(), Screen::Contacts);
        assert!(app.modal().content().contains(RETRY_MESSAGE));
        assert!(!app.is_submitting());
        assert!(app.contacts_form().submit_enabled());
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_sent() {
        let app = storefront(true).await;
        fill_checkout(&app);
        app.contacts_form().input_phone("");

        let outcome = app.submit_order().await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(ref v) if v.errors == "phone required"));
        assert!(app.api().orders.borrow().is_empty());
        assert!(app.contacts_form().html().contains("phone required"));
    }

    #[tokio::test]
    async fn test_invalid_delivery_step_stays_open() {
        let app = storefront(true).await;
        app.card().select(&ProductId::new("a"));
        app.preview().toggle();
        app.basket().checkout();
        app.order_form().submit();

        assert_eq!(app.current_screen(), Screen::Delivery);
        assert_eq!(app.order_form().state().errors, "address required");
        assert!(app.modal().content().contains("address required"));
    }

    #[tokio::test]
    async fn test_closing_checkout_resets_draft() {
        let app = storefront(true).await;
        fill_checkout(&app);

        app.close_modal().unwrap();
        assert_eq!(app.current_screen(), Screen::None);
        assert_eq!(app.order().draft(), crate::models::OrderDraft::default());
        assert_eq!(app.cart().len(), 1);

        // Re-entering starts from an empty delivery step.
        app.basket().checkout();
        assert_eq!(app.current_screen(), Screen::Delivery);
        assert!(app.order_form().state().errors.is_empty());
    }

    #[tokio::test]
    async fn test_next_without_checkout_is_ignored() {
        let app = storefront(true).await;
        app.card().select(&ProductId::new("a"));
        app.preview().toggle();
        app.order_form().select_payment(PaymentMethod::Card);
        app.order_form().input_address("Elm St 5");
        app.order_form().submit();

        assert_eq!(app.current_screen(), Screen::Preview(ProductId::new("a")));
        assert_eq!(app.order().step(), CheckoutStep::Closed);
        assert_eq!(app.order().draft(), crate::models::OrderDraft::default());
    }

    #[tokio::test]
    async fn test_confirm_on_delivery_is_refused() {
        let app = storefront(true).await;
        app.card().select(&ProductId::new("a"));
        app.preview().toggle();
        app.basket().checkout();
        app.order_form().select_payment(PaymentMethod::Card);
        app.order_form().input_address("Elm St 5");
        app.contacts_form().input_email("a@b.com");
        app.contacts_form().input_phone("12345678");
        assert_eq!(app.order().draft().email, "");

        let outcome = app.submit_order().await;
        assert!(
            matches!(outcome, SubmitOutcome::Invalid(ref v) if v.errors == messages::STEP_NOT_OPEN)
        );
        assert_eq!(app.current_screen(), Screen::Delivery);
        assert!(app.api().orders.borrow().is_empty());
        assert!(!app.is_submitting());
    }

    #[tokio::test]
    async fn test_basket_from_checkout_discards_draft() {
        let app = storefront(true).await;
        fill_checkout(&app);

        app.page().open_basket();
        assert_eq!(app.current_screen(), Screen::Basket);
        assert_eq!(app.order().step(), CheckoutStep::Closed);
        assert_eq!(app.order().draft(), crate::models::OrderDraft::default());

        app.basket().checkout();
        assert_eq!(app.current_screen(), Screen::Delivery);
        let outcome = app.submit_order().await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert!(app.api().orders.borrow().is_empty());
        assert_eq!(app.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_open_product_refuses_cost_out_of_range() {
        let app = storefront(true).await;
        let err = app.open_product(&ProductId::new("huge")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidProduct(_)));
        assert_eq!(err.status(), None);
        assert!(app.products().preview().is_none());
        assert!(!app.modal().is_open());
    }

    #[tokio::test]
    async fn test_open_product_fetches_unknown_ids() {
        let app = storefront(true).await;
        let product = app.open_product(&ProductId::new("zzz")).await.unwrap();
        assert_eq!(product.name, "remote");
        assert_eq!(app.current_screen(), Screen::Preview(ProductId::new("zzz")));

        app.preview().toggle();
        assert!(app.cart().contains(&ProductId::new("zzz")));
    }

    #[tokio::test]
    async fn test_unbind_detaches_everything() {
        let app = storefront(true).await;
        app.unbind();
        assert!(app.bus().is_empty());
    }

    #[tokio::test]
    async fn test_handlers_do_not_keep_storefront_alive() {
        let bus = EventBus::new();
        let app = Storefront::new(
            bus.clone(),
            StubApi::new(true),
            ImageResolver::default(),
            &Shell::default(),
        )
        .unwrap();
        app.bind();
        let weak = Rc::downgrade(&app);
        drop(app);

        assert!(weak.upgrade().is_none());
        bus.publish(Event::BasketOpen);
    }
}
