//! Integration tests for the Larek storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p larek-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - End-to-end shopping and checkout against [`FakeApi`]
//! - `commerce_api` - The HTTP client against an axum fake backend
//!
//! Nothing here needs network access beyond a loopback listener.

#![allow(clippy::missing_panics_doc)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use axum::Router;
use larek_core::{Price, ProductId};
use larek_storefront::Storefront;
use larek_storefront::api::{ApiError, CommerceApi, OrderPayload, OrderReceipt};
use larek_storefront::events::EventBus;
use larek_storefront::models::{ImageResolver, RawProduct};
use larek_storefront::views::Shell;
use serde_json::{Value, json};
use tokio::sync::Notify;
use url::Url;

// =============================================================================
// In-memory API
// =============================================================================

/// How [`FakeApi`] answers `create_order`.
#[derive(Debug, Clone)]
pub enum OrderResponse {
    Accept(OrderReceipt),
    Reject { status: u16, message: String },
}

/// In-memory [`CommerceApi`] recording every order it receives.
#[derive(Debug)]
pub struct FakeApi {
    products: RefCell<Vec<Value>>,
    catalog_down: Cell<bool>,
    order_response: RefCell<OrderResponse>,
    hold_orders: Cell<bool>,
    release: Notify,
    orders: RefCell<Vec<OrderPayload>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            products: RefCell::new(Vec::new()),
            catalog_down: Cell::new(false),
            order_response: RefCell::new(OrderResponse::Accept(OrderReceipt::default())),
            hold_orders: Cell::new(false),
            release: Notify::new(),
            orders: RefCell::new(Vec::new()),
        }
    }
}

impl FakeApi {
    /// A fake serving `products`.
    #[must_use]
    pub fn with_catalog(products: Vec<Value>) -> Self {
        let api = Self::default();
        api.products.replace(products);
        api
    }

    /// Make `get_products` fail.
    pub fn set_catalog_down(&self, down: bool) {
        self.catalog_down.set(down);
    }

    pub fn set_order_response(&self, response: OrderResponse) {
        self.order_response.replace(response);
    }

    /// Keep `create_order` pending until [`release_order`](Self::release_order).
    pub fn hold_orders(&self, hold: bool) {
        self.hold_orders.set(hold);
    }

    pub fn release_order(&self) {
        self.release.notify_one();
    }

    /// Orders received so far.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderPayload> {
        self.orders.borrow().clone()
    }
}

impl CommerceApi for FakeApi {
    async fn get_products(&self) -> Result<Vec<RawProduct>, ApiError> {
        if self.catalog_down.get() {
            return Err(ApiError::Status {
                method: "GET",
                path: "/product".to_string(),
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self.products.borrow().iter().cloned().map(raw).collect())
    }

    async fn get_product_by_id(&self, id: &ProductId) -> Result<RawProduct, ApiError> {
        let found = self
            .products
            .borrow()
            .iter()
            .find(|p| p.get("id").and_then(Value::as_str) == Some(id.as_str()))
            .cloned();
        found.map(raw).ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderReceipt, ApiError> {
        self.orders.borrow_mut().push(payload.clone());
        if self.hold_orders.get() {
            self.release.notified().await;
        }
        let response = self.order_response.borrow().clone();
        match response {
            OrderResponse::Accept(receipt) => Ok(receipt),
            OrderResponse::Reject { status, message } => {
                Err(ApiError::OrderRejected { status, message })
            }
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Wrap a JSON object as a raw product record.
#[must_use]
pub fn raw(value: Value) -> RawProduct {
    RawProduct::from_value(value).expect("product fixture must be a JSON object")
}

/// Two products costing 750 and 1450.
#[must_use]
pub fn sample_catalog() -> Vec<Value> {
    vec![
        json!({
            "id": "854cef69-976d-4c2a-a18c-2aa45046c390",
            "title": "+1 hour in a day",
            "price": 750,
            "description": "If you planned to finish this task yesterday.",
            "image": "/5_Dots.svg",
            "category": "soft-skill"
        }),
        json!({
            "id": "c101ab44-ed99-4a54-990d-47aa2bb4e7d9",
            "title": "HEX-lollipop",
            "price": 1450,
            "description": "Lick it and ship the release.",
            "image": "/Shell.svg",
            "category": "other"
        }),
    ]
}

/// Id of the first [`sample_catalog`] product.
#[must_use]
pub fn first_id() -> ProductId {
    ProductId::new("854cef69-976d-4c2a-a18c-2aa45046c390")
}

/// Id of the second [`sample_catalog`] product.
#[must_use]
pub fn second_id() -> ProductId {
    ProductId::new("c101ab44-ed99-4a54-990d-47aa2bb4e7d9")
}

/// A bound storefront over `api` with its catalog loaded.
pub async fn storefront(api: FakeApi) -> Rc<Storefront<FakeApi>> {
    let app = Storefront::new(
        EventBus::new(),
        api,
        ImageResolver::new(Some("https://cdn.example.com/content")),
        &Shell::default(),
    )
    .expect("bundled shell has every template");
    app.bind();
    app.load_catalog().await;
    app
}

/// Put `ids` in the cart through the preview, then walk the delivery step
/// and fill the contacts form.
pub fn fill_checkout(app: &Storefront<FakeApi>, ids: &[ProductId]) {
    for id in ids {
        app.card().select(id);
        app.preview().toggle();
    }
    app.page().open_basket();
    app.basket().checkout();
    app.order_form().select_payment(larek_core::PaymentMethod::Card);
    app.order_form().input_address("Elm St 5");
    app.order_form().submit();
    app.contacts_form().input_email("buyer@example.com");
    app.contacts_form().input_phone("+7 (900) 123-45-67");
}

/// Yield to the local task set until `done` holds (at most 100 times).
pub async fn settle(done: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if done() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    done()
}

/// Sum of the costs in [`sample_catalog`] for `ids`.
#[must_use]
pub fn sample_total(ids: &[ProductId]) -> Price {
    ids.iter()
        .map(|id| {
            if *id == first_id() {
                Price::from_units(750)
            } else {
                Price::from_units(1450)
            }
        })
        .sum()
}

// =============================================================================
// HTTP fake backend
// =============================================================================

/// Serve `router` on a loopback port and return its base URL.
pub async fn serve(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("fake backend crashed");
    });
    Url::parse(&format!("http://{addr}")).expect("loopback URL")
}
