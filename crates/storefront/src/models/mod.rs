//! Storefront state holders.
//!
//! Each model owns one slice of application state behind interior
//! mutability and announces every actual change on the [`EventBus`]. Models
//! never render and never talk to the network.
//!
//! [`EventBus`]: crate::events::EventBus

pub mod cart;
pub mod order;
pub mod product;

pub use cart::{CartModel, CartSummary};
pub use order::{
    CheckoutStep, ContactsFormState, FormField, OrderDraft, OrderFormState, OrderModel,
    Validation,
};
pub use product::{ImageResolver, Product, ProductError, ProductModel, RawProduct};
