//! Shopping cart.

use std::cell::RefCell;

use larek_core::{Price, ProductId};
use serde::Serialize;

use crate::events::{Event, EventBus};
use crate::models::Product;

/// What every [`Event::CartChanged`] carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub items: Vec<ProductId>,
    pub total: Price,
    pub count: usize,
}

/// An ordered set of products.
///
/// Each mutator publishes [`Event::CartChanged`] exactly when it changed the
/// item set and returns whether it did; no-op calls are silent.
#[derive(Debug)]
pub struct CartModel {
    bus: EventBus,
    items: RefCell<Vec<Product>>,
}

impl CartModel {
    /// Create an empty cart publishing on `bus`.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            items: RefCell::new(Vec::new()),
        }
    }

    /// Append `product` unless a product with the same id is present.
    pub fn add_item(&self, product: &Product) -> bool {
        {
            let mut items = self.items.borrow_mut();
            if items.iter().any(|p| p.id == product.id) {
                return false;
            }
            items.push(product.clone());
        }
        self.notify();
        true
    }

    /// Remove the product with `id`, if present.
    pub fn remove_item(&self, id: &ProductId) -> bool {
        {
            let mut items = self.items.borrow_mut();
            let before = items.len();
            items.retain(|p| &p.id != id);
            if items.len() == before {
                return false;
            }
        }
        self.notify();
        true
    }

    /// Remove everything.
    pub fn clear_cart(&self) -> bool {
        {
            let mut items = self.items.borrow_mut();
            if items.is_empty() {
                return false;
            }
            items.clear();
        }
        self.notify();
        true
    }

    /// Add `product` when absent, remove it when present. Returns whether
    /// the product is in the cart afterwards.
    pub fn toggle(&self, product: &Product) -> bool {
        if self.contains(&product.id) {
            self.remove_item(&product.id);
            false
        } else {
            self.add_item(product);
            true
        }
    }

    /// Sum of the cost of the current items.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.borrow().iter().map(|p| p.cost).sum()
    }

    /// Whether a product with `id` is in the cart.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.items.borrow().iter().any(|p| &p.id == id)
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<Product> {
        self.items.borrow().clone()
    }

    /// Ids of the items in insertion order.
    #[must_use]
    pub fn item_ids(&self) -> Vec<ProductId> {
        self.items.borrow().iter().map(|p| p.id.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Current ids, total and count.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary {
            items: self.item_ids(),
            total: self.total(),
            count: self.len(),
        }
    }

    fn notify(&self) {
        let summary = self.summary();
        tracing::debug!(count = summary.count, total = %summary.total, "cart changed");
        self.bus.publish(Event::CartChanged(summary));
    }
}
