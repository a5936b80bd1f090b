//! Product catalog and preview state.

use std::cell::RefCell;
use std::collections::HashSet;

use larek_core::{Price, ProductId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::events::{Event, EventBus};

/// Category assigned to products the server did not categorize.
pub const DEFAULT_CATEGORY: &str = "other";

/// A product record that cannot be mapped onto [`Product`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    /// The cost is a number too large to hold as a [`Price`].
    #[error("cost of product {id:?} is out of range: {cost}")]
    CostOutOfRange { id: String, cost: String },
}

/// A catalog product in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub cost: Price,
    pub desc: String,
    /// Absolute image URL (or the raw path when no CDN is configured).
    pub img_url: String,
    pub category: String,
}

/// A product record as the server sent it.
///
/// Historical API revisions disagree on field names, so the record is kept
/// as a JSON object and mapped onto [`Product`] by [`ImageResolver::normalize`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProduct(Map<String, Value>);

impl RawProduct {
    /// Wrap a JSON value, or `None` when it is not an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// First of `keys` holding a string (numbers are stringified).
    fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// First of `keys` holding a non-null value, with that value parsed as
    /// a price.
    fn price(&self, keys: &[&str]) -> Option<(&Value, Option<Price>)> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            Value::Null => None,
            value => Some((value, serde_json::from_value::<Price>(value.clone()).ok())),
        })
    }
}

impl From<Map<String, Value>> for RawProduct {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Resolves product image paths against the CDN and normalizes records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageResolver {
    cdn: Option<String>,
}

impl ImageResolver {
    /// Resolver joining relative paths onto `cdn`. An empty base counts as
    /// no CDN.
    #[must_use]
    pub fn new(cdn: Option<&str>) -> Self {
        let cdn = cdn
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty());
        Self { cdn }
    }

    /// Resolve an image path.
    ///
    /// Absolute URLs (`http://`, `https://`, protocol-relative `//`) and
    /// `data:` URIs are returned unchanged. Relative paths are joined to the
    /// CDN base with exactly one `/` between them.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }

        let lower = path.to_ascii_lowercase();
        if ["http://", "https://", "//", "data:"]
            .iter()
            .any(|prefix| lower.starts_with(prefix))
        {
            return path.to_string();
        }

        match &self.cdn {
            Some(cdn) => format!("{cdn}/{}", path.trim_start_matches('/')),
            None => path.to_string(),
        }
    }

    /// Map a raw record onto the canonical product shape.
    ///
    /// Accepts `name|title`, `cost|price`, `desc|description` and
    /// `img_url|image|imageUrl`. Missing cost is 0, negative cost clamps to 0,
    /// missing category is [`DEFAULT_CATEGORY`]. A cost that is not numeric
    /// is logged and read as 0.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::CostOutOfRange`] when the cost is a number
    /// beyond what a [`Price`] can hold.
    pub fn normalize(&self, raw: &RawProduct) -> Result<Product, ProductError> {
        let id = raw.text(&["id"]).unwrap_or_default();
        let cost = match raw.price(&["cost", "price"]) {
            None => Price::ZERO,
            Some((_, Some(cost))) => cost,
            Some((Value::Number(n), None)) => {
                return Err(ProductError::CostOutOfRange {
                    id,
                    cost: n.to_string(),
                });
            }
            Some((value, None)) => {
                tracing::warn!(%id, %value, "unreadable product cost, using 0");
                Price::ZERO
            }
        };

        Ok(Product {
            id: ProductId::new(id),
            name: raw.text(&["name", "title"]).unwrap_or_default(),
            cost,
            desc: raw.text(&["desc", "description"]).unwrap_or_default(),
            img_url: self.resolve(&raw.text(&["img_url", "image", "imageUrl"]).unwrap_or_default()),
            category: raw
                .text(&["category"])
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        })
    }
}

/// Holds the catalog and the product currently being previewed.
#[derive(Debug)]
pub struct ProductModel {
    bus: EventBus,
    images: ImageResolver,
    products: RefCell<Vec<Product>>,
    preview: RefCell<Option<Product>>,
}

impl ProductModel {
    /// Create an empty catalog publishing on `bus`.
    #[must_use]
    pub fn new(bus: EventBus, images: ImageResolver) -> Self {
        Self {
            bus,
            images,
            products: RefCell::new(Vec::new()),
            preview: RefCell::new(None),
        }
    }

    /// Replace the catalog with the normalized `raw` records and publish
    /// [`Event::CatalogLoaded`]. Returns the number of products kept.
    ///
    /// Records without an id or with an unusable cost are skipped, and only
    /// the first record of each id is kept, so the catalog stays keyed by
    /// unique ids.
    pub fn set_products(&self, raw: Vec<RawProduct>) -> usize {
        let mut seen = HashSet::new();
        let mut products = Vec::with_capacity(raw.len());

        for record in &raw {
            let product = match self.images.normalize(record) {
                Ok(product) => product,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping product");
                    continue;
                }
            };
            if product.id.as_str().is_empty() {
                tracing::warn!(name = %product.name, "skipping product without id");
                continue;
            }
            if !seen.insert(product.id.clone()) {
                tracing::warn!(id = %product.id, "skipping duplicate product id");
                continue;
            }
            products.push(product);
        }

        let count = products.len();
        self.products.replace(products.clone());
        tracing::debug!(count, "catalog replaced");
        self.bus.publish(Event::CatalogLoaded(products));
        count
    }

    /// Snapshot of the catalog in server order.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.products.borrow().clone()
    }

    /// Look up a product. Absence is not an error.
    #[must_use]
    pub fn get_product(&self, id: &ProductId) -> Option<Product> {
        self.products.borrow().iter().find(|p| &p.id == id).cloned()
    }

    /// Resolver used to normalize records.
    #[must_use]
    pub const fn images(&self) -> &ImageResolver {
        &self.images
    }

    /// Record which product is being inspected and publish
    /// [`Event::PreviewChanged`].
    pub fn set_preview(&self, product: Option<Product>) {
        self.preview.replace(product.clone());
        self.bus.publish(Event::PreviewChanged(product));
    }

    /// The product being inspected.
    #[must_use]
    pub fn preview(&self) -> Option<Product> {
        self.preview.borrow().clone()
    }

    /// Number of products in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.borrow().len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.borrow().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::events::EventKind;

    fn raw(value: Value) -> RawProduct {
        RawProduct::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_canonical_fields() {
        let images = ImageResolver::new(Some("https://cdn.example.com/content/"));
        let product = images.normalize(&raw(json!({
            "id": "a",
            "name": "Widget",
            "cost": 100,
            "desc": "A widget",
            "img_url": "w.png",
            "category": "x"
        })))
        .unwrap();

        assert_eq!(product.id, ProductId::new("a"));
        assert_eq!(product.name, "Widget");
        assert_eq!(product.cost, Price::from_units(100));
        assert_eq!(product.desc, "A widget");
        assert_eq!(product.img_url, "https://cdn.example.com/content/w.png");
        assert_eq!(product.category, "x");
    }

    #[test]
    fn test_normalize_alternate_fields() {
        let images = ImageResolver::new(None);
        let product = images.normalize(&raw(json!({
            "id": 7,
            "title": "Gadget",
            "price": "12.5",
            "description": "Shiny",
            "imageUrl": "https://img.example.com/g.svg"
        })))
        .unwrap();

        assert_eq!(product.id, ProductId::new("7"));
        assert_eq!(product.name, "Gadget");
        assert_eq!(product.cost, Price::from_f64(12.5).unwrap());
        assert_eq!(product.desc, "Shiny");
        assert_eq!(product.img_url, "https://img.example.com/g.svg");
        assert_eq!(product.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_normalize_missing_and_bad_cost() {
        let images = ImageResolver::new(None);
        let cost = |value: Value| images.normalize(&raw(value)).unwrap().cost;
        assert_eq!(cost(json!({"id": "a"})), Price::ZERO);
        assert_eq!(cost(json!({"id": "a", "cost": "n/a"})), Price::ZERO);
        assert_eq!(cost(json!({"id": "a", "cost": -20})), Price::ZERO);
        // Null falls through to the next key.
        assert_eq!(cost(json!({"id": "a", "cost": null, "price": 40})), Price::from_units(40));
    }

    #[test]
    fn test_normalize_rejects_cost_out_of_range() {
        let images = ImageResolver::new(None);
        let err = images
            .normalize(&raw(json!({"id": "a", "cost": 1e30})))
            .unwrap_err();
        assert!(matches!(err, ProductError::CostOutOfRange { ref id, .. } if id == "a"));
    }

    #[test]
    fn test_set_products_skips_cost_out_of_range() {
        let model = ProductModel::new(EventBus::new(), ImageResolver::default());
        let kept = model.set_products(vec![
            raw(json!({"id": "a", "cost": 1e30})),
            raw(json!({"id": "b", "cost": 10})),
        ]);

        assert_eq!(kept, 1);
        assert!(model.get_product(&ProductId::new("a")).is_none());
        assert_eq!(model.get_product(&ProductId::new("b")).unwrap().cost, Price::from_units(10));
    }

    #[test]
    fn test_resolve_images() {
        let images = ImageResolver::new(Some("https://cdn.example.com/"));
        assert_eq!(images.resolve("/a/b.png"), "https://cdn.example.com/a/b.png");
        assert_eq!(images.resolve("HTTPS://x.io/y.png"), "HTTPS://x.io/y.png");
        assert_eq!(images.resolve("//x.io/y.png"), "//x.io/y.png");
        assert_eq!(images.resolve("data:image/png;base64,AA"), "data:image/png;base64,AA");
        assert_eq!(images.resolve(""), "");

        let bare = ImageResolver::new(Some("  "));
        assert_eq!(bare.resolve("a.png"), "a.png");
    }

    #[test]
    fn test_set_products_replaces_and_publishes() {
        let bus = EventBus::new();
        let loaded = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&loaded);
        bus.on(EventKind::CatalogLoaded, move |e| {
            if let Event::CatalogLoaded(list) = e {
                sink.borrow_mut().push(list.len());
            }
        });

        let model = ProductModel::new(bus, ImageResolver::default());
        model.set_products(vec![raw(json!({"id": "a"})), raw(json!({"id": "b"}))]);
        model.set_products(vec![raw(json!({"id": "c"}))]);

        assert_eq!(*loaded.borrow(), vec![2, 1]);
        assert_eq!(model.len(), 1);
        assert!(model.get_product(&ProductId::new("a")).is_none());
        assert!(model.get_product(&ProductId::new("c")).is_some());
    }

    #[test]
    fn test_set_products_drops_duplicates_and_missing_ids() {
        let model = ProductModel::new(EventBus::new(), ImageResolver::default());
        let kept = model.set_products(vec![
            raw(json!({"id": "a", "name": "first"})),
            raw(json!({"name": "anonymous"})),
            raw(json!({"id": "a", "name": "second"})),
        ]);

        assert_eq!(kept, 1);
        assert_eq!(model.get_product(&ProductId::new("a")).unwrap().name, "first");
    }

    #[test]
    fn test_preview_publishes() {
        let bus = EventBus::new();
        let previews = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&previews);
        bus.on(EventKind::PreviewChanged, move |e| {
            if let Event::PreviewChanged(p) = e {
                sink.borrow_mut().push(p.as_ref().map(|p| p.id.to_string()));
            }
        });

        let model = ProductModel::new(bus, ImageResolver::default());
        model.set_products(vec![raw(json!({"id": "a"}))]);
        let product = model.get_product(&ProductId::new("a"));
        model.set_preview(product);
        model.set_preview(None);

        assert_eq!(*previews.borrow(), vec![Some("a".to_string()), None]);
        assert!(model.preview().is_none());
    }
}
