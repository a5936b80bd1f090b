//! Product cards: the catalog tile and the detail preview.

use std::cell::{Cell, RefCell};

use askama::Template;
use larek_core::ProductId;

use super::{Result, Shell};
use crate::events::{Event, EventBus};
use crate::models::Product;

/// CSS modifier for a category badge (`card__category_<modifier>`).
///
/// Known categories get their own colour; anything else is `other`.
#[must_use]
pub fn category_modifier(category: &str) -> &'static str {
    match category.trim().to_lowercase().as_str() {
        "soft skill" | "soft-skill" | "софт-скил" => "soft",
        "hard skill" | "hard-skill" | "хард-скил" => "hard",
        "additional" | "дополнительное" => "additional",
        "button" | "кнопка" => "button",
        _ => "other",
    }
}

#[derive(Template)]
#[template(path = "card_catalog.html")]
struct CatalogCardTemplate<'a> {
    product: &'a Product,
    modifier: &'static str,
    price: String,
}

#[derive(Template)]
#[template(path = "card_preview.html")]
struct PreviewTemplate<'a> {
    product: &'a Product,
    modifier: &'static str,
    price: String,
    in_cart: bool,
}

// =============================================================================
// ProductCard
// =============================================================================

/// Catalog tile renderer. Stateless; one instance renders every card.
#[derive(Debug)]
pub struct ProductCard {
    bus: EventBus,
}

impl ProductCard {
    /// # Errors
    ///
    /// Fails when the shell has no `#card-catalog` template.
    pub fn new(bus: EventBus, shell: &Shell) -> Result<Self> {
        shell.ensure("card-catalog")?;
        Ok(Self { bus })
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, product: &Product) -> Result<String> {
        Ok(CatalogCardTemplate {
            product,
            modifier: category_modifier(&product.category),
            price: product.cost.to_string(),
        }
        .render()?)
    }

    /// The tile for `id` was clicked.
    pub fn select(&self, id: &ProductId) {
        self.bus.publish(Event::CardSelect(id.clone()));
    }
}

// =============================================================================
// ProductPreview
// =============================================================================

/// Product detail with the buy/remove button.
#[derive(Debug)]
pub struct ProductPreview {
    bus: EventBus,
    product: RefCell<Option<Product>>,
    in_cart: Cell<bool>,
    html: RefCell<String>,
}

impl ProductPreview {
    /// # Errors
    ///
    /// Fails when the shell has no `#card-preview` template.
    pub fn new(bus: EventBus, shell: &Shell) -> Result<Self> {
        shell.ensure("card-preview")?;
        Ok(Self {
            bus,
            product: RefCell::new(None),
            in_cart: Cell::new(false),
            html: RefCell::new(String::new()),
        })
    }

    /// Render `product`, labelling the button by whether it is in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, product: &Product, in_cart: bool) -> Result<String> {
        let html = PreviewTemplate {
            product,
            modifier: category_modifier(&product.category),
            price: product.cost.to_string(),
            in_cart,
        }
        .render()?;

        self.product.replace(Some(product.clone()));
        self.in_cart.set(in_cart);
        self.html.replace(html.clone());
        Ok(html)
    }

    /// Forget the shown product.
    pub fn clear(&self) {
        self.product.replace(None);
        self.in_cart.set(false);
        self.html.borrow_mut().clear();
    }

    /// The buy/remove button was pressed.
    pub fn toggle(&self) {
        let Some(id) = self.product_id() else {
            return;
        };
        self.bus.publish(Event::CartToggle(id));
    }

    /// Id of the shown product.
    #[must_use]
    pub fn product_id(&self) -> Option<ProductId> {
        self.product.borrow().as_ref().map(|p| p.id.clone())
    }

    #[must_use]
    pub fn in_cart(&self) -> bool {
        self.in_cart.get()
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.html.borrow().clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::rc::Rc;

    use larek_core::Price;

    use super::*;
    use crate::events::EventKind;

    fn widget() -> Product {
        Product {
            id: ProductId::new("a"),
            name: "Widget <b>".to_string(),
            cost: Price::from_units(1500),
            desc: "A widget".to_string(),
            img_url: "https://cdn.example.com/w.png".to_string(),
            category: "hard-skill".to_string(),
        }
    }

    #[test]
    fn test_category_modifier() {
        assert_eq!(category_modifier("софт-скил"), "soft");
        assert_eq!(category_modifier("Hard Skill"), "hard");
        assert_eq!(category_modifier("x"), "other");
    }

    #[test]
    fn test_catalog_card_markup() {
        let card = ProductCard::new(EventBus::new(), &Shell::default()).unwrap();
        let html = card.render(&widget()).unwrap();

        assert!(html.contains(r#"data-id="a""#));
        assert!(html.contains("card__category_hard"));
        assert!(html.contains("1 500 synapses"));
        assert!(html.contains("Widget &lt;b&gt;"));
        assert!(html.contains(r#"src="https://cdn.example.com/w.png""#));
    }

    #[test]
    fn test_catalog_card_without_image() {
        let card = ProductCard::new(EventBus::new(), &Shell::default()).unwrap();
        let mut product = widget();
        product.img_url.clear();
        assert!(!card.render(&product).unwrap().contains("<img"));
    }

    #[test]
    fn test_select_publishes_id() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        bus.on(EventKind::CardSelect, move |e| {
            if let Event::CardSelect(id) = e {
                sink.replace(Some(id.clone()));
            }
        });

        let card = ProductCard::new(bus, &Shell::default()).unwrap();
        card.select(&ProductId::new("a"));
        assert_eq!(*seen.borrow(), Some(ProductId::new("a")));
    }

    #[test]
    fn test_preview_button_label_and_toggle() {
        let bus = EventBus::new();
        let toggles = Rc::new(Cell::new(0));
        let counter = Rc::clone(&toggles);
        bus.on(EventKind::CartToggle, move |_| counter.set(counter.get() + 1));

        let preview = ProductPreview::new(bus, &Shell::default()).unwrap();
        preview.toggle();
        assert_eq!(toggles.get(), 0);

        let html = preview.render(&widget(), false).unwrap();
        assert!(html.contains("Add to basket"));
        assert!(html.contains("A widget"));

        let html = preview.render(&widget(), true).unwrap();
        assert!(html.contains("Remove from basket"));
        assert!(preview.in_cart());

        preview.toggle();
        assert_eq!(toggles.get(), 1);

        preview.clear();
        assert!(preview.product_id().is_none());
    }
}
