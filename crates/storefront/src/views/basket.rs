//! Basket listing.

use std::cell::{Cell, RefCell};

use askama::Template;
use larek_core::{Price, ProductId};

use super::{Result, Shell};
use crate::events::{Event, EventBus};
use crate::models::Product;

/// One numbered basket row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketLine {
    pub index: usize,
    pub id: ProductId,
    pub title: String,
    pub price: Price,
}

#[derive(Template)]
#[template(path = "card_basket.html")]
struct BasketLineTemplate<'a> {
    index: usize,
    id: &'a ProductId,
    title: &'a str,
    price: String,
}

#[derive(Template)]
#[template(path = "basket.html")]
struct BasketTemplate<'a> {
    rows: &'a [String],
    total: String,
    checkout_enabled: bool,
}

/// Basket content with its total and the checkout button.
#[derive(Debug)]
pub struct Basket {
    bus: EventBus,
    lines: RefCell<Vec<BasketLine>>,
    total: Cell<Price>,
    html: RefCell<String>,
}

impl Basket {
    /// # Errors
    ///
    /// Fails when the shell has no `#basket` or `#card-basket` template.
    pub fn new(bus: EventBus, shell: &Shell) -> Result<Self> {
        shell.ensure("basket")?;
        shell.ensure("card-basket")?;

        let basket = Self {
            bus,
            lines: RefCell::new(Vec::new()),
            total: Cell::new(Price::ZERO),
            html: RefCell::new(String::new()),
        };
        basket.render(&[], Price::ZERO)?;
        Ok(basket)
    }

    /// Render `items` numbered from 1 with `total`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, items: &[Product], total: Price) -> Result<String> {
        let lines: Vec<BasketLine> = items
            .iter()
            .enumerate()
            .map(|(i, p)| BasketLine {
                index: i + 1,
                id: p.id.clone(),
                title: p.name.clone(),
                price: p.cost,
            })
            .collect();

        let rows = lines
            .iter()
            .map(|line| {
                BasketLineTemplate {
                    index: line.index,
                    id: &line.id,
                    title: &line.title,
                    price: line.price.to_string(),
                }
                .render()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let html = BasketTemplate {
            rows: &rows,
            total: total.to_string(),
            checkout_enabled: !lines.is_empty(),
        }
        .render()?;

        self.lines.replace(lines);
        self.total.set(total);
        self.html.replace(html.clone());
        Ok(html)
    }

    /// The remove button of the row for `id` was pressed.
    pub fn remove(&self, id: &ProductId) {
        self.bus.publish(Event::BasketRemove(id.clone()));
    }

    /// The checkout button was pressed. Ignored while the basket is empty,
    /// matching the disabled button.
    pub fn checkout(&self) {
        if self.checkout_enabled() {
            self.bus.publish(Event::OrderOpen);
        }
    }

    #[must_use]
    pub fn checkout_enabled(&self) -> bool {
        !self.lines.borrow().is_empty()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<BasketLine> {
        self.lines.borrow().clone()
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.total.get()
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.html.borrow().clone()
    }
}
