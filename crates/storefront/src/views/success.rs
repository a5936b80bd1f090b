//! Order confirmation.

use std::cell::{Cell, RefCell};

use askama::Template;
use larek_core::Price;

use super::{Result, Shell};
use crate::events::{Event, EventBus};

#[derive(Template)]
#[template(path = "success.html")]
struct SuccessTemplate {
    total: String,
}

/// Shows the amount charged for a placed order.
#[derive(Debug)]
pub struct SuccessView {
    bus: EventBus,
    total: Cell<Price>,
    html: RefCell<String>,
}

impl SuccessView {
    /// # Errors
    ///
    /// Fails when the shell has no `#success` template.
    pub fn new(bus: EventBus, shell: &Shell) -> Result<Self> {
        shell.ensure("success")?;
        Ok(Self {
            bus,
            total: Cell::new(Price::ZERO),
            html: RefCell::new(String::new()),
        })
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, total: Price) -> Result<String> {
        let html = SuccessTemplate {
            total: total.to_string(),
        }
        .render()?;
        self.total.set(total);
        self.html.replace(html.clone());
        Ok(html)
    }

    /// The close button was pressed.
    pub fn close(&self) {
        self.bus.publish(Event::SuccessClose);
    }

    /// Total of the last confirmation shown.
    #[must_use]
    pub fn total(&self) -> Price {
        self.total.get()
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.html.borrow().clone()
    }
}
