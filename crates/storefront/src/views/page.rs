//! Page chrome and the modal container.

use std::cell::{Cell, RefCell};

use askama::Template;

use super::{Result, Shell};
use crate::events::{Event, EventBus};

#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    cards: &'a [String],
    counter: usize,
    locked: bool,
}

#[derive(Template)]
#[template(path = "modal.html")]
struct ModalTemplate<'a> {
    content: &'a str,
    open: bool,
}

// =============================================================================
// Page
// =============================================================================

/// Catalog gallery, basket counter and the scroll lock.
#[derive(Debug)]
pub struct Page {
    bus: EventBus,
    cards: RefCell<Vec<String>>,
    counter: Cell<usize>,
    locked: Cell<bool>,
    html: RefCell<String>,
}

impl Page {
    /// # Errors
    ///
    /// Fails when the shell has no `#gallery` or `#basket-counter`.
    pub fn new(bus: EventBus, shell: &Shell) -> Result<Self> {
        shell.ensure("gallery")?;
        shell.ensure("basket-counter")?;

        let page = Self {
            bus,
            cards: RefCell::new(Vec::new()),
            counter: Cell::new(0),
            locked: Cell::new(false),
            html: RefCell::new(String::new()),
        };
        page.render()?;
        Ok(page)
    }

    /// Replace the gallery with rendered catalog cards.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn set_catalog(&self, cards: Vec<String>) -> Result<()> {
        self.cards.replace(cards);
        self.render()
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn set_counter(&self, count: usize) -> Result<()> {
        self.counter.set(count);
        self.render()
    }

    /// Lock page scrolling while a modal is open.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn set_locked(&self, locked: bool) -> Result<()> {
        self.locked.set(locked);
        self.render()
    }

    /// The basket button was pressed.
    pub fn open_basket(&self) {
        self.bus.publish(Event::BasketOpen);
    }

    #[must_use]
    pub fn counter(&self) -> usize {
        self.counter.get()
    }

    #[must_use]
    pub fn locked(&self) -> bool {
        self.locked.get()
    }

    /// Number of cards in the gallery.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards.borrow().len()
    }

    /// Last rendered markup.
    #[must_use]
    pub fn html(&self) -> String {
        self.html.borrow().clone()
    }

    fn render(&self) -> Result<()> {
        let html = PageTemplate {
            cards: &self.cards.borrow(),
            counter: self.counter.get(),
            locked: self.locked.get(),
        }
        .render()?;
        self.html.replace(html);
        Ok(())
    }
}

// =============================================================================
// Modal
// =============================================================================

/// Single modal slot shared by preview, basket, forms and success.
#[derive(Debug)]
pub struct Modal {
    bus: EventBus,
    content: RefCell<String>,
    open: Cell<bool>,
    html: RefCell<String>,
}

impl Modal {
    /// # Errors
    ///
    /// Fails when the shell has no `#modal-container`.
    pub fn new(bus: EventBus, shell: &Shell) -> Result<Self> {
        shell.ensure("modal-container")?;

        let modal = Self {
            bus,
            content: RefCell::new(String::new()),
            open: Cell::new(false),
            html: RefCell::new(String::new()),
        };
        modal.render()?;
        Ok(modal)
    }

    /// Show `content`. Publishes [`Event::ModalOpen`] when the modal was
    /// closed; an open modal just swaps its content.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn open(&self, content: String) -> Result<()> {
        self.content.replace(content);
        let was_open = self.open.replace(true);
        self.render()?;
        if !was_open {
            self.bus.publish(Event::ModalOpen);
        }
        Ok(())
    }

    /// Replace the content without changing the open state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn set_content(&self, content: String) -> Result<()> {
        self.content.replace(content);
        self.render()
    }

    /// Hide and empty the modal. Publishes [`Event::ModalClose`] only when it
    /// was open.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn close(&self) -> Result<()> {
        if !self.open.replace(false) {
            return Ok(());
        }
        self.content.borrow_mut().clear();
        self.render()?;
        self.bus.publish(Event::ModalClose);
        Ok(())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    #[must_use]
    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.html.borrow().clone()
    }

    fn render(&self) -> Result<()> {
        let html = ModalTemplate {
            content: &self.content.borrow(),
            open: self.open.get(),
        }
        .render()?;
        self.html.replace(html);
        Ok(())
    }
}
