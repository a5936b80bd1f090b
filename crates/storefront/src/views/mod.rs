//! HTML views.
//!
//! Every view renders an askama template into a fragment, keeps the last
//! state it rendered and turns user intents into bus events. Views never
//! touch models; the presenter feeds them state.
//!
//! Construction checks the host [`Shell`] for the template and mount ids a
//! view needs, so a broken page fails at start-up instead of on first use.

mod basket;
mod card;
mod forms;
mod page;
mod success;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub use basket::{Basket, BasketLine};
pub use card::{ProductCard, ProductPreview, category_modifier};
pub use forms::{ContactsForm, OrderForm, PaymentOption};
pub use page::{Modal, Page};
pub use success::SuccessView;

/// Host page shipped with the binary.
pub const DEFAULT_SHELL: &str = include_str!("../../static/index.html");

/// Errors that can occur when building or rendering a view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The host page lacks a template or mount a view depends on.
    #[error("Template missing from shell: #{0}")]
    TemplateMissing(String),

    /// askama failed to render.
    #[error("Render error: {0}")]
    Render(#[from] askama::Error),

    /// The shell file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Matches `id="..."` (either quote style) but not `data-id="..."`.
static ID_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)id\s*=\s*["']([^"']+)["']"#).expect("Invalid regex"));

/// The set of element ids the host page provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    ids: BTreeSet<String>,
}

impl Shell {
    /// Collect the ids of `html`.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let ids = ID_ATTR_RE
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect();
        Self { ids }
    }

    /// Read and parse a host page from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Io`] when the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        Ok(Self::parse(&html))
    }

    /// Whether the page has an element with `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Fail with [`ViewError::TemplateMissing`] unless `id` exists.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing id.
    pub fn ensure(&self, id: &str) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            tracing::error!(id, "host page is missing a required element");
            Err(ViewError::TemplateMissing(id.to_string()))
        }
    }

    /// All ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::parse(DEFAULT_SHELL)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shell_has_every_view_id() {
        let shell = Shell::default();
        for id in [
            "gallery",
            "basket-counter",
            "card-catalog",
            "card-preview",
            "basket",
            "card-basket",
            "order",
            "contacts",
            "success",
            "modal-container",
        ] {
            assert!(shell.contains(id), "missing #{id}");
        }
    }

    #[test]
    fn test_parse_both_quote_styles() {
        let shell = Shell::parse(r#"<template id='a'></template><div  id = "b"></div><p data-id="c"></p>"#);
        assert_eq!(shell.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_ensure_names_missing_id() {
        let err = Shell::parse("<div id=\"gallery\"></div>").ensure("basket").unwrap_err();
        assert!(matches!(err, ViewError::TemplateMissing(ref id) if id == "basket"));
        assert_eq!(err.to_string(), "Template missing from shell: #basket");
    }

    #[test]
    fn test_from_file_missing() {
        let err = Shell::from_file(Path::new("/nonexistent/index.html")).unwrap_err();
        assert!(matches!(err, ViewError::Io(_)));
    }
}
