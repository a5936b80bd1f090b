//! Commerce API access.
//!
//! # Endpoints
//!
//! | call | primary | fallback |
//! |---|---|---|
//! | catalog | `GET /products` | `GET /product` on any failure |
//! | product | `GET /products/{id}` | `GET /product/{id}` |
//! | order | `POST /orders` | `POST /order` only on `404` |
//!
//! Older deployments expose the singular paths, so every read tries both.
//! Orders fall back only when the primary route does not exist; a rejected
//! order is never posted twice.
//!
//! The presenter depends on [`CommerceApi`], so scenarios can run against an
//! in-memory fake instead of [`CommerceClient`].

mod client;
pub mod types;

pub use client::{CommerceClient, extract_items};
pub use types::{OrderPayload, OrderReceipt};

use larek_core::ProductId;
use thiserror::Error;

use crate::models::{ProductError, RawProduct};

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered a read with a non-success status.
    #[error("{method} {path} returned {status}: {message}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        message: String,
    },

    /// Product absent on every route.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server refused the order.
    #[error("Order rejected ({status}): {message}")]
    OrderRejected { status: u16, message: String },

    /// Response body is not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A fetched product record cannot be used.
    #[error("Invalid product: {0}")]
    InvalidProduct(#[from] ProductError),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::OrderRejected { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Http(_) | Self::Parse(_) | Self::InvalidProduct(_) => None,
        }
    }
}

/// The three calls the storefront makes.
#[allow(async_fn_in_trait)]
pub trait CommerceApi {
    /// Fetch the raw catalog.
    async fn get_products(&self) -> Result<Vec<RawProduct>, ApiError>;

    /// Fetch one raw product.
    async fn get_product_by_id(&self, id: &ProductId) -> Result<RawProduct, ApiError>;

    /// Place an order.
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderReceipt, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::OrderRejected {
            status: 422,
            message: "address too short".to_string(),
        };
        assert_eq!(err.to_string(), "Order rejected (422): address too short");
        assert_eq!(err.status(), Some(422));

        let err = ApiError::Status {
            method: "GET",
            path: "/products".to_string(),
            status: 503,
            message: "down".to_string(),
        };
        assert_eq!(err.to_string(), "GET /products returned 503: down");
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(ApiError::NotFound("x".to_string()).status(), Some(404));
    }
}
