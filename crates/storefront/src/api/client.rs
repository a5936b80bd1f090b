//! reqwest implementation of [`CommerceApi`].

use std::sync::Arc;

use larek_core::ProductId;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ApiError, CommerceApi, OrderPayload, OrderReceipt};
use crate::models::RawProduct;

/// Characters of a failing response body kept in logs.
const LOG_BODY_LIMIT: usize = 500;

/// Characters of a failing response body kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

// =============================================================================
// CommerceClient
// =============================================================================

/// HTTP client for the commerce API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base: String,
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("base", &self.inner.base)
            .finish_non_exhaustive()
    }
}

impl CommerceClient {
    /// Create a client for the API rooted at `base`.
    #[must_use]
    pub fn new(base: &Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Create a client reusing an existing reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base: &Url) -> Self {
        Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base: base.as_str().trim_end_matches('/').to_string(),
            }),
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.inner.base
    }

    /// Send a request and read the whole body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&OrderPayload>,
    ) -> Result<(StatusCode, String), ApiError> {
        let url = format!("{}{path}", self.inner.base);
        let mut request = self.inner.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%status, bytes = text.len(), "commerce API responded");
        Ok((status, text))
    }

    /// `GET path` and parse the body as JSON.
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let (status, text) = self.send(Method::GET, path, None).await?;

        if !status.is_success() {
            warn!(
                path,
                status = %status,
                body = %truncate(&text, LOG_BODY_LIMIT),
                "commerce API returned non-success status"
            );
            return Err(ApiError::Status {
                method: "GET",
                path: path.to_string(),
                status: status.as_u16(),
                message: truncate(&text, ERROR_BODY_LIMIT),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                path,
                error = %e,
                body = %truncate(&text, LOG_BODY_LIMIT),
                "failed to parse commerce API response"
            );
            ApiError::Parse(e)
        })
    }
}

impl CommerceApi for CommerceClient {
    #[instrument(skip(self), fields(base = %self.inner.base))]
    async fn get_products(&self) -> Result<Vec<RawProduct>, ApiError> {
        let body = match self.get_json("/products").await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "catalog route failed, trying /product");
                self.get_json("/product").await?
            }
        };

        let items = extract_items(body);
        debug!(count = items.len(), "catalog fetched");
        Ok(items)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product_by_id(&self, id: &ProductId) -> Result<RawProduct, ApiError> {
        let encoded = urlencoding::encode(id.as_str());

        let body = match self.get_json(&format!("/products/{encoded}")).await {
            Ok(body) => body,
            Err(primary) => {
                debug!(error = %primary, "product route failed, trying /product");
                match self.get_json(&format!("/product/{encoded}")).await {
                    Ok(body) => body,
                    Err(fallback)
                        if primary.status() == Some(404) && fallback.status() == Some(404) =>
                    {
                        return Err(ApiError::NotFound(id.to_string()));
                    }
                    Err(fallback) => return Err(fallback),
                }
            }
        };

        Ok(serde_json::from_value(body)?)
    }

    #[instrument(skip(self, payload), fields(items = payload.items.len(), total = %payload.total))]
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderReceipt, ApiError> {
        let (mut status, mut text) = self.send(Method::POST, "/orders", Some(payload)).await?;
        if status == StatusCode::NOT_FOUND {
            debug!("/orders missing, posting to /order");
            (status, text) = self.send(Method::POST, "/order", Some(payload)).await?;
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate(&text, LOG_BODY_LIMIT),
                "order rejected"
            );
            return Err(ApiError::OrderRejected {
                status: status.as_u16(),
                message: truncate(&text, ERROR_BODY_LIMIT),
            });
        }

        Ok(parse_receipt(&text))
    }
}

// =============================================================================
// Response shapes
// =============================================================================

/// Pull product records out of a catalog body: either `{items: [...]}` or a
/// bare array. Any other shape is an empty catalog; non-object entries are
/// dropped.
#[must_use]
pub fn extract_items(body: Value) -> Vec<RawProduct> {
    let list = match body {
        Value::Array(list) => list,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(list)) => list,
            _ => {
                warn!("catalog body has no items array");
                Vec::new()
            }
        },
        other => {
            warn!(kind = json_kind(&other), "unexpected catalog body");
            Vec::new()
        }
    };

    list.into_iter().filter_map(RawProduct::from_value).collect()
}

/// Successful order bodies may be empty (`204`) or carry `{id, total}`.
fn parse_receipt(text: &str) -> OrderReceipt {
    if text.trim().is_empty() {
        return OrderReceipt::default();
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        warn!(error = %e, body = %truncate(text, LOG_BODY_LIMIT), "ignoring unreadable order receipt");
        OrderReceipt::default()
    })
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use larek_core::{OrderId, Price};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_items_envelope_and_bare_array() {
        let wrapped = extract_items(json!({"items": [{"id": "a"}, {"id": "b"}], "total": 2}));
        let bare = extract_items(json!([{"id": "a"}, {"id": "b"}]));
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn test_extract_items_other_shapes_are_empty() {
        assert!(extract_items(json!({"products": []})).is_empty());
        assert!(extract_items(json!({"items": "nope"})).is_empty());
        assert!(extract_items(json!(null)).is_empty());
        assert!(extract_items(json!("items")).is_empty());
    }

    #[test]
    fn test_extract_items_drops_non_objects() {
        let items = extract_items(json!([{"id": "a"}, 3, null, "b"]));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_parse_receipt() {
        assert_eq!(parse_receipt(""), OrderReceipt::default());
        assert_eq!(parse_receipt("OK"), OrderReceipt::default());

        let receipt = parse_receipt(r#"{"id": "o-1", "total": 90}"#);
        assert_eq!(receipt.id, Some(OrderId::new("o-1")));
        assert_eq!(receipt.total, Some(Price::from_units(90)));
    }

    #[test]
    fn test_base_trims_trailing_slash() {
        let client = CommerceClient::new(&Url::parse("http://localhost:8080/api/").unwrap());
        assert_eq!(client.base(), "http://localhost:8080/api");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("ééé", 2), "éé");
    }
}
