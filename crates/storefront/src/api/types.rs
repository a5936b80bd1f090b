//! Request and response bodies of the commerce API.

use larek_core::{Email, OrderId, PaymentMethod, Phone, Price, ProductId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub payment: PaymentMethod,
    pub address: String,
    pub email: Email,
    pub phone: Phone,
    /// Ids of the basket items in basket order.
    pub items: Vec<ProductId>,
    /// Locally computed sum of the item costs.
    pub total: Price,
}

/// What the server answered to a placed order. Every field is optional;
/// an empty `204` body yields the default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderReceipt {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<OrderId>,
    #[serde(default)]
    pub total: Option<Price>,
}

impl OrderReceipt {
    /// The amount charged: the server's total when it sent one, otherwise
    /// `local`.
    #[must_use]
    pub fn charged(&self, local: Price) -> Price {
        self.total.unwrap_or(local)
    }
}

/// Accept string or numeric order ids.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<OrderId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(OrderId::new(s)),
        Some(Value::Number(n)) => Some(OrderId::new(n.to_string())),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_receipt_fields_are_optional() {
        let receipt: OrderReceipt = serde_json::from_value(json!({})).unwrap();
        assert_eq!(receipt, OrderReceipt::default());
    }

    #[test]
    fn test_receipt_numeric_id_and_total() {
        let receipt: OrderReceipt =
            serde_json::from_value(json!({"id": 42, "total": 1500})).unwrap();
        assert_eq!(receipt.id, Some(OrderId::new("42")));
        assert_eq!(receipt.total, Some(Price::from_units(1500)));
    }

    #[test]
    fn test_server_total_wins() {
        let receipt = OrderReceipt {
            id: None,
            total: Some(Price::from_units(90)),
        };
        assert_eq!(receipt.charged(Price::from_units(100)), Price::from_units(90));
        assert_eq!(
            OrderReceipt::default().charged(Price::from_units(100)),
            Price::from_units(100)
        );
    }
}
