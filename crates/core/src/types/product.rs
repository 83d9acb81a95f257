//! Product records from the remote catalog table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Price, ProductId};

/// A row of the products table.
///
/// Extra columns in the remote table are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Create a product without a creation timestamp.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, price: Price) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.into(),
            price,
            created_at: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_row_with_extra_columns() {
        let row = r#"{
            "id": 3,
            "name": "produkti3",
            "price": 4444444,
            "created_at": "2025-06-01T12:30:00+00:00",
            "sku": "ignored"
        }"#;

        let product: Product = serde_json::from_str(row).unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.name, "produkti3");
        assert_eq!(product.price, Price::from_units(4_444_444));
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_deserialize_row_without_timestamp() {
        let product: Product =
            serde_json::from_str(r#"{"id": 1, "name": "produkti1", "price": 20}"#).unwrap();
        assert_eq!(product, Product::new(1, "produkti1", Price::from_units(20)));
    }
}
