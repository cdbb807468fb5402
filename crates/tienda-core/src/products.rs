use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product, keyed on the backend by its `codigo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Backend surrogate key; absent on records not yet created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub price: Decimal,
    pub stock: i32,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Data URI returned by the backend for the product photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
}

impl Product {
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
