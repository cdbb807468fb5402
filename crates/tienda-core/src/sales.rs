//! Sale (order) records from the `venta/` and `detalleVenta/` resources.
//!
//! The backend nests related records inconsistently: a sale's customer is
//! either a full customer object or the bare tax-id, and a detail line's
//! product is either a product object or the bare code. Both shapes are
//! modelled with untagged enums.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::customers::Customer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomerRef {
    Nested(Customer),
    TaxId(String),
}

impl CustomerRef {
    #[must_use]
    pub fn tax_id(&self) -> &str {
        match self {
            CustomerRef::Nested(c) => &c.tax_id,
            CustomerRef::TaxId(rut) => rut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Nested(ProductSummary),
    Code(String),
}

impl ProductRef {
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            ProductRef::Nested(p) => &p.code,
            ProductRef::Code(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(rename = "numero")]
    pub number: String,
    /// Date or timestamp as sent by the backend (`YYYY-MM-DD[...]`).
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "rut_cliente")]
    pub customer: CustomerRef,
    pub total: Decimal,
    #[serde(rename = "detalles", default)]
    pub lines: Vec<SaleDetail>,
}

impl Sale {
    /// Calendar date of the sale, ignoring any time component.
    #[must_use]
    pub fn day(&self) -> Option<NaiveDate> {
        let prefix = self.date.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDetail {
    #[serde(rename = "venta", default)]
    pub sale_number: String,
    #[serde(rename = "producto")]
    pub product: ProductRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producto_nombre: Option<String>,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "precio_unitario")]
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
}

impl SaleDetail {
    /// Best display name for the line's product.
    #[must_use]
    pub fn product_name(&self) -> &str {
        if let Some(name) = self.producto_nombre.as_deref() {
            return name;
        }
        match &self.product {
            ProductRef::Nested(p) => &p.name,
            ProductRef::Code(code) => code,
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.subtotal
            .unwrap_or_else(|| self.unit_price * Decimal::from(self.quantity))
    }
}

/// Payload for `POST venta/`.
///
/// The backend accepts either a flat `total` or a list of `detalles`; when
/// lines are present it recomputes the authoritative total from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSale {
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "rut_cliente")]
    pub customer_tax_id: String,
    pub total: Decimal,
    #[serde(rename = "detalles", skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<NewSaleLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSaleLine {
    /// Product code.
    #[serde(rename = "producto")]
    pub product_code: String,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "precio_unitario")]
    pub unit_price: Decimal,
}
