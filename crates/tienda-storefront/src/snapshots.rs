//! Purchase snapshots handed from one step to the next through the store:
//! `ventaPendiente` between checkout and payment, `pagoCompletado` between
//! payment and the confirmation view.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tienda_core::storage::{get_json, set_json};
use tienda_core::{keys, KeyValueStore, StorageError};

use crate::cart::CartLine;

/// Label recorded for every simulated payment.
pub const PAYMENT_METHOD: &str = "Tarjeta de Crédito";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasedItem {
    pub nombre: String,
    pub codigo: String,
    pub cantidad: u32,
    pub precio: Decimal,
}

impl PurchasedItem {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.precio * Decimal::from(self.cantidad)
    }
}

impl From<&CartLine> for PurchasedItem {
    fn from(line: &CartLine) -> Self {
        Self {
            nombre: line.name.clone(),
            codigo: line.code.clone(),
            cantidad: line.quantity,
            precio: line.unit_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopperContact {
    pub rut: String,
    pub correo: String,
}

/// An order accepted by the backend and awaiting payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPurchase {
    pub numero: String,
    pub total: Decimal,
    pub productos: Vec<PurchasedItem>,
    pub cliente: ShopperContact,
    pub creado: DateTime<Utc>,
}

impl PendingPurchase {
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.creado) > ttl
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPurchase {
    #[serde(flatten)]
    pub purchase: PendingPurchase,
    pub fecha_pago: DateTime<Utc>,
    pub metodo_pago: String,
    pub ultimos4_digitos: String,
}

/// Loads the pending purchase, discarding it when older than `ttl` or
/// unreadable.
///
/// # Errors
///
/// Returns [`StorageError`] if the store cannot be read or the stale entry
/// cannot be removed.
pub fn load_pending(
    store: &dyn KeyValueStore,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<Option<PendingPurchase>, StorageError> {
    let pending = match get_json::<PendingPurchase>(store, keys::PENDING_PURCHASE) {
        Ok(pending) => pending,
        Err(StorageError::CorruptValue { source, .. }) => {
            tracing::warn!(error = %source, "discarding unreadable pending purchase");
            store.remove(keys::PENDING_PURCHASE)?;
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    match pending {
        Some(p) if p.is_stale(now, ttl) => {
            tracing::info!(numero = %p.numero, creado = %p.creado, "discarding stale pending purchase");
            store.remove(keys::PENDING_PURCHASE)?;
            Ok(None)
        }
        other => Ok(other),
    }
}

/// # Errors
///
/// Returns [`StorageError`] if encoding or writing fails.
pub fn save_pending(store: &dyn KeyValueStore, pending: &PendingPurchase) -> Result<(), StorageError> {
    set_json(store, keys::PENDING_PURCHASE, pending)
}

/// # Errors
///
/// Returns [`StorageError`] if the store cannot be read or holds an
/// undecodable value.
pub fn load_completed(store: &dyn KeyValueStore) -> Result<Option<CompletedPurchase>, StorageError> {
    get_json(store, keys::COMPLETED_PURCHASE)
}

/// # Errors
///
/// Returns [`StorageError`] if encoding or writing fails.
pub fn save_completed(
    store: &dyn KeyValueStore,
    completed: &CompletedPurchase,
) -> Result<(), StorageError> {
    set_json(store, keys::COMPLETED_PURCHASE, completed)
}
