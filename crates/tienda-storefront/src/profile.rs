//! Shopper profile: find the shopper's own customer record and edit it.

use tienda_api::ApiClient;
use tienda_core::storage::get_json;
use tienda_core::{keys, Customer, KeyValueStore, StorageError};

use crate::error::ProfileError;
use crate::snapshots::{load_completed, PendingPurchase};

/// The tax-id this device last checked out with, taken from the completed
/// purchase, then the pending purchase, then `cliente_rut`.
///
/// # Errors
///
/// Returns [`StorageError`] if the store cannot be read. Undecodable
/// snapshots are skipped.
pub fn remembered_tax_id(store: &dyn KeyValueStore) -> Result<Option<String>, StorageError> {
    match load_completed(store) {
        Ok(Some(done)) => return Ok(Some(done.purchase.cliente.rut)),
        Ok(None) | Err(StorageError::CorruptValue { .. }) => {}
        Err(e) => return Err(e),
    }
    match get_json::<PendingPurchase>(store, keys::PENDING_PURCHASE) {
        Ok(Some(pending)) => return Ok(Some(pending.cliente.rut)),
        Ok(None) | Err(StorageError::CorruptValue { .. }) => {}
        Err(e) => return Err(e),
    }
    Ok(store
        .get(keys::CUSTOMER_TAX_ID)?
        .filter(|rut| !rut.trim().is_empty()))
}

/// Editable profile fields; the tax-id is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub locality: String,
}

impl From<&Customer> for ProfileUpdate {
    fn from(c: &Customer) -> Self {
        Self {
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            email: c.email.clone(),
            locality: c.locality.clone(),
        }
    }
}

/// # Errors
///
/// [`ProfileError::NotFound`] if no record exists for `tax_id`, or
/// [`ProfileError::Api`] for any other failure.
pub async fn load_profile(api: &ApiClient, tax_id: &str) -> Result<Customer, ProfileError> {
    let tax_id = tax_id.trim();
    if tax_id.is_empty() {
        return Err(ProfileError::MissingFields);
    }
    api.get_customer(tax_id)
        .await?
        .ok_or_else(|| ProfileError::NotFound {
            tax_id: tax_id.to_string(),
        })
}

/// Replaces the profile's editable fields (PUT). Name, surname and locality
/// are required; a blank email is sent as absent.
///
/// # Errors
///
/// [`ProfileError::MissingFields`] before any request, or
/// [`ProfileError::Api`] when the backend refuses the update.
pub async fn update_profile(
    api: &ApiClient,
    tax_id: &str,
    update: &ProfileUpdate,
) -> Result<Customer, ProfileError> {
    let required = [&update.first_name, &update.last_name, &update.locality];
    if tax_id.trim().is_empty() || required.iter().any(|f| f.trim().is_empty()) {
        return Err(ProfileError::MissingFields);
    }
    let record = Customer {
        tax_id: tax_id.trim().to_string(),
        first_name: update.first_name.trim().to_string(),
        last_name: update.last_name.trim().to_string(),
        email: update
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        locality: update.locality.trim().to_string(),
    };
    let saved = api.update_customer(&record.tax_id, &record).await?;
    tracing::info!(tax_id = %saved.tax_id, "profile updated");
    Ok(saved)
}
