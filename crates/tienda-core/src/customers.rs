//! Customer records as exposed by the backend's `clientes/` resource.
//!
//! The backend keys customers by tax-id (RUT). Two flavours coexist on the
//! server: *temporary* records created on the fly during anonymous checkout,
//! carrying placeholder identity fields, and *registered* records with
//! complete personal data. The server does not store the flavour; it is
//! derived from the fields with [`Customer::flavor`].

use serde::{Deserialize, Serialize};

/// Placeholder first name written on temporary customer records.
pub const TEMPORARY_FIRST_NAME: &str = "Cliente Web";
/// Placeholder surname written on temporary customer records.
pub const TEMPORARY_LAST_NAME: &str = "Temporal";
/// Placeholder locality written on temporary customer records.
pub const TEMPORARY_LOCALITY: &str = "Sin especificar";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "rut")]
    pub tax_id: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "comuna")]
    pub locality: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerFlavor {
    Temporary,
    Registered,
}

impl std::fmt::Display for CustomerFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerFlavor::Temporary => write!(f, "temporary"),
            CustomerFlavor::Registered => write!(f, "registered"),
        }
    }
}

impl Customer {
    /// Builds the placeholder record used for anonymous checkouts.
    #[must_use]
    pub fn temporary(tax_id: &str, email: &str) -> Self {
        Self {
            tax_id: tax_id.to_string(),
            first_name: TEMPORARY_FIRST_NAME.to_string(),
            last_name: TEMPORARY_LAST_NAME.to_string(),
            email: Some(email.to_string()),
            locality: TEMPORARY_LOCALITY.to_string(),
        }
    }

    /// A record is registered when it carries an email and a real name.
    #[must_use]
    pub fn flavor(&self) -> CustomerFlavor {
        let has_email = self.email.as_deref().is_some_and(|e| !e.trim().is_empty());
        if has_email && self.first_name != TEMPORARY_FIRST_NAME {
            CustomerFlavor::Registered
        } else {
            CustomerFlavor::Temporary
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
