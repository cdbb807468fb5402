pub mod app_config;
pub mod config;
pub mod customers;
pub mod page;
pub mod products;
pub mod sales;
pub mod storage;
pub mod validation;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use customers::{Customer, CustomerFlavor};
pub use page::Page;
pub use products::Product;
pub use sales::{CustomerRef, NewSale, NewSaleLine, ProductRef, Sale, SaleDetail};
pub use storage::{keys, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use validation::{normalize_tax_id, validate_email, validate_tax_id, ValidationError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
