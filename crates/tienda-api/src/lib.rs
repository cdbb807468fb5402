//! Typed async client for the storefront backend's REST API.

pub mod auth;
pub mod client;
pub mod customers;
pub mod error;
pub mod products;
pub mod sales;

pub use auth::TokenPair;
pub use client::ApiClient;
pub use error::{ApiError, FieldError};
