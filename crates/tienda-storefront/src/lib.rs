//! Shopper-facing session logic: cart, checkout, simulated payment, and the
//! hand-offs between them through the key-value store.

pub mod cart;
pub mod checkout;
pub mod confirmation;
pub mod dashboard;
pub mod error;
pub mod lifetime;
pub mod payment;
pub mod profile;
pub mod snapshots;

pub use cart::{CartLine, CartStore};
pub use checkout::{
    validate_identity, Autofill, Checkout, CheckoutStep, CustomerLookup, OrderNumber,
    RegistrationDetails, ShopperIdentity,
};
pub use confirmation::Confirmation;
pub use dashboard::{Dashboard, Period, ProductSales, SalesSummary};
pub use error::{CartError, CheckoutError, PaymentError, ProfileError};
pub use lifetime::{ProcessingFlag, ViewLifetime};
pub use payment::{CardDetails, PaymentSimulator};
pub use profile::ProfileUpdate;
pub use snapshots::{CompletedPurchase, PendingPurchase};
