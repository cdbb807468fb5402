use thiserror::Error;
use tienda_api::ApiError;
use tienda_core::{StorageError, ValidationError};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("product {code} is out of stock")]
    OutOfStock { code: String },

    #[error("only {available} units of {code} available, {requested} requested")]
    StockExceeded {
        code: String,
        requested: u32,
        available: u32,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out; the caller should send the shopper back to the cart.
    #[error("the cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("an order is already being processed")]
    AlreadyProcessing,

    #[error("this checkout has already been submitted")]
    AlreadySubmitted,

    #[error("no registration is awaiting an answer")]
    NoRegistrationPending,

    #[error("name, surname and locality are required to register")]
    IncompleteRegistration,

    /// Creating or updating the customer record failed.
    #[error("customer record could not be saved: {0}")]
    Customer(#[source] ApiError),

    /// The order itself was refused or could not be sent.
    #[error("order could not be submitted: {0}")]
    Order(#[source] ApiError),

    /// The view that started the checkout went away before it finished.
    #[error("checkout abandoned")]
    Abandoned,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CheckoutError {
    /// Message for the shopper; server errors use the API's joined field
    /// messages or a generic retry prompt.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Customer(e) | CheckoutError::Order(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    /// No pending purchase; the caller should send the shopper to the catalog.
    #[error("there is no pending purchase to pay for")]
    NothingToPay,

    #[error("please fill in every card field")]
    MissingFields,

    #[error("invalid card number")]
    InvalidCardNumber,

    #[error("invalid CVV")]
    InvalidCvv,

    #[error("a payment is already being processed")]
    AlreadyProcessing,

    /// The pending purchase was already consumed by an earlier payment.
    #[error("this purchase has already been paid")]
    AlreadyPaid,

    #[error("payment abandoned")]
    Abandoned,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no profile found for RUT {tax_id}; a purchase is needed first")]
    NotFound { tax_id: String },

    #[error("please fill in every required field")]
    MissingFields,

    #[error(transparent)]
    Api(#[from] ApiError),
}
