//! Checkout: turns the cart plus shopper-entered identity into a submitted
//! order and a `ventaPendiente` snapshot.
//!
//! The flow branches on [`CustomerLookup`]:
//!
//! - `Registered` records auto-fill the form and go straight to the order.
//! - `Temporary` records get a registration offer that the shopper accepts
//!   with [`Checkout::register`] or declines with
//!   [`Checkout::skip_registration`].
//! - `NotFound` shoppers get a temporary record and no prompt.
//!
//! Before every order the customer record is reconciled: create, and on a
//! conflict update in place. Network failures end the attempt; nothing is
//! retried.

mod lookup;
mod order_number;

use std::sync::Arc;

use chrono::{Local, Utc};
use rust_decimal::Decimal;
use tienda_api::ApiClient;
use tienda_core::{
    keys, validate_email, validate_tax_id, Customer, CustomerFlavor, KeyValueStore, NewSale,
    NewSaleLine, ValidationError,
};

use crate::cart::{CartLine, CartStore};
use crate::error::CheckoutError;
use crate::lifetime::{ProcessingFlag, ViewLifetime};
use crate::snapshots::{save_pending, PendingPurchase, PurchasedItem, ShopperContact};

pub use lookup::{Autofill, CustomerLookup};
pub use order_number::OrderNumber;

/// Tax-id and email as typed by the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopperIdentity {
    pub tax_id: String,
    pub email: String,
}

impl ShopperIdentity {
    #[must_use]
    pub fn new(tax_id: &str, email: &str) -> Self {
        Self {
            tax_id: tax_id.trim().to_string(),
            email: email.trim().to_string(),
        }
    }
}

/// Personal data supplied when a temporary customer registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDetails {
    pub first_name: String,
    pub last_name: String,
    pub locality: String,
}

impl RegistrationDetails {
    fn is_complete(&self) -> bool {
        [&self.first_name, &self.last_name, &self.locality]
            .iter()
            .all(|f| !f.trim().is_empty())
    }
}

/// Checks identity fields in order: presence, email shape, tax-id shape.
/// Pure; the same input always yields the same answer.
///
/// # Errors
///
/// The first [`ValidationError`] found.
pub fn validate_identity(identity: &ShopperIdentity) -> Result<(), ValidationError> {
    if identity.tax_id.trim().is_empty() || identity.email.trim().is_empty() {
        return Err(ValidationError::MissingFields);
    }
    validate_email(&identity.email)?;
    validate_tax_id(&identity.tax_id)
}

/// Where a submission landed.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutStep {
    /// The shopper must answer the registration offer before the order is placed.
    RegistrationOffered { customer: Customer },
    /// The order was accepted and the pending purchase written.
    Submitted(PendingPurchase),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LookupSource {
    TaxId,
    Email(String),
}

#[derive(Debug, Clone)]
struct ResolvedLookup {
    tax_id: String,
    source: LookupSource,
    outcome: CustomerLookup,
}

impl ResolvedLookup {
    /// Whether this hit still answers a lookup for `email`. Tax-id hits
    /// answer any email; email hits only their own address.
    fn covers_email(&self, email: &str) -> bool {
        match &self.source {
            LookupSource::TaxId => true,
            LookupSource::Email(found_by) => found_by.eq_ignore_ascii_case(email),
        }
    }
}

pub struct Checkout {
    api: Arc<ApiClient>,
    store: Arc<dyn KeyValueStore>,
    lines: Vec<CartLine>,
    total: Decimal,
    lifetime: ViewLifetime,
    processing: ProcessingFlag,
    lookup: Option<ResolvedLookup>,
    awaiting_registration: Option<ShopperIdentity>,
    submitted: bool,
}

impl Checkout {
    /// Opens checkout over the current cart contents.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] when there is nothing to buy.
    pub fn begin(
        api: Arc<ApiClient>,
        store: Arc<dyn KeyValueStore>,
        cart: &CartStore,
        lifetime: ViewLifetime,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(Self {
            api,
            store,
            lines: cart.items().to_vec(),
            total: cart.total(),
            lifetime,
            processing: ProcessingFlag::default(),
            lookup: None,
            awaiting_registration: None,
            submitted: false,
        })
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.is_processing()
    }

    /// Handle for observing the in-flight state from elsewhere.
    #[must_use]
    pub fn processing_flag(&self) -> ProcessingFlag {
        self.processing.clone()
    }

    /// The most recent lookup outcome, if any lookup completed.
    #[must_use]
    pub fn lookup(&self) -> Option<&CustomerLookup> {
        self.lookup.as_ref().map(|l| &l.outcome)
    }

    /// Form fields to pre-fill when the lookup found a registered customer.
    #[must_use]
    pub fn autofill(&self) -> Option<Autofill> {
        match self.lookup() {
            Some(CustomerLookup::Registered(c)) => Some(Autofill::from(c)),
            _ => None,
        }
    }

    /// Looks the shopper up by tax-id (on leaving the tax-id field).
    ///
    /// Malformed tax-ids are not sent. Lookup failures are logged and read as
    /// `NotFound`; they never block checkout.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Abandoned`] if the view ended while the lookup ran.
    pub async fn lookup_tax_id(&mut self, tax_id: &str) -> Result<CustomerLookup, CheckoutError> {
        let tax_id = tax_id.trim();
        if validate_tax_id(tax_id).is_err() {
            return Ok(CustomerLookup::NotFound);
        }
        let result = self.api.get_customer(tax_id).await;
        self.ensure_alive()?;

        match result {
            Ok(found) => {
                let outcome = CustomerLookup::classify(found);
                tracing::debug!(tax_id, found = outcome.is_found(), "customer lookup by tax-id");
                self.lookup = Some(ResolvedLookup {
                    tax_id: tax_id.to_string(),
                    source: LookupSource::TaxId,
                    outcome: outcome.clone(),
                });
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(tax_id, error = %e, "customer lookup by tax-id failed");
                Ok(CustomerLookup::NotFound)
            }
        }
    }

    /// Looks the shopper up by email (on leaving the email field).
    ///
    /// Skipped once a tax-id lookup has found a record, or when this same
    /// email already matched. A match for a different email is dropped
    /// before asking again. Same failure policy as
    /// [`Checkout::lookup_tax_id`].
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Abandoned`] if the view ended while the lookup ran.
    pub async fn lookup_email(&mut self, email: &str) -> Result<CustomerLookup, CheckoutError> {
        let email = email.trim();
        if let Some(l) = self
            .lookup
            .as_ref()
            .filter(|l| l.outcome.is_found() && l.covers_email(email))
        {
            return Ok(l.outcome.clone());
        }
        if self
            .lookup
            .as_ref()
            .is_some_and(|l| matches!(l.source, LookupSource::Email(_)))
        {
            self.lookup = None;
        }
        if validate_email(email).is_err() {
            return Ok(CustomerLookup::NotFound);
        }
        let result = self.api.find_customer_by_email(email).await;
        self.ensure_alive()?;

        match result {
            Ok(Some(customer)) => {
                let outcome = CustomerLookup::classify(Some(customer));
                tracing::debug!(found = true, "customer lookup by email");
                if let Some(c) = outcome.customer() {
                    self.lookup = Some(ResolvedLookup {
                        tax_id: c.tax_id.clone(),
                        source: LookupSource::Email(email.to_string()),
                        outcome: outcome.clone(),
                    });
                }
                Ok(outcome)
            }
            Ok(None) => Ok(CustomerLookup::NotFound),
            Err(e) => {
                tracing::warn!(error = %e, "customer lookup by email failed");
                Ok(CustomerLookup::NotFound)
            }
        }
    }

    /// Validates the identity and either places the order or asks the
    /// shopper about registering first.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Validation`] before any network call on bad input.
    /// - [`CheckoutError::AlreadySubmitted`] or
    ///   [`CheckoutError::AlreadyProcessing`] on duplicate submission.
    /// - [`CheckoutError::Customer`] or [`CheckoutError::Order`] when the
    ///   backend refuses; the form may be resubmitted.
    /// - [`CheckoutError::Abandoned`] if the view ended mid-flight.
    pub async fn submit(&mut self, identity: ShopperIdentity) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_open()?;
        validate_identity(&identity)?;

        let outcome = self.resolve_lookup(&identity.tax_id).await?;
        match outcome {
            CustomerLookup::Registered(mut customer) => {
                customer.email = Some(identity.email.clone());
                self.place_order(&identity, customer).await
            }
            CustomerLookup::Temporary(customer) => {
                tracing::info!(
                    tax_id = %identity.tax_id,
                    "returning customer is not registered, offering registration"
                );
                self.awaiting_registration = Some(identity);
                Ok(CheckoutStep::RegistrationOffered { customer })
            }
            CustomerLookup::NotFound => {
                let customer = Customer::temporary(&identity.tax_id, &identity.email);
                self.place_order(&identity, customer).await
            }
        }
    }

    /// Opens the registration offer on demand, for shoppers the flow would
    /// not prompt.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Validation`] on bad input, or
    /// [`CheckoutError::AlreadySubmitted`].
    pub fn offer_registration(
        &mut self,
        identity: ShopperIdentity,
    ) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_open()?;
        validate_identity(&identity)?;
        let customer = self
            .lookup
            .as_ref()
            .filter(|l| l.tax_id == identity.tax_id)
            .and_then(|l| l.outcome.customer().cloned())
            .unwrap_or_else(|| Customer::temporary(&identity.tax_id, &identity.email));
        self.awaiting_registration = Some(identity);
        Ok(CheckoutStep::RegistrationOffered { customer })
    }

    /// Accepts the registration offer: upgrades the customer record with the
    /// given details, then places the order.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoRegistrationPending`] without an open offer,
    /// [`CheckoutError::IncompleteRegistration`] with blank details, or any
    /// error from [`Checkout::submit`]'s order phase.
    pub async fn register(
        &mut self,
        details: &RegistrationDetails,
    ) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_open()?;
        let Some(identity) = self.awaiting_registration.clone() else {
            return Err(CheckoutError::NoRegistrationPending);
        };
        if !details.is_complete() {
            return Err(CheckoutError::IncompleteRegistration);
        }
        let customer = Customer {
            tax_id: identity.tax_id.clone(),
            first_name: details.first_name.trim().to_string(),
            last_name: details.last_name.trim().to_string(),
            email: Some(identity.email.clone()),
            locality: details.locality.trim().to_string(),
        };
        self.place_order(&identity, customer).await
    }

    /// Declines the registration offer and places the order under a
    /// temporary record.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoRegistrationPending`] without an open offer, or any
    /// error from [`Checkout::submit`]'s order phase.
    pub async fn skip_registration(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_open()?;
        let Some(identity) = self.awaiting_registration.clone() else {
            return Err(CheckoutError::NoRegistrationPending);
        };
        let customer = Customer::temporary(&identity.tax_id, &identity.email);
        self.place_order(&identity, customer).await
    }

    fn ensure_open(&self) -> Result<(), CheckoutError> {
        if self.submitted {
            return Err(CheckoutError::AlreadySubmitted);
        }
        Ok(())
    }

    fn ensure_alive(&self) -> Result<(), CheckoutError> {
        if self.lifetime.is_alive() {
            Ok(())
        } else {
            Err(CheckoutError::Abandoned)
        }
    }

    /// Reuses the last lookup when it was for `tax_id`, otherwise looks up now.
    async fn resolve_lookup(&mut self, tax_id: &str) -> Result<CustomerLookup, CheckoutError> {
        if let Some(l) = self.lookup.as_ref().filter(|l| l.tax_id == tax_id) {
            return Ok(l.outcome.clone());
        }
        self.lookup_tax_id(tax_id).await
    }

    async fn place_order(
        &mut self,
        identity: &ShopperIdentity,
        customer: Customer,
    ) -> Result<CheckoutStep, CheckoutError> {
        let Some(_guard) = self.processing.try_begin() else {
            return Err(CheckoutError::AlreadyProcessing);
        };

        self.reconcile_customer(&customer).await?;

        let number = OrderNumber::generate();
        let sale = NewSale {
            number: number.to_string(),
            date: Local::now().date_naive(),
            customer_tax_id: identity.tax_id.clone(),
            total: self.total,
            lines: self
                .lines
                .iter()
                .map(|l| NewSaleLine {
                    product_code: l.code.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
        };
        let result = self.api.create_sale(&sale).await;
        self.ensure_alive()?;
        let created = result.map_err(|e| {
            tracing::warn!(numero = %sale.number, error = %e, "order submission failed");
            CheckoutError::Order(e)
        })?;

        // A zero total means the backend has not priced the order yet.
        let total = if created.total.is_zero() {
            self.total
        } else {
            created.total
        };
        let pending = PendingPurchase {
            numero: created.number,
            total,
            productos: self.lines.iter().map(PurchasedItem::from).collect(),
            cliente: ShopperContact {
                rut: identity.tax_id.clone(),
                correo: identity.email.clone(),
            },
            creado: Utc::now(),
        };
        save_pending(self.store.as_ref(), &pending)?;
        self.store.set(keys::CUSTOMER_TAX_ID, &identity.tax_id)?;

        self.submitted = true;
        self.awaiting_registration = None;
        tracing::info!(numero = %pending.numero, total = %pending.total, "order submitted");
        Ok(CheckoutStep::Submitted(pending))
    }

    /// Creates the record, or updates it in place when it already exists.
    ///
    /// A placeholder record never overwrites a registered one: on conflict
    /// the stored record is fetched and kept if it is registered.
    async fn reconcile_customer(&self, customer: &Customer) -> Result<(), CheckoutError> {
        let created = self.api.create_customer(customer).await;
        self.ensure_alive()?;
        let err = match created {
            Ok(_) => {
                tracing::debug!(tax_id = %customer.tax_id, flavor = %customer.flavor(), "customer created");
                return Ok(());
            }
            Err(e) if e.is_conflict() => e,
            Err(e) => {
                tracing::warn!(tax_id = %customer.tax_id, error = %e, "customer creation failed");
                return Err(CheckoutError::Customer(e));
            }
        };
        tracing::debug!(tax_id = %customer.tax_id, reason = %err, "customer exists, updating");

        if customer.flavor() == CustomerFlavor::Temporary {
            let existing = self.api.get_customer(&customer.tax_id).await;
            self.ensure_alive()?;
            match existing {
                Ok(Some(stored)) if stored.flavor() == CustomerFlavor::Registered => {
                    tracing::info!(tax_id = %customer.tax_id, "keeping registered record");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => return Err(CheckoutError::Customer(e)),
            }
        }

        let updated = self.api.update_customer(&customer.tax_id, customer).await;
        self.ensure_alive()?;
        updated.map(|_| ()).map_err(|e| {
            tracing::warn!(tax_id = %customer.tax_id, error = %e, "customer update failed");
            CheckoutError::Customer(e)
        })
    }
}
