//! Simulated card payment for a pending purchase.
//!
//! No gateway is contacted. A well-formed card is "charged" after a fixed
//! delay, then the pending purchase becomes a `pagoCompletado` snapshot and
//! the cart is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tienda_core::{keys, KeyValueStore};

use crate::cart::CartStore;
use crate::error::PaymentError;
use crate::lifetime::{ProcessingFlag, ViewLifetime};
use crate::snapshots::{
    load_pending, save_completed, CompletedPurchase, PendingPurchase, PAYMENT_METHOD,
};

const CARD_DIGITS: usize = 16;
const MIN_CVV_DIGITS: usize = 3;
const MAX_CVV_DIGITS: usize = 4;
const EXPIRY_DIGITS: usize = 4;
const CARD_PREVIEW_WIDTH: usize = 19;

/// Card fields as shaped for display and submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub holder: String,
    pub expiry: String,
    pub cvv: String,
}

impl CardDetails {
    /// Applies the input shaping each field gets while typing.
    #[must_use]
    pub fn from_input(number: &str, holder: &str, expiry: &str, cvv: &str) -> Self {
        Self {
            number: format_card_number(number),
            holder: format_holder(holder),
            expiry: format_expiry(expiry),
            cvv: format_cvv(cvv),
        }
    }

    fn number_digits(&self) -> String {
        digits_only(&self.number)
    }

    /// Last four digits of the card number.
    #[must_use]
    pub fn last_four(&self) -> String {
        let digits = self.number_digits();
        let start = digits.len().saturating_sub(4);
        digits[start..].to_string()
    }
}

#[must_use]
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Digits in space-separated groups of four, at most 16 digits.
#[must_use]
pub fn format_card_number(raw: &str) -> String {
    let digits: Vec<char> = digits_only(raw).chars().take(CARD_DIGITS).collect();
    digits
        .chunks(4)
        .map(|group| group.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `MMYY` digits with a `/` once two digits are present: `"1"`, `"12/"`, `"12/2"`.
#[must_use]
pub fn format_expiry(raw: &str) -> String {
    let digits: String = digits_only(raw).chars().take(EXPIRY_DIGITS).collect();
    if digits.len() >= 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

#[must_use]
pub fn format_cvv(raw: &str) -> String {
    digits_only(raw).chars().take(MAX_CVV_DIGITS).collect()
}

#[must_use]
pub fn format_holder(raw: &str) -> String {
    raw.to_uppercase()
}

/// Card number as shown on the card face, padded with `#`.
#[must_use]
pub fn card_preview(number: &str) -> String {
    if number.is_empty() {
        return "#### #### #### ####".to_string();
    }
    let shown = format_card_number(number);
    let pad = CARD_PREVIEW_WIDTH.saturating_sub(shown.chars().count());
    format!("{shown}{}", "#".repeat(pad))
}

#[must_use]
pub fn expiry_preview(expiry: &str) -> String {
    if expiry.is_empty() {
        "MM/AA".to_string()
    } else {
        expiry.to_string()
    }
}

/// # Errors
///
/// - [`PaymentError::MissingFields`] if any field is blank.
/// - [`PaymentError::InvalidCardNumber`] below 16 digits.
/// - [`PaymentError::InvalidCvv`] below 3 digits.
pub fn validate_card(card: &CardDetails) -> Result<(), PaymentError> {
    let fields = [&card.number, &card.holder, &card.expiry, &card.cvv];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(PaymentError::MissingFields);
    }
    if card.number_digits().len() < CARD_DIGITS {
        return Err(PaymentError::InvalidCardNumber);
    }
    if digits_only(&card.cvv).len() < MIN_CVV_DIGITS {
        return Err(PaymentError::InvalidCvv);
    }
    Ok(())
}

pub struct PaymentSimulator {
    store: Arc<dyn KeyValueStore>,
    pending: PendingPurchase,
    delay: Duration,
    lifetime: ViewLifetime,
    processing: ProcessingFlag,
    paid: AtomicBool,
}

impl PaymentSimulator {
    /// Opens payment for the stored pending purchase.
    ///
    /// # Errors
    ///
    /// [`PaymentError::NothingToPay`] when no fresh pending purchase exists,
    /// or [`PaymentError::Storage`] if the store cannot be read.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        pending_ttl: chrono::Duration,
        delay: Duration,
        lifetime: ViewLifetime,
    ) -> Result<Self, PaymentError> {
        let pending = load_pending(store.as_ref(), Utc::now(), pending_ttl)?
            .ok_or(PaymentError::NothingToPay)?;
        Ok(Self {
            store,
            pending,
            delay,
            lifetime,
            processing: ProcessingFlag::default(),
            paid: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn pending(&self) -> &PendingPurchase {
        &self.pending
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.is_processing()
    }

    /// True once [`PaymentSimulator::submit`] has consumed the pending
    /// purchase.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.paid.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn processing_flag(&self) -> ProcessingFlag {
        self.processing.clone()
    }

    /// Validates the card, waits out the simulated processing delay, and
    /// records the completed purchase.
    ///
    /// # Errors
    ///
    /// - Card validation errors, before anything else happens.
    /// - [`PaymentError::AlreadyProcessing`] while another submission runs.
    /// - [`PaymentError::AlreadyPaid`] once this purchase has been paid.
    /// - [`PaymentError::Abandoned`] if the view ended during the delay;
    ///   nothing is written.
    /// - [`PaymentError::Storage`] or [`PaymentError::Cart`] on write failure.
    pub async fn submit(
        &self,
        card: &CardDetails,
        cart: &mut CartStore,
    ) -> Result<CompletedPurchase, PaymentError> {
        validate_card(card)?;
        let Some(_guard) = self.processing.try_begin() else {
            return Err(PaymentError::AlreadyProcessing);
        };
        if self.is_paid() {
            return Err(PaymentError::AlreadyPaid);
        }

        tokio::time::sleep(self.delay).await;
        if !self.lifetime.is_alive() {
            return Err(PaymentError::Abandoned);
        }

        let completed = CompletedPurchase {
            purchase: self.pending.clone(),
            fecha_pago: Utc::now(),
            metodo_pago: PAYMENT_METHOD.to_string(),
            ultimos4_digitos: card.last_four(),
        };
        save_completed(self.store.as_ref(), &completed)?;
        cart.discard()?;
        self.store.remove(keys::PENDING_PURCHASE)?;
        self.paid.store(true, Ordering::Release);

        tracing::info!(numero = %completed.purchase.numero, "payment completed");
        Ok(completed)
    }
}

#[cfg(test)]
#[path = "payment_test.rs"]
mod tests;
