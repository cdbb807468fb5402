//! Session cart: the shopper's current selection, persisted under
//! `carrito` and published to observers on every change.
//!
//! Lines are keyed by product code and kept in insertion order. Every line
//! satisfies `1 <= quantity <= stock`: mutations that would break the bound
//! are rejected and leave the cart untouched, and a quantity of zero or less
//! removes the line.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tienda_core::storage::{get_json, set_json};
use tienda_core::{keys, KeyValueStore, Product, StorageError};
use tokio::sync::watch;

use crate::error::CartError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub unit_price: Decimal,
    pub stock: u32,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
    lines: Vec<CartLine>,
    notifier: watch::Sender<Vec<CartLine>>,
}

impl CartStore {
    /// Restores the cart persisted in `store`, or starts empty.
    ///
    /// An undecodable stored cart is discarded with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the store itself cannot be read.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, CartError> {
        let lines = match get_json::<Vec<CartLine>>(store.as_ref(), keys::CART) {
            Ok(lines) => lines.unwrap_or_default(),
            Err(StorageError::CorruptValue { source, .. }) => {
                tracing::warn!(error = %source, "stored cart is unreadable, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let (notifier, _) = watch::channel(lines.clone());
        Ok(Self {
            store,
            lines,
            notifier,
        })
    }

    /// Receives the full line list after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartLine>> {
        self.notifier.subscribe()
    }

    /// Adds `quantity` units of `product`, merging into an existing line.
    ///
    /// The line's price and stock are refreshed from `product`.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`] for a zero quantity.
    /// - [`CartError::OutOfStock`] if the product has no stock.
    /// - [`CartError::StockExceeded`] if the resulting quantity exceeds stock.
    /// - [`CartError::Storage`] if persisting fails.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let stock = u32::try_from(product.stock).unwrap_or(0);
        if stock == 0 {
            return Err(CartError::OutOfStock {
                code: product.code.clone(),
            });
        }

        let existing = self.lines.iter().position(|l| l.code == product.code);
        let current = existing.map_or(0, |i| self.lines[i].quantity);
        let requested = current.saturating_add(quantity);
        if requested > stock {
            return Err(CartError::StockExceeded {
                code: product.code.clone(),
                requested,
                available: stock,
            });
        }

        let mut next = self.lines.clone();
        match existing {
            Some(i) => {
                let line = &mut next[i];
                line.quantity = requested;
                line.stock = stock;
                line.unit_price = product.price;
            }
            None => next.push(CartLine {
                code: product.code.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                stock,
                quantity,
            }),
        }
        self.commit(next)
    }

    /// Sets a line's quantity; zero or less removes it. Returns `false` when
    /// no line has `code`.
    ///
    /// # Errors
    ///
    /// - [`CartError::StockExceeded`] if `quantity` exceeds the line's stock.
    /// - [`CartError::Storage`] if persisting fails.
    pub fn set_quantity(&mut self, code: &str, quantity: i64) -> Result<bool, CartError> {
        let Some(index) = self.lines.iter().position(|l| l.code == code) else {
            return Ok(false);
        };
        if quantity <= 0 {
            return self.remove_item(code);
        }
        let line = &self.lines[index];
        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
        if requested > line.stock {
            return Err(CartError::StockExceeded {
                code: code.to_string(),
                requested,
                available: line.stock,
            });
        }
        let mut next = self.lines.clone();
        next[index].quantity = requested;
        self.commit(next)?;
        Ok(true)
    }

    /// Adds one unit unless the line is already at its stock ceiling.
    /// Returns whether the quantity changed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if persisting fails.
    pub fn increment(&mut self, code: &str) -> Result<bool, CartError> {
        match self.line(code) {
            Some(line) if line.quantity < line.stock => {
                let next = i64::from(line.quantity) + 1;
                self.set_quantity(code, next)
            }
            _ => Ok(false),
        }
    }

    /// Removes one unit; the last unit removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if persisting fails.
    pub fn decrement(&mut self, code: &str) -> Result<bool, CartError> {
        match self.line(code) {
            Some(line) => {
                let next = i64::from(line.quantity) - 1;
                self.set_quantity(code, next)
            }
            None => Ok(false),
        }
    }

    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if persisting fails.
    pub fn remove_item(&mut self, code: &str) -> Result<bool, CartError> {
        if self.line(code).is_none() {
            return Ok(false);
        }
        let next = self
            .lines
            .iter()
            .filter(|l| l.code != code)
            .cloned()
            .collect();
        self.commit(next)?;
        Ok(true)
    }

    /// Empties the cart, persisting the empty state.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if persisting fails.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.commit(Vec::new())
    }

    /// Empties the cart and deletes its storage key (after a completed payment).
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the key cannot be removed.
    pub fn discard(&mut self) -> Result<(), CartError> {
        self.store.remove(keys::CART)?;
        self.lines.clear();
        self.notifier.send_replace(Vec::new());
        Ok(())
    }

    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, code: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.code == code)
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    #[must_use]
    pub fn total_units(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Persists `next` and only then makes it the current state, so a failed
    /// write leaves memory, storage, and subscribers on the previous cart.
    fn commit(&mut self, next: Vec<CartLine>) -> Result<(), CartError> {
        set_json(self.store.as_ref(), keys::CART, &next)?;
        self.notifier.send_replace(next.clone());
        self.lines = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cart_test.rs"]
mod tests;
