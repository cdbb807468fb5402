//! Post-payment confirmation view over the `pagoCompletado` snapshot.

use std::fmt;
use std::sync::Arc;

use chrono::Local;
use rust_decimal::{Decimal, RoundingStrategy};
use tienda_core::{keys, KeyValueStore, StorageError};

use crate::snapshots::{load_completed, CompletedPurchase};

pub struct Confirmation {
    store: Arc<dyn KeyValueStore>,
    purchase: CompletedPurchase,
}

impl Confirmation {
    /// Loads the completed purchase and drops any leftover cart. `None`
    /// means there is nothing to confirm and the shopper belongs in the
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read or written.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Option<Self>, StorageError> {
        let Some(purchase) = load_completed(store.as_ref())? else {
            return Ok(None);
        };
        store.remove(keys::CART)?;
        Ok(Some(Self { store, purchase }))
    }

    #[must_use]
    pub fn purchase(&self) -> &CompletedPurchase {
        &self.purchase
    }

    /// "Back to the catalog": forgets the completed purchase.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the key cannot be removed.
    pub fn finish(self) -> Result<(), StorageError> {
        self.store.remove(keys::COMPLETED_PURCHASE)
    }
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.purchase;
        let paid_at = p.fecha_pago.with_timezone(&Local);
        writeln!(f, "Orden N° {}", p.purchase.numero)?;
        writeln!(f, "Fecha: {}", paid_at.format("%d/%m/%Y %H:%M"))?;
        writeln!(f, "Cliente: {} <{}>", p.purchase.cliente.rut, p.purchase.cliente.correo)?;
        writeln!(f)?;
        for item in &p.purchase.productos {
            writeln!(
                f,
                "  {:>3} x {:<30} {:>12}",
                item.cantidad,
                item.nombre,
                format_clp(item.subtotal())
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Total: {}", format_clp(p.purchase.total))?;
        write!(
            f,
            "Pagado con {} terminada en {}",
            p.metodo_pago, p.ultimos4_digitos
        )
    }
}

/// Whole pesos with `.` thousands separators: `$12.990`.
#[must_use]
pub fn format_clp(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{Duration, Utc};
    use tienda_core::MemoryStore;

    use super::*;
    use crate::snapshots::{save_completed, PendingPurchase, PurchasedItem, ShopperContact, PAYMENT_METHOD};

    fn completed() -> CompletedPurchase {
        CompletedPurchase {
            purchase: PendingPurchase {
                numero: "20260301-4821".to_string(),
                total: Decimal::from(12990),
                productos: vec![PurchasedItem {
                    nombre: "Polera".to_string(),
                    codigo: "P1".to_string(),
                    cantidad: 1,
                    precio: Decimal::from(12990),
                }],
                cliente: ShopperContact {
                    rut: "12345678".to_string(),
                    correo: "ana@example.com".to_string(),
                },
                creado: Utc::now() - Duration::minutes(3),
            },
            fecha_pago: Utc::now(),
            metodo_pago: PAYMENT_METHOD.to_string(),
            ultimos4_digitos: "4242".to_string(),
        }
    }

    #[test]
    fn nothing_to_confirm_without_snapshot() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        assert!(Confirmation::open(store).unwrap().is_none());
    }

    #[test]
    fn open_drops_cart_and_finish_drops_snapshot() {
        let store = Arc::new(MemoryStore::new());
        save_completed(&*store, &completed()).unwrap();
        store.set(keys::CART, "[]").unwrap();

        let confirmation = Confirmation::open(store.clone()).unwrap().unwrap();
        assert_eq!(store.get(keys::CART).unwrap(), None);
        assert_eq!(confirmation.purchase().ultimos4_digitos, "4242");

        confirmation.finish().unwrap();
        assert_eq!(store.get(keys::COMPLETED_PURCHASE).unwrap(), None);
    }

    #[test]
    fn receipt_lists_total_and_card_tail() {
        let store = Arc::new(MemoryStore::new());
        save_completed(&*store, &completed()).unwrap();
        let text = Confirmation::open(store).unwrap().unwrap().to_string();

        assert!(text.contains("Orden N° 20260301-4821"));
        assert!(text.contains("Total: $12.990"));
        assert!(text.ends_with("terminada en 4242"));
    }

    #[test]
    fn clp_formatting_groups_thousands() {
        assert_eq!(format_clp(Decimal::from(0)), "$0");
        assert_eq!(format_clp(Decimal::from(999)), "$999");
        assert_eq!(format_clp(Decimal::from(1_234_567)), "$1.234.567");
        assert_eq!(format_clp(Decimal::from_str("1999.5").unwrap()), "$2.000");
        assert_eq!(format_clp(Decimal::from(-2500)), "-$2.500");
    }
}
