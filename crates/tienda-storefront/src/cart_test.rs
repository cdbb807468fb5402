use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use tienda_core::storage::get_json;
use tienda_core::{keys, KeyValueStore, MemoryStore, Product, StorageError};

use super::*;

fn product(code: &str, price: &str, stock: i32) -> Product {
    Product {
        id: None,
        code: code.to_string(),
        name: format!("Producto {code}"),
        price: Decimal::from_str(price).unwrap(),
        stock,
        description: None,
        foto_url: None,
    }
}

fn fresh_cart() -> (Arc<MemoryStore>, CartStore) {
    let store = Arc::new(MemoryStore::new());
    let cart = CartStore::load(store.clone()).unwrap();
    (store, cart)
}

fn persisted(store: &MemoryStore) -> Vec<CartLine> {
    get_json(store, keys::CART).unwrap().unwrap_or_default()
}

#[test]
fn adding_same_code_twice_merges_lines() {
    let (_, mut cart) = fresh_cart();
    let p = product("P1", "1000", 5);
    cart.add_item(&p, 1).unwrap();
    cart.add_item(&p, 2).unwrap();

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].quantity, 3);
    assert_eq!(cart.total(), Decimal::from(3000));
    assert_eq!(cart.total_units(), 3);
}

#[test]
fn every_mutation_is_persisted() {
    let (store, mut cart) = fresh_cart();
    cart.add_item(&product("P1", "1000", 5), 2).unwrap();
    cart.add_item(&product("P2", "250.50", 3), 1).unwrap();
    assert_eq!(persisted(&store), cart.items());

    cart.set_quantity("P1", 4).unwrap();
    assert_eq!(persisted(&store)[0].quantity, 4);

    cart.remove_item("P2").unwrap();
    assert_eq!(persisted(&store).len(), 1);
}

#[test]
fn reload_restores_lines_in_insertion_order() {
    let (store, mut cart) = fresh_cart();
    cart.add_item(&product("B", "10", 5), 1).unwrap();
    cart.add_item(&product("A", "20", 5), 1).unwrap();

    let reloaded = CartStore::load(store).unwrap();
    let codes: Vec<&str> = reloaded.items().iter().map(|l| l.code.as_str()).collect();
    assert_eq!(codes, vec!["B", "A"]);
}

#[test]
fn corrupt_stored_cart_starts_empty() {
    let store = Arc::new(MemoryStore::new());
    store.set(keys::CART, "{not json").unwrap();
    let cart = CartStore::load(store).unwrap();
    assert!(cart.is_empty());
}

#[test]
fn set_quantity_zero_or_negative_removes_line() {
    let (_, mut cart) = fresh_cart();
    cart.add_item(&product("P1", "1000", 5), 2).unwrap();
    cart.add_item(&product("P2", "1000", 5), 2).unwrap();

    assert!(cart.set_quantity("P1", 0).unwrap());
    assert!(cart.set_quantity("P2", -3).unwrap());
    assert!(cart.is_empty());
    assert_eq!(cart.total(), Decimal::ZERO);
}

#[test]
fn set_quantity_unknown_code_is_noop() {
    let (_, mut cart) = fresh_cart();
    cart.add_item(&product("P1", "1000", 5), 1).unwrap();
    assert!(!cart.set_quantity("missing", 3).unwrap());
    assert_eq!(cart.total_units(), 1);
}

#[test]
fn quantities_above_stock_are_rejected_without_change() {
    let (store, mut cart) = fresh_cart();
    let p = product("P1", "1000", 3);
    cart.add_item(&p, 2).unwrap();

    let err = cart.add_item(&p, 2).unwrap_err();
    assert!(matches!(
        err,
        CartError::StockExceeded {
            requested: 4,
            available: 3,
            ..
        }
    ));
    assert!(matches!(
        cart.set_quantity("P1", 10),
        Err(CartError::StockExceeded { .. })
    ));
    assert_eq!(cart.items()[0].quantity, 2);
    assert_eq!(persisted(&store)[0].quantity, 2);
}

#[test]
fn out_of_stock_products_cannot_be_added() {
    let (_, mut cart) = fresh_cart();
    let err = cart.add_item(&product("P1", "1000", 0), 1).unwrap_err();
    assert!(matches!(err, CartError::OutOfStock { .. }));
    assert!(matches!(
        cart.add_item(&product("P2", "1000", 5), 0),
        Err(CartError::InvalidQuantity)
    ));
    assert!(cart.is_empty());
}

#[test]
fn increment_stops_at_stock_ceiling() {
    let (_, mut cart) = fresh_cart();
    cart.add_item(&product("P1", "1000", 2), 1).unwrap();
    assert!(cart.increment("P1").unwrap());
    assert!(!cart.increment("P1").unwrap());
    assert_eq!(cart.items()[0].quantity, 2);
}

#[test]
fn decrement_last_unit_removes_line() {
    let (_, mut cart) = fresh_cart();
    cart.add_item(&product("P1", "1000", 2), 1).unwrap();
    assert!(cart.decrement("P1").unwrap());
    assert!(cart.is_empty());
    assert!(!cart.decrement("P1").unwrap());
}

#[test]
fn subscribers_see_each_new_state() {
    let (_, mut cart) = fresh_cart();
    let rx = cart.subscribe();
    cart.add_item(&product("P1", "1000", 5), 2).unwrap();
    assert_eq!(rx.borrow().len(), 1);
    assert_eq!(rx.borrow()[0].quantity, 2);

    cart.clear().unwrap();
    assert!(rx.borrow().is_empty());
}

#[test]
fn discard_removes_storage_key() {
    let (store, mut cart) = fresh_cart();
    cart.add_item(&product("P1", "1000", 5), 1).unwrap();
    cart.discard().unwrap();
    assert!(cart.is_empty());
    assert_eq!(store.get(keys::CART).unwrap(), None);
}

/// Memory store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    read_only: AtomicBool,
}

impl FlakyStore {
    fn check_writable(&self) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("read-only"),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.remove(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.clear()
    }
}

#[test]
fn failed_write_keeps_previous_cart() {
    let store = Arc::new(FlakyStore::default());
    let mut cart = CartStore::load(store.clone()).unwrap();
    let rx = cart.subscribe();
    cart.add_item(&product("P1", "1000", 5), 2).unwrap();
    let before = cart.items().to_vec();

    store.read_only.store(true, Ordering::SeqCst);
    assert!(matches!(
        cart.add_item(&product("P2", "500", 5), 1),
        Err(CartError::Storage(_))
    ));
    assert!(matches!(
        cart.set_quantity("P1", 4),
        Err(CartError::Storage(_))
    ));
    assert!(matches!(cart.remove_item("P1"), Err(CartError::Storage(_))));
    assert!(matches!(cart.clear(), Err(CartError::Storage(_))));
    assert!(matches!(cart.discard(), Err(CartError::Storage(_))));

    assert_eq!(cart.items(), before.as_slice());
    assert_eq!(*rx.borrow(), before);
    let stored: Vec<CartLine> = get_json(&*store, keys::CART).unwrap().unwrap();
    assert_eq!(stored, before);
}
