//! End-to-end storefront flows against a wiremock backend: cart, checkout,
//! simulated payment, and confirmation sharing one store.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use tienda_api::ApiClient;
use tienda_core::storage::get_json;
use tienda_core::{keys, KeyValueStore, MemoryStore, Product, ValidationError};
use tienda_storefront::{
    CardDetails, CartStore, Checkout, CheckoutError, CheckoutStep, Confirmation, CustomerLookup,
    PaymentError, PaymentSimulator, PendingPurchase, RegistrationDetails, ShopperIdentity,
    ViewLifetime,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RUT: &str = "12345678";
const EMAIL: &str = "ana@correo.cl";

struct Harness {
    server: MockServer,
    store: Arc<MemoryStore>,
    api: Arc<ApiClient>,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let api = ApiClient::with_base_url(&format!("{}/api", server.uri()), 5, store.clone())
            .expect("client construction should not fail");
        Self {
            server,
            store,
            api: Arc::new(api),
        }
    }

    fn cart_with(&self, quantity: u32) -> CartStore {
        let mut cart = CartStore::load(self.store.clone()).expect("cart should load");
        cart.add_item(&polera(), quantity)
            .expect("item should fit in stock");
        cart
    }

    fn checkout(&self, cart: &CartStore, view: ViewLifetime) -> Checkout {
        Checkout::begin(self.api.clone(), self.store.clone(), cart, view)
            .expect("cart is not empty")
    }

    async fn mount_customer_lookup(&self, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/clientes/{RUT}/")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    async fn mount_customer_exists(&self) {
        Mock::given(method("POST"))
            .and(path("/api/clientes/"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"rut": ["cliente with this rut already exists."]})),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    async fn mount_sale_created(&self, total: &str) {
        Mock::given(method("POST"))
            .and(path("/api/venta/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "numero": "20260310-4821",
                "fecha": "2026-03-10",
                "rut_cliente": RUT,
                "total": total,
                "detalles": []
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    async fn mount_customer_list(&self, results: serde_json::Value, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/api/clientes/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": results.as_array().map_or(0, Vec::len),
                "next": null,
                "previous": null,
                "results": results
            })))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    fn pending(&self) -> Option<PendingPurchase> {
        get_json(&*self.store, keys::PENDING_PURCHASE).expect("pending snapshot should decode")
    }
}

fn polera() -> Product {
    Product {
        id: Some(1),
        code: "P1".to_string(),
        name: "Polera".to_string(),
        price: Decimal::from(1000),
        stock: 10,
        description: None,
        foto_url: None,
    }
}

fn temporary_json() -> serde_json::Value {
    json!({
        "rut": RUT,
        "nombre": "Cliente Web",
        "apellido": "Temporal",
        "email": EMAIL,
        "comuna": "Sin especificar"
    })
}

fn registered_json() -> serde_json::Value {
    json!({
        "rut": RUT,
        "nombre": "Ana",
        "apellido": "Rojas",
        "email": EMAIL,
        "comuna": "Ñuñoa"
    })
}

fn identity() -> ShopperIdentity {
    ShopperIdentity::new(RUT, EMAIL)
}

fn expect_submitted(step: CheckoutStep) -> PendingPurchase {
    match step {
        CheckoutStep::Submitted(pending) => pending,
        other @ CheckoutStep::RegistrationOffered { .. } => {
            panic!("expected a submitted order, got {other:?}")
        }
    }
}

#[tokio::test]
async fn new_shopper_gets_temporary_record_and_pending_purchase() {
    let h = Harness::start().await;
    h.mount_customer_lookup(404, json!({"detail": "Not found."}))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/clientes/"))
        .and(body_partial_json(json!({
            "rut": RUT,
            "nombre": "Cliente Web",
            "apellido": "Temporal",
            "email": EMAIL
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(temporary_json()))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/venta/"))
        .and(body_partial_json(json!({
            "rut_cliente": RUT,
            "total": "2000",
            "detalles": [{"producto": "P1", "cantidad": 2}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "numero": "20260310-4821",
            "fecha": "2026-03-10",
            "rut_cliente": RUT,
            "total": "2000.00"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let cart = h.cart_with(2);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    let step = checkout.submit(identity()).await.expect("checkout should succeed");

    let pending = expect_submitted(step);
    assert_eq!(pending.total, Decimal::from(2000));
    assert_eq!(pending.productos.len(), 1);
    assert_eq!(pending.productos[0].cantidad, 2);
    assert_eq!(pending.cliente.rut, RUT);
    assert_eq!(h.pending(), Some(pending));
    assert_eq!(
        h.store.get(keys::CUSTOMER_TAX_ID).unwrap().as_deref(),
        Some(RUT)
    );
    // Checkout leaves the cart for the payment step to drop.
    assert!(!CartStore::load(h.store.clone()).unwrap().is_empty());
    assert!(!checkout.is_processing());
}

#[tokio::test]
async fn returning_unregistered_shopper_is_offered_registration_and_may_skip() {
    let h = Harness::start().await;
    h.mount_customer_lookup(200, temporary_json()).await;
    h.mount_customer_exists().await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/clientes/{RUT}/")))
        .and(body_partial_json(json!({"nombre": "Cliente Web"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(temporary_json()))
        .expect(1)
        .mount(&h.server)
        .await;
    h.mount_sale_created("1000.00").await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());

    let lookup = checkout.lookup_tax_id(RUT).await.unwrap();
    assert!(matches!(lookup, CustomerLookup::Temporary(_)));
    assert!(checkout.autofill().is_none());

    let step = checkout.submit(identity()).await.unwrap();
    assert!(matches!(step, CheckoutStep::RegistrationOffered { .. }));
    assert!(h.pending().is_none(), "no order before the offer is answered");

    let pending = expect_submitted(checkout.skip_registration().await.unwrap());
    assert_eq!(pending.total, Decimal::from(1000));
    assert!(h.pending().is_some());
}

#[tokio::test]
async fn accepting_registration_upgrades_record_before_order() {
    let h = Harness::start().await;
    h.mount_customer_lookup(200, temporary_json()).await;
    h.mount_customer_exists().await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/clientes/{RUT}/")))
        .and(body_partial_json(json!({
            "nombre": "Ana",
            "apellido": "Rojas",
            "comuna": "Ñuñoa",
            "email": EMAIL
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(registered_json()))
        .expect(1)
        .mount(&h.server)
        .await;
    h.mount_sale_created("1000.00").await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    checkout.submit(identity()).await.unwrap();

    let blank = RegistrationDetails {
        first_name: "Ana".to_string(),
        last_name: String::new(),
        locality: "Ñuñoa".to_string(),
    };
    assert!(matches!(
        checkout.register(&blank).await,
        Err(CheckoutError::IncompleteRegistration)
    ));

    let details = RegistrationDetails {
        first_name: "Ana".to_string(),
        last_name: "Rojas".to_string(),
        locality: "Ñuñoa".to_string(),
    };
    expect_submitted(checkout.register(&details).await.unwrap());
}

#[tokio::test]
async fn registered_shopper_is_autofilled_and_never_prompted() {
    let h = Harness::start().await;
    h.mount_customer_lookup(200, registered_json()).await;
    h.mount_customer_exists().await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/clientes/{RUT}/")))
        .and(body_partial_json(json!({"nombre": "Ana", "comuna": "Ñuñoa"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(registered_json()))
        .expect(1)
        .mount(&h.server)
        .await;
    h.mount_sale_created("3000.00").await;

    let cart = h.cart_with(3);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    checkout.lookup_tax_id(RUT).await.unwrap();

    let fill = checkout.autofill().expect("registered record fills the form");
    assert_eq!(fill.first_name, "Ana");
    assert_eq!(fill.last_name, "Rojas");
    assert_eq!(fill.locality, "Ñuñoa");

    let pending = expect_submitted(checkout.submit(identity()).await.unwrap());
    assert_eq!(pending.total, Decimal::from(3000));
}

#[tokio::test]
async fn placeholder_never_overwrites_registered_record() {
    let h = Harness::start().await;
    // The first two lookups fail; the reconciliation read succeeds.
    Mock::given(method("GET"))
        .and(path(format!("/api/clientes/{RUT}/")))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&h.server)
        .await;
    h.mount_customer_lookup(200, registered_json()).await;
    h.mount_customer_exists().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(temporary_json()))
        .expect(0)
        .mount(&h.server)
        .await;
    h.mount_sale_created("1000.00").await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    let lookup = checkout.lookup_tax_id(RUT).await.unwrap();
    assert_eq!(lookup, CustomerLookup::NotFound);

    expect_submitted(checkout.submit(identity()).await.unwrap());
}

#[tokio::test]
async fn invalid_identity_never_reaches_the_network() {
    let h = Harness::start().await;
    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());

    let bad = ShopperIdentity::new("1234567", EMAIL);
    for _ in 0..3 {
        let err = checkout.submit(bad.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Validation(ValidationError::InvalidTaxId)
        ));
    }
    let err = checkout
        .submit(ShopperIdentity::new(RUT, "not-an-email"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Validation(ValidationError::InvalidEmail)
    ));

    let requests = h.server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn rejected_order_surfaces_field_messages_and_allows_retry() {
    let h = Harness::start().await;
    h.mount_customer_lookup(404, json!({"detail": "Not found."}))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/clientes/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(temporary_json()))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/venta/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"total": ["Ensure this value is greater than 0."]})),
        )
        .mount(&h.server)
        .await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    let err = checkout.submit(identity()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Order(_)));
    assert_eq!(
        err.user_message(),
        "total: Ensure this value is greater than 0."
    );
    assert!(!checkout.is_processing());
    assert!(h.pending().is_none());

    // The form stays usable: a second attempt goes out again.
    assert!(checkout.submit(identity()).await.is_err());
}

#[tokio::test]
async fn customer_save_failure_aborts_before_order() {
    let h = Harness::start().await;
    h.mount_customer_lookup(404, json!({"detail": "Not found."}))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/clientes/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/venta/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&h.server)
        .await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    let err = checkout.submit(identity()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Customer(_)));
    assert_eq!(err.user_message(), tienda_api::error::GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn ended_view_discards_lookup_results() {
    let h = Harness::start().await;
    h.mount_customer_lookup(200, registered_json()).await;

    let cart = h.cart_with(1);
    let view = ViewLifetime::new();
    let mut checkout = h.checkout(&cart, view.clone());
    view.end();

    let err = checkout.submit(identity()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Abandoned));
    assert!(checkout.lookup().is_none());
    assert!(h.pending().is_none());
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let h = Harness::start().await;
    let cart = CartStore::load(h.store.clone()).unwrap();
    let result = Checkout::begin(h.api.clone(), h.store.clone(), &cart, ViewLifetime::new());
    assert!(matches!(result, Err(CheckoutError::EmptyCart)));
}

#[tokio::test]
async fn checkout_then_payment_then_confirmation() {
    let h = Harness::start().await;
    h.mount_customer_lookup(404, json!({"detail": "Not found."}))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/clientes/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(temporary_json()))
        .mount(&h.server)
        .await;
    h.mount_sale_created("2000.00").await;

    let mut cart = h.cart_with(2);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    expect_submitted(checkout.submit(identity()).await.unwrap());
    assert!(matches!(
        checkout.submit(identity()).await,
        Err(CheckoutError::AlreadySubmitted)
    ));

    let payment = PaymentSimulator::open(
        h.store.clone(),
        chrono::Duration::minutes(30),
        Duration::ZERO,
        ViewLifetime::new(),
    )
    .expect("pending purchase should be payable");

    let short = CardDetails::from_input("4242 4242 4242 424", "ana rojas", "12/28", "123");
    assert!(matches!(
        payment.submit(&short, &mut cart).await,
        Err(PaymentError::InvalidCardNumber)
    ));
    assert!(h.pending().is_some());

    let card = CardDetails::from_input("4242 4242 4242 1234", "ana rojas", "12/28", "123");
    let completed = payment.submit(&card, &mut cart).await.unwrap();
    assert_eq!(completed.ultimos4_digitos, "1234");
    assert_eq!(completed.purchase.total, Decimal::from(2000));
    assert!(h.pending().is_none());
    assert!(cart.is_empty());

    let confirmation = Confirmation::open(h.store.clone())
        .unwrap()
        .expect("completed purchase should be shown");
    assert!(confirmation.to_string().contains("terminada en 1234"));
    confirmation.finish().unwrap();
    assert!(Confirmation::open(h.store.clone()).unwrap().is_none());
}

#[tokio::test]
async fn email_match_fills_form_after_tax_id_miss() {
    let h = Harness::start().await;
    h.mount_customer_lookup(404, json!({"detail": "Not found."}))
        .await;
    h.mount_customer_list(json!([registered_json()]), 1).await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    assert_eq!(
        checkout.lookup_tax_id(RUT).await.unwrap(),
        CustomerLookup::NotFound
    );

    let lookup = checkout.lookup_email(" ANA@correo.cl ").await.unwrap();
    assert!(matches!(lookup, CustomerLookup::Registered(_)));
    let fill = checkout.autofill().expect("email match fills the form");
    assert_eq!(fill.tax_id, RUT);
    assert_eq!(fill.first_name, "Ana");
    assert_eq!(fill.locality, "Ñuñoa");
}

#[tokio::test]
async fn email_lookup_is_skipped_once_tax_id_matched() {
    let h = Harness::start().await;
    h.mount_customer_lookup(200, registered_json()).await;
    h.mount_customer_list(json!([]), 0).await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    checkout.lookup_tax_id(RUT).await.unwrap();

    let lookup = checkout.lookup_email("otra@correo.cl").await.unwrap();
    assert!(matches!(lookup, CustomerLookup::Registered(_)));
    assert!(checkout.autofill().is_some());
}

#[tokio::test]
async fn changed_email_drops_earlier_email_match() {
    let h = Harness::start().await;
    h.mount_customer_list(json!([registered_json()]), 3).await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    checkout.lookup_email(EMAIL).await.unwrap();
    assert!(checkout.autofill().is_some());

    // Same address again is answered from the earlier match.
    checkout.lookup_email(EMAIL).await.unwrap();

    let lookup = checkout.lookup_email("otra@correo.cl").await.unwrap();
    assert_eq!(lookup, CustomerLookup::NotFound);
    assert!(checkout.autofill().is_none());
    assert!(checkout.lookup().is_none());

    checkout.lookup_email(EMAIL).await.unwrap();
    assert!(checkout.autofill().is_some());
}

#[tokio::test]
async fn new_shopper_can_register_on_demand() {
    let h = Harness::start().await;
    h.mount_customer_lookup(404, json!({"detail": "Not found."}))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/clientes/"))
        .and(body_partial_json(json!({
            "rut": RUT,
            "nombre": "Ana",
            "apellido": "Rojas",
            "email": EMAIL,
            "comuna": "Ñuñoa"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(registered_json()))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(registered_json()))
        .expect(0)
        .mount(&h.server)
        .await;
    h.mount_sale_created("1000.00").await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    checkout.lookup_tax_id(RUT).await.unwrap();

    let customer = match checkout.offer_registration(identity()).unwrap() {
        CheckoutStep::RegistrationOffered { customer } => customer,
        other @ CheckoutStep::Submitted(_) => panic!("expected a registration offer, got {other:?}"),
    };
    assert_eq!(customer.tax_id, RUT);
    assert_eq!(customer.first_name, "Cliente Web");
    assert!(h.pending().is_none());

    let details = RegistrationDetails {
        first_name: "Ana".to_string(),
        last_name: "Rojas".to_string(),
        locality: "Ñuñoa".to_string(),
    };
    let pending = expect_submitted(checkout.register(&details).await.unwrap());
    assert_eq!(pending.cliente.rut, RUT);
    assert_eq!(h.pending(), Some(pending));
}

#[tokio::test]
async fn submission_in_flight_refuses_a_second_one() {
    let h = Harness::start().await;
    h.mount_customer_lookup(404, json!({"detail": "Not found."}))
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(temporary_json()))
        .expect(0)
        .mount(&h.server)
        .await;

    let cart = h.cart_with(1);
    let mut checkout = h.checkout(&cart, ViewLifetime::new());
    let held = checkout
        .processing_flag()
        .try_begin()
        .expect("flag starts free");
    assert!(checkout.is_processing());

    let err = checkout.submit(identity()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::AlreadyProcessing));
    assert!(h.pending().is_none());

    drop(held);
    assert!(!checkout.is_processing());
}
