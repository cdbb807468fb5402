//! Shopper-facing command handlers: catalog, cart, checkout, payment,
//! receipt, and profile.

use clap::Subcommand;
use tienda_core::{Customer, Product};
use tienda_storefront::confirmation::format_clp;
use tienda_storefront::profile::{load_profile, remembered_tax_id, update_profile};
use tienda_storefront::{
    CardDetails, CartStore, Checkout, CheckoutError, CheckoutStep, Confirmation, CustomerLookup,
    PaymentError, PaymentSimulator, PendingPurchase, ProfileError, ProfileUpdate,
    RegistrationDetails, ShopperIdentity, ViewLifetime,
};

use crate::Session;

/// Sub-commands available under `cart`.
#[derive(Debug, Subcommand)]
pub enum CartCommands {
    /// List cart lines and the total
    Show,
    /// Add a product by code
    Add {
        code: String,
        #[arg(long, default_value = "1")]
        quantity: u32,
    },
    /// Set a line's quantity; zero or less removes it
    Set {
        code: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Add one unit
    Inc { code: String },
    /// Remove one unit
    Dec { code: String },
    /// Remove a line
    Remove { code: String },
    /// Empty the cart
    Clear,
}

/// Sub-commands available under `profile`.
#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    /// Show the profile for a RUT (defaults to the last one used here)
    Show {
        #[arg(long)]
        rut: Option<String>,
    },
    /// Replace name, surname, locality, and email
    Update {
        #[arg(long)]
        rut: Option<String>,
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        apellido: String,
        #[arg(long)]
        comuna: String,
        #[arg(long)]
        email: Option<String>,
    },
}

/// How to answer a registration offer, decided up front on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationAnswer {
    Register(RegistrationDetails),
    Skip,
    Undecided,
}

pub(crate) async fn run_login(session: &Session, username: &str, password: &str) -> anyhow::Result<()> {
    session.api.login(username, password).await?;
    println!("logged in as {username}");
    Ok(())
}

pub(crate) fn run_logout(session: &Session) -> anyhow::Result<()> {
    session.api.logout()?;
    println!("logged out");
    Ok(())
}

/// Prints one catalog page.
///
/// # Errors
///
/// Returns an error if the product listing request fails.
pub(crate) async fn run_catalog(session: &Session, page: u32) -> anyhow::Result<()> {
    let products = session.api.list_products(page).await?;
    if products.results.is_empty() {
        println!("no products on page {page}");
        return Ok(());
    }

    println!("{:<12}{:<32}{:>12}{:>8}", "CODE", "NAME", "PRICE", "STOCK");
    for p in &products.results {
        let stock = if p.in_stock() {
            p.stock.to_string()
        } else {
            "agotado".to_string()
        };
        println!(
            "{:<12}{:<32}{:>12}{:>8}",
            p.code,
            truncate(&p.name, 30),
            format_clp(p.price),
            stock
        );
    }
    println!(
        "page {page} of {} products{}",
        products.count,
        if products.has_next() { "; more with --page" } else { "" }
    );
    Ok(())
}

pub(crate) async fn run_cart(session: &Session, command: CartCommands) -> anyhow::Result<()> {
    let mut cart = CartStore::load(session.store.clone())?;
    match command {
        CartCommands::Show => {}
        CartCommands::Add { code, quantity } => {
            let product: Product = session.api.get_product(&code).await?;
            cart.add_item(&product, quantity)?;
            println!("added {quantity} x {}", product.name);
        }
        CartCommands::Set { code, quantity } => {
            if !cart.set_quantity(&code, quantity)? {
                println!("{code} is not in the cart");
            }
        }
        CartCommands::Inc { code } => {
            if !cart.increment(&code)? {
                println!("{code} is not in the cart or already at its stock limit");
            }
        }
        CartCommands::Dec { code } => {
            if !cart.decrement(&code)? {
                println!("{code} is not in the cart");
            }
        }
        CartCommands::Remove { code } => {
            if !cart.remove_item(&code)? {
                println!("{code} is not in the cart");
            }
        }
        CartCommands::Clear => cart.clear()?,
    }
    print_cart(&cart);
    Ok(())
}

fn print_cart(cart: &CartStore) {
    if cart.is_empty() {
        println!("the cart is empty");
        return;
    }
    println!("{:<12}{:<32}{:>6}{:>12}", "CODE", "NAME", "QTY", "SUBTOTAL");
    for line in cart.items() {
        println!(
            "{:<12}{:<32}{:>6}{:>12}",
            line.code,
            truncate(&line.name, 30),
            line.quantity,
            format_clp(line.subtotal())
        );
    }
    println!(
        "{} units, total {}",
        cart.total_units(),
        format_clp(cart.total())
    );
}

/// Runs checkout in one go: lookups, submission, and the registration
/// answer given on the command line.
///
/// # Errors
///
/// Returns an error for an empty cart, invalid identity, or a refused order;
/// the message is the one meant for the shopper.
pub(crate) async fn run_checkout(
    session: &Session,
    rut: &str,
    email: &str,
    answer: RegistrationAnswer,
    view: ViewLifetime,
) -> anyhow::Result<()> {
    let cart = CartStore::load(session.store.clone())?;
    let mut checkout = Checkout::begin(session.api.clone(), session.store.clone(), &cart, view)
        .map_err(shopper_error)?;

    let mut lookup = checkout.lookup_tax_id(rut).await.map_err(shopper_error)?;
    if lookup == CustomerLookup::NotFound {
        lookup = checkout.lookup_email(email).await.map_err(shopper_error)?;
    }
    if let Some(fill) = checkout.autofill() {
        println!(
            "welcome back, {} {} ({})",
            fill.first_name, fill.last_name, fill.locality
        );
    }

    let identity = ShopperIdentity::new(rut, email);
    let step = match (&answer, &lookup) {
        // Shoppers the flow would not prompt can still register on request.
        (RegistrationAnswer::Register(_), CustomerLookup::NotFound) => {
            checkout.offer_registration(identity).map_err(shopper_error)?
        }
        _ => checkout.submit(identity).await.map_err(shopper_error)?,
    };

    let step = match (step, answer) {
        (CheckoutStep::Submitted(pending), _) => CheckoutStep::Submitted(pending),
        (CheckoutStep::RegistrationOffered { .. }, RegistrationAnswer::Register(details)) => {
            checkout.register(&details).await.map_err(shopper_error)?
        }
        (CheckoutStep::RegistrationOffered { .. }, RegistrationAnswer::Skip) => {
            checkout.skip_registration().await.map_err(shopper_error)?
        }
        (CheckoutStep::RegistrationOffered { customer }, RegistrationAnswer::Undecided) => {
            println!(
                "RUT {} has bought here before but is not registered.",
                customer.tax_id
            );
            println!("rerun with --register --nombre .. --apellido .. --comuna .. to register, or --skip to continue as a guest");
            return Ok(());
        }
    };

    if let CheckoutStep::Submitted(pending) = step {
        print_pending(&pending);
        println!("next: `tienda pay` to complete the purchase");
    }
    Ok(())
}

fn print_pending(pending: &PendingPurchase) {
    println!("order {} submitted", pending.numero);
    for item in &pending.productos {
        println!(
            "  {:>3} x {:<30} {:>12}",
            item.cantidad,
            truncate(&item.nombre, 30),
            format_clp(item.subtotal())
        );
    }
    println!("total {}", format_clp(pending.total));
}

/// # Errors
///
/// Returns an error when there is nothing to pay or the card is refused.
pub(crate) async fn run_pay(
    session: &Session,
    card: &CardDetails,
    view: ViewLifetime,
) -> anyhow::Result<()> {
    let payment = match PaymentSimulator::open(
        session.store.clone(),
        session.config.pending_purchase_ttl(),
        session.config.payment_delay(),
        view,
    ) {
        Ok(p) => p,
        Err(PaymentError::NothingToPay) => {
            println!("nothing to pay; browse the catalog with `tienda catalog`");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "paying order {} ({}) with card {}",
        payment.pending().numero,
        format_clp(payment.pending().total),
        tienda_storefront::payment::card_preview(&card.number)
    );
    let mut cart = CartStore::load(session.store.clone())?;
    let completed = payment.submit(card, &mut cart).await?;
    println!(
        "payment accepted, card ending in {}",
        completed.ultimos4_digitos
    );
    println!("see `tienda receipt` for the receipt");
    Ok(())
}

pub(crate) fn run_receipt(session: &Session, done: bool) -> anyhow::Result<()> {
    let Some(confirmation) = Confirmation::open(session.store.clone())? else {
        println!("no completed purchase to show");
        return Ok(());
    };
    println!("{confirmation}");
    if done {
        confirmation.finish()?;
    }
    Ok(())
}

pub(crate) async fn run_profile(session: &Session, command: ProfileCommands) -> anyhow::Result<()> {
    match command {
        ProfileCommands::Show { rut } => {
            let rut = resolve_rut(session, rut)?;
            let customer = load_profile(&session.api, &rut).await.map_err(profile_error)?;
            print_customer(&customer);
        }
        ProfileCommands::Update {
            rut,
            nombre,
            apellido,
            comuna,
            email,
        } => {
            let rut = resolve_rut(session, rut)?;
            let update = ProfileUpdate {
                first_name: nombre,
                last_name: apellido,
                email,
                locality: comuna,
            };
            let saved = update_profile(&session.api, &rut, &update)
                .await
                .map_err(profile_error)?;
            println!("profile updated");
            print_customer(&saved);
        }
    }
    Ok(())
}

fn resolve_rut(session: &Session, rut: Option<String>) -> anyhow::Result<String> {
    match rut {
        Some(rut) => Ok(rut),
        None => remembered_tax_id(session.store.as_ref())?
            .ok_or_else(|| anyhow::anyhow!("no RUT remembered on this device; pass --rut")),
    }
}

pub(crate) fn print_customer(c: &Customer) {
    println!("RUT:      {}", c.tax_id);
    println!("Nombre:   {}", c.full_name());
    println!("Email:    {}", c.email.as_deref().unwrap_or("\u{2014}"));
    println!("Comuna:   {}", c.locality);
    println!("Tipo:     {}", c.flavor());
}

fn shopper_error(e: CheckoutError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

fn profile_error(e: ProfileError) -> anyhow::Error {
    match e {
        ProfileError::Api(api) => anyhow::anyhow!(api.user_message()),
        other => anyhow::anyhow!(other),
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max - 3).collect::<String>())
    } else {
        s.to_string()
    }
}
