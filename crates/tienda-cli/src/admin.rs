//! Back-office command handlers: CRUD over customers, products, and sales,
//! plus the dashboard figures.

use chrono::Local;
use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tienda_core::{Customer, Product};
use tienda_storefront::confirmation::format_clp;
use tienda_storefront::{Dashboard, Period};

use crate::shop::{print_customer, truncate};
use crate::Session;

/// Sub-commands available under `admin`.
#[derive(Debug, Subcommand)]
pub enum AdminCommands {
    Customers {
        #[command(subcommand)]
        command: CustomerCommands,
    },
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },
    Sales {
        #[command(subcommand)]
        command: SaleCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum CustomerCommands {
    List {
        #[arg(long, default_value = "1")]
        page: u32,
    },
    Get {
        rut: String,
    },
    Create {
        #[arg(long)]
        rut: String,
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        apellido: String,
        #[arg(long)]
        comuna: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Change only the given fields
    Update {
        rut: String,
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        apellido: Option<String>,
        #[arg(long)]
        comuna: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Delete {
        rut: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProductCommands {
    List {
        #[arg(long, default_value = "1")]
        page: u32,
    },
    Get {
        code: String,
    },
    Create {
        #[arg(long)]
        codigo: String,
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        precio: Decimal,
        #[arg(long, default_value = "0")]
        stock: i32,
        #[arg(long)]
        descripcion: Option<String>,
    },
    /// Change only the given fields
    Update {
        code: String,
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        precio: Option<Decimal>,
        #[arg(long)]
        stock: Option<i32>,
        #[arg(long)]
        descripcion: Option<String>,
    },
    Delete {
        code: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SaleCommands {
    List {
        #[arg(long, default_value = "1")]
        page: u32,
    },
    /// Show a sale with its detail lines
    Get {
        numero: String,
    },
    Delete {
        numero: String,
    },
}

pub(crate) async fn run_admin(session: &Session, command: AdminCommands) -> anyhow::Result<()> {
    match command {
        AdminCommands::Customers { command } => run_customers(session, command).await,
        AdminCommands::Products { command } => run_products(session, command).await,
        AdminCommands::Sales { command } => run_sales(session, command).await,
    }
}

async fn run_customers(session: &Session, command: CustomerCommands) -> anyhow::Result<()> {
    let api = &session.api;
    match command {
        CustomerCommands::List { page } => {
            let customers = api.list_customers(page).await?;
            println!("{:<12}{:<32}{:<30}{:<11}", "RUT", "NAME", "EMAIL", "TYPE");
            for c in &customers.results {
                println!(
                    "{:<12}{:<32}{:<30}{:<11}",
                    c.tax_id,
                    truncate(&c.full_name(), 30),
                    truncate(c.email.as_deref().unwrap_or("\u{2014}"), 28),
                    c.flavor()
                );
            }
            println!("{} customers in total", customers.count);
        }
        CustomerCommands::Get { rut } => {
            let customer = api
                .get_customer(&rut)
                .await?
                .ok_or_else(|| anyhow::anyhow!("customer '{rut}' not found"))?;
            print_customer(&customer);
        }
        CustomerCommands::Create {
            rut,
            nombre,
            apellido,
            comuna,
            email,
        } => {
            let customer = Customer {
                tax_id: rut,
                first_name: nombre,
                last_name: apellido,
                email,
                locality: comuna,
            };
            let created = api.create_customer(&customer).await?;
            println!("customer created");
            print_customer(&created);
        }
        CustomerCommands::Update {
            rut,
            nombre,
            apellido,
            comuna,
            email,
        } => {
            let changes = changed_fields([
                ("nombre", nombre.map(Value::from)),
                ("apellido", apellido.map(Value::from)),
                ("comuna", comuna.map(Value::from)),
                ("email", email.map(Value::from)),
            ])?;
            let updated = api.patch_customer(&rut, &changes).await?;
            println!("customer updated");
            print_customer(&updated);
        }
        CustomerCommands::Delete { rut } => {
            api.delete_customer(&rut).await?;
            println!("customer {rut} deleted");
        }
    }
    Ok(())
}

async fn run_products(session: &Session, command: ProductCommands) -> anyhow::Result<()> {
    let api = &session.api;
    match command {
        ProductCommands::List { page } => {
            let products = api.list_products(page).await?;
            for p in &products.results {
                print_product_row(p);
            }
            println!("{} products in total", products.count);
        }
        ProductCommands::Get { code } => {
            let p = api.get_product(&code).await?;
            print_product_row(&p);
            if let Some(desc) = p.description.as_deref() {
                println!("  {desc}");
            }
        }
        ProductCommands::Create {
            codigo,
            nombre,
            precio,
            stock,
            descripcion,
        } => {
            let product = Product {
                id: None,
                code: codigo,
                name: nombre,
                price: precio,
                stock,
                description: descripcion,
                foto_url: None,
            };
            let created = api.create_product(&product).await?;
            println!("product created");
            print_product_row(&created);
        }
        ProductCommands::Update {
            code,
            nombre,
            precio,
            stock,
            descripcion,
        } => {
            let changes = changed_fields([
                ("nombre", nombre.map(Value::from)),
                ("precio", precio.map(|p| Value::from(p.to_string()))),
                ("stock", stock.map(Value::from)),
                ("descripcion", descripcion.map(Value::from)),
            ])?;
            let updated = api.patch_product(&code, &changes).await?;
            println!("product updated");
            print_product_row(&updated);
        }
        ProductCommands::Delete { code } => {
            api.delete_product(&code).await?;
            println!("product {code} deleted");
        }
    }
    Ok(())
}

async fn run_sales(session: &Session, command: SaleCommands) -> anyhow::Result<()> {
    let api = &session.api;
    match command {
        SaleCommands::List { page } => {
            let sales = api.list_sales(page).await?;
            println!("{:<16}{:<12}{:<12}{:>12}", "NUMBER", "DATE", "RUT", "TOTAL");
            for s in &sales.results {
                println!(
                    "{:<16}{:<12}{:<12}{:>12}",
                    s.number,
                    s.day().map_or_else(|| s.date.clone(), |d| d.to_string()),
                    s.customer.tax_id(),
                    format_clp(s.total)
                );
            }
            println!("{} sales in total", sales.count);
        }
        SaleCommands::Get { numero } => {
            let sale = api.get_sale(&numero).await?;
            let lines = if sale.lines.is_empty() {
                api.list_sale_details(&numero).await?
            } else {
                sale.lines.clone()
            };
            println!("Sale {} on {} for {}", sale.number, sale.date, sale.customer.tax_id());
            for line in &lines {
                println!(
                    "  {:>3} x {:<30} {:>12}",
                    line.quantity,
                    truncate(line.product_name(), 30),
                    format_clp(line.line_total())
                );
            }
            println!("Total: {}", format_clp(sale.total));
        }
        SaleCommands::Delete { numero } => {
            api.delete_sale(&numero).await?;
            println!("sale {numero} deleted");
        }
    }
    Ok(())
}

/// Prints headline figures, revenue per day in `period`, the customer mix,
/// and the five best-selling products.
///
/// # Errors
///
/// Returns an error if sales or customers cannot be fetched.
pub(crate) async fn run_dashboard(session: &Session, period: Period) -> anyhow::Result<()> {
    let dashboard = Dashboard::load(&session.api).await?;
    let today = Local::now().date_naive();

    let summary = dashboard.summary(today);
    println!("Sales:          {}", summary.count);
    println!("Revenue:        {}", format_clp(summary.total_revenue));
    println!("Revenue today:  {}", format_clp(summary.revenue_today));
    println!("Average sale:   {}", format_clp(summary.average_sale));

    let (registered, temporary) = dashboard.customer_mix();
    println!(
        "Customers:      {} ({registered} registered, {temporary} temporary)",
        registered + temporary
    );

    println!();
    println!("Revenue by day ({period}):");
    let by_date = dashboard.revenue_over(period, today);
    if by_date.is_empty() {
        println!("  no sales in this period");
    }
    for (day, revenue) in &by_date {
        println!("  {day}  {:>12}", format_clp(*revenue));
    }

    println!();
    println!("Top products:");
    for p in dashboard.top_products(5) {
        println!(
            "  {:<30}{:>6} units{:>14}",
            truncate(&p.name, 30),
            p.units,
            format_clp(p.revenue)
        );
    }
    Ok(())
}

fn print_product_row(p: &Product) {
    println!(
        "{:<12}{:<32}{:>12}{:>8}",
        p.code,
        truncate(&p.name, 30),
        format_clp(p.price),
        p.stock
    );
}

/// Builds a PATCH body from the fields that were given.
pub(crate) fn changed_fields<const N: usize>(
    fields: [(&str, Option<Value>); N],
) -> anyhow::Result<Value> {
    let changes: Map<String, Value> = fields
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
        .collect();
    if changes.is_empty() {
        anyhow::bail!("nothing to update; pass at least one field");
    }
    Ok(Value::Object(changes))
}
