mod admin;
mod shop;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tienda_api::ApiClient;
use tienda_core::{AppConfig, FileStore, KeyValueStore};
use tienda_storefront::ViewLifetime;
use tracing_subscriber::EnvFilter;

use crate::admin::AdminCommands;
use crate::shop::{CartCommands, ProfileCommands};

#[derive(Debug, Parser)]
#[command(name = "tienda")]
#[command(about = "Storefront client: browse, buy, and administer the shop")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Obtain and store an access/refresh token pair
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "TIENDA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget stored tokens
    Logout,
    /// List products
    Catalog {
        #[arg(long, default_value = "1")]
        page: u32,
    },
    /// Inspect or change the session cart
    Cart {
        #[command(subcommand)]
        command: CartCommands,
    },
    /// Submit the cart as an order
    Checkout {
        #[arg(long)]
        rut: String,
        #[arg(long)]
        email: String,
        /// Register with full personal data before ordering
        #[arg(long, requires_all = ["nombre", "apellido", "comuna"], conflicts_with = "skip")]
        register: bool,
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        apellido: Option<String>,
        #[arg(long)]
        comuna: Option<String>,
        /// Decline the registration offer and order as a guest
        #[arg(long)]
        skip: bool,
    },
    /// Pay the pending order with a (simulated) card
    Pay {
        #[arg(long)]
        number: String,
        #[arg(long)]
        holder: String,
        /// Expiry as MM/YY
        #[arg(long)]
        expiry: String,
        #[arg(long)]
        cvv: String,
    },
    /// Show the receipt of the last completed payment
    Receipt {
        /// Dismiss the receipt after printing it
        #[arg(long)]
        done: bool,
    },
    /// View or edit the shopper profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Manage customers, products, and sales (requires login)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Sales and customer statistics
    Dashboard {
        /// day, week or month (dia, semana, mes)
        #[arg(long, default_value = "week")]
        period: tienda_storefront::Period,
    },
}

/// Everything a command handler needs, built once per invocation.
pub(crate) struct Session {
    pub config: AppConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub api: Arc<ApiClient>,
}

impl Session {
    fn open(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage_path.clone()));
        let api = ApiClient::new(&config, Arc::clone(&store))
            .map_err(|e| anyhow::anyhow!("failed to build API client: {e}"))?;
        Ok(Self {
            config,
            store,
            api: Arc::new(api),
        })
    }

    /// A lifetime that ends on Ctrl-C, so interrupted flows write nothing.
    fn view_lifetime() -> ViewLifetime {
        let view = ViewLifetime::new();
        let watcher = view.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, abandoning current step");
                watcher.end();
            }
        });
        view
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = tienda_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("tienda: nothing to do; see `tienda --help`");
        return Ok(());
    };

    let session = Session::open(config)?;
    tracing::debug!(
        storage = %session.config.storage_path.display(),
        env = %session.config.env,
        "session opened"
    );

    match command {
        Commands::Login { username, password } => {
            shop::run_login(&session, &username, &password).await
        }
        Commands::Logout => shop::run_logout(&session),
        Commands::Catalog { page } => shop::run_catalog(&session, page).await,
        Commands::Cart { command } => shop::run_cart(&session, command).await,
        Commands::Checkout {
            rut,
            email,
            register,
            nombre,
            apellido,
            comuna,
            skip,
        } => {
            let answer = if register {
                shop::RegistrationAnswer::Register(tienda_storefront::RegistrationDetails {
                    first_name: nombre.unwrap_or_default(),
                    last_name: apellido.unwrap_or_default(),
                    locality: comuna.unwrap_or_default(),
                })
            } else if skip {
                shop::RegistrationAnswer::Skip
            } else {
                shop::RegistrationAnswer::Undecided
            };
            shop::run_checkout(&session, &rut, &email, answer, Session::view_lifetime()).await
        }
        Commands::Pay {
            number,
            holder,
            expiry,
            cvv,
        } => {
            let card = tienda_storefront::CardDetails::from_input(&number, &holder, &expiry, &cvv);
            shop::run_pay(&session, &card, Session::view_lifetime()).await
        }
        Commands::Receipt { done } => shop::run_receipt(&session, done),
        Commands::Profile { command } => shop::run_profile(&session, command).await,
        Commands::Admin { command } => admin::run_admin(&session, command).await,
        Commands::Dashboard { period } => admin::run_dashboard(&session, period).await,
    }
}
