//! Flow Hydration CLI - Log in and manage the cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in with an OTP over WhatsApp (prompts for anything not given)
//! flow-cli login --mobile 9876543210
//!
//! # Log in with an OTP over SMS
//! flow-cli login --channel sms
//!
//! # Show the logged-in customer
//! flow-cli whoami
//!
//! # Add two bottles to the cart, then list it
//! flow-cli cart add --slug lemon-mint --name "Lemon Mint" --price 45 --quantity 2
//! flow-cli cart list
//! ```
//!
//! # Commands
//!
//! - `login` - Interactive OTP login
//! - `logout` - Forget the stored session (the cart is kept)
//! - `whoami` - Validate the session and show the profile
//! - `cart` - List, add, update, remove, clear or sync cart lines
//!
//! # Environment Variables
//!
//! - `FLOW_API_BASE_URL` - Customer API base URL
//! - `FLOW_STORAGE_PATH` - JSON file holding the session and cart
//! - `FLOW_REQUEST_TIMEOUT_SECS` - HTTP timeout in seconds
//! - `RUST_LOG` - Log filter (default `flow_hydration=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use flow_hydration_core::{OtpChannel, Price};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "flow-cli")]
#[command(author, version, about = "Flow Hydration customer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a one-time password
    Login {
        /// 10-digit mobile number (prompted if omitted)
        #[arg(short, long)]
        mobile: Option<String>,

        /// Delivery channel for the OTP (`whatsapp` or `sms`)
        #[arg(short, long, default_value = "whatsapp")]
        channel: OtpChannel,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in customer
    Whoami,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines
    List,
    /// Add a product to the cart
    Add {
        /// Product slug
        #[arg(short, long)]
        slug: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Unit price in rupees
        #[arg(short, long)]
        price: Price,

        /// Backend product ID (defaults to the slug)
        #[arg(long)]
        product_id: Option<String>,

        /// Flavour variant
        #[arg(short, long)]
        flavour: Option<String>,

        /// Quantity to add
        #[arg(short, long)]
        quantity: Option<u32>,

        /// Image URL
        #[arg(long)]
        image: Option<String>,
    },
    /// Set the quantity of a line (0 removes it)
    Update {
        /// Line number as shown by `cart list`
        line: usize,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Line number as shown by `cart list`
        line: usize,
    },
    /// Empty the cart
    Clear,
    /// Push the local cart to the server
    Sync,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flow_hydration=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let auth = commands::open()?;

    match cli.command {
        Commands::Login { mobile, channel } => {
            commands::login::run(&auth, mobile, channel).await?;
        }
        Commands::Logout => commands::session::logout(&auth),
        Commands::Whoami => commands::session::whoami(&auth).await?,
        Commands::Cart { action } => match action {
            CartAction::List => commands::cart::list(&auth).await,
            CartAction::Add {
                slug,
                name,
                price,
                product_id,
                flavour,
                quantity,
                image,
            } => commands::cart::add(
                &auth,
                commands::cart::NewLine {
                    slug,
                    name,
                    price,
                    product_id,
                    flavour,
                    quantity,
                    image,
                },
            ),
            CartAction::Update { line, quantity } => {
                commands::cart::update(&auth, line, quantity)?;
            }
            CartAction::Remove { line } => commands::cart::remove(&auth, line)?,
            CartAction::Clear => commands::cart::clear(&auth).await,
            CartAction::Sync => commands::cart::sync(&auth).await,
        },
    }

    auth.cart().flush().await;
    Ok(())
}
