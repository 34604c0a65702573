//! Music Shop CLI - migrations, catalog import, and back-office commands.
//!
//! # Usage
//!
//! ```bash
//! # Create or update the schema and the session table
//! musicshop-cli migrate
//!
//! # Import genres, artists, and albums from YAML
//! musicshop-cli seed catalog data/catalog.yaml
//!
//! # Set an album's stock (notifies wish-listers on a restock)
//! musicshop-cli stock set 12 5
//!
//! # Move an order forward
//! musicshop-cli order advance 40 ready
//! ```
//!
//! All commands read `MUSICSHOP_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use musicshop_core::{AlbumId, OrderId, OrderStatus};

mod commands;

#[derive(Parser)]
#[command(name = "musicshop-cli")]
#[command(author, version, about = "Music Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage album stock
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
    /// Manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Import the catalog from a YAML file (upserts by slug)
    Catalog {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Set an album's stock level
    Set {
        /// Album ID
        album_id: AlbumId,
        /// New stock level (zero or more)
        #[arg(allow_negative_numbers = true)]
        stock: i32,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Move an order to a later status
    Advance {
        /// Order ID
        order_id: OrderId,
        /// Target status (`in_progress`, `ready`, `completed`)
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
}

fn parse_status(raw: &str) -> Result<OrderStatus, String> {
    raw.parse()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
        Commands::Stock { action } => match action {
            StockAction::Set { album_id, stock } => {
                commands::manage::set_stock(album_id, stock).await?;
            }
        },
        Commands::Order { action } => match action {
            OrderAction::Advance { order_id, status } => {
                commands::manage::advance_order(order_id, status).await?;
            }
        },
    }
    Ok(())
}
