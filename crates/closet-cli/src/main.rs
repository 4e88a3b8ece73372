mod auth;
mod extension;
mod page;
mod products;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::auth::AuthCommands;
use crate::extension::Extension;
use crate::page::PageArgs;
use crate::products::ProductsCommands;

#[derive(Debug, Parser)]
#[command(name = "closet")]
#[command(about = "Detect product pages, save products, and run virtual try-ons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve and classify a page, and show what would be extracted
    Inspect {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Save the product on a page to the personal list
    Save {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Run a virtual try-on for the product on a page
    Tryon {
        #[command(flatten)]
        page: PageArgs,
        /// Reference photo to upload when none is on file yet
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Write the decorated page HTML here
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Manage saved products
    Products {
        #[command(subcommand)]
        command: ProductsCommands,
    },
    /// Manage the backend identity
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

// The content script holds a parsed document, which is not `Send`, so the
// page side runs on a single-threaded runtime.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = closet_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let extension = Extension::start(config).await?;

    match cli.command {
        Commands::Inspect { page } => page::run_inspect(&extension, &page).await,
        Commands::Save { page } => page::run_save(&extension, &page).await,
        Commands::Tryon { page, photo, out } => {
            page::run_tryon(&extension, &page, photo.as_deref(), out.as_deref()).await
        }
        Commands::Products { command } => {
            products::run_products(extension.background(), command).await
        }
        Commands::Auth { command } => auth::run_auth(extension.background(), command).await,
    }
}
