use anyhow::bail;
use clap::Subcommand;
use closet_background::{Background, Storage};
use closet_core::{Request, Response};

/// Sub-commands available under `products`.
#[derive(Debug, Subcommand)]
pub enum ProductsCommands {
    /// List saved products, newest first
    List,
    /// Remove the saved product with this URL
    Remove {
        /// Product page URL as it was saved
        url: String,
    },
    /// Remove every saved product
    Clear,
}

pub(crate) fn ensure_success(response: Response) -> anyhow::Result<Response> {
    if response.success {
        Ok(response)
    } else {
        bail!(response
            .error
            .unwrap_or_else(|| "background reported a failure".to_string()))
    }
}

pub(crate) async fn run_products<S: Storage>(
    background: &Background<S>,
    command: ProductsCommands,
) -> anyhow::Result<()> {
    match command {
        ProductsCommands::List => {
            let products = ensure_success(background.handle(Request::GetProducts).await)?
                .products
                .unwrap_or_default();
            if products.is_empty() {
                println!("no saved products");
            }
            for product in products {
                println!(
                    "{}  {:<8}  {}  {}",
                    product.timestamp.format("%Y-%m-%d %H:%M"),
                    product.price,
                    product.title,
                    product.url
                );
            }
        }
        ProductsCommands::Remove { url } => {
            let products = ensure_success(background.handle(Request::GetProducts).await)?
                .products
                .unwrap_or_default();
            let Some(product) = products.into_iter().find(|p| p.url == url) else {
                bail!("no saved product with URL {url}");
            };
            ensure_success(background.handle(Request::RemoveProduct { product }).await)?;
            println!("removed {url}");
        }
        ProductsCommands::Clear => {
            let response = ensure_success(background.handle(Request::ClearAll).await)?;
            println!("{}", response.message.unwrap_or_default());
        }
    }
    Ok(())
}
