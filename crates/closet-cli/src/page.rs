//! Commands that run the content script against a saved page.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use closet_background::ChannelMessenger;
use closet_page::orchestrator::LIMIT_EXCEEDED_MESSAGE;
use closet_page::{
    extract_product_info, is_apparel_page, is_product_page, ContentScript, InitOutcome, Page,
    ReferencePhoto, SaveOutcome, TryonOutcome,
};

use crate::extension::Extension;

#[derive(Debug, clap::Args)]
pub struct PageArgs {
    /// Address the page was loaded from
    #[arg(long)]
    pub url: String,
    /// Saved HTML of the page
    #[arg(long)]
    pub html: PathBuf,
}

pub(crate) async fn run_inspect(extension: &Extension, args: &PageArgs) -> anyhow::Result<()> {
    let html = tokio::fs::read_to_string(&args.html)
        .await
        .with_context(|| format!("failed to read {}", args.html.display()))?;
    let page = Page::new(&args.url, &html);
    let registry = extension.registry();

    let Some(resolution) = registry.resolve_location(&page.location) else {
        println!("no site pattern matches {}", args.url);
        return Ok(());
    };
    println!("site:         {} ({})", resolution.site_id, resolution.variant);

    let product = is_product_page(registry, &page);
    println!("product page: {product}");
    if !product {
        return Ok(());
    }
    let apparel = is_apparel_page(registry, &page, extension.config().apparel_match);
    println!("apparel:      {apparel}");

    if let Some(info) = extract_product_info(registry, &page, Utc::now()) {
        println!("{}", serde_json::to_string_pretty(&info)?);
    }
    Ok(())
}

async fn decorated_page(
    extension: &Extension,
    args: &PageArgs,
) -> anyhow::Result<(ContentScript<ChannelMessenger>, bool)> {
    let mut script = extension.open_page(&args.url, &args.html).await?;
    match script.init().await {
        InitOutcome::NotProductPage => bail!("{} is not a recognised product page", args.url),
        InitOutcome::Decorated { apparel, .. } => Ok((script, apparel)),
    }
}

pub(crate) async fn run_save(extension: &Extension, args: &PageArgs) -> anyhow::Result<()> {
    let (mut script, _) = decorated_page(extension, args).await?;
    match script.click_save().await {
        SaveOutcome::Saved(product) => {
            println!("saved: {} ({})", product.title, product.price);
            Ok(())
        }
        SaveOutcome::Busy => bail!("save is already in progress"),
        SaveOutcome::Failed(e) => Err(e.into()),
    }
}

pub(crate) async fn run_tryon(
    extension: &Extension,
    args: &PageArgs,
    photo: Option<&Path>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let (mut script, apparel) = decorated_page(extension, args).await?;
    if !apparel {
        bail!("{} is not an apparel page; try-on is not offered", args.url);
    }

    let mut outcome = script.click_tryon().await;
    if matches!(outcome, TryonOutcome::AwaitingUpload) {
        let Some(photo) = photo else {
            script.cancel_upload();
            bail!("no reference photo on file; pass --photo to upload one");
        };
        let bytes = tokio::fs::read(photo)
            .await
            .with_context(|| format!("failed to read {}", photo.display()))?;
        let reference = ReferencePhoto {
            bytes,
            mime_type: mime_type_for(photo).to_string(),
        };
        outcome = script.confirm_upload(reference).await;
    }

    match outcome {
        TryonOutcome::Injected { image_url } => {
            println!("{image_url}");
            if let Some(out) = out {
                tokio::fs::write(out, script.page().document.html())
                    .await
                    .with_context(|| format!("failed to write {}", out.display()))?;
                tracing::info!(path = %out.display(), "decorated page written");
            }
            Ok(())
        }
        TryonOutcome::LimitExceeded => bail!(LIMIT_EXCEEDED_MESSAGE),
        TryonOutcome::Failed(e) => Err(e.into()),
        TryonOutcome::Unavailable | TryonOutcome::Busy | TryonOutcome::AwaitingUpload => {
            bail!("try-on did not start")
        }
    }
}

/// MIME type for a reference photo, from its file extension.
pub(crate) fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
