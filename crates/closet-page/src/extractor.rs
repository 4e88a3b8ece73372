//! Product detail extraction from a product page.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use closet_core::{ProductInfo, UNKNOWN_PRICE, UNKNOWN_TITLE};
use regex::Regex;
use url::Url;

use crate::classifier::title_text;
use crate::page::Page;
use crate::registry::PatternRegistry;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\d+(?:\.\d{2})?").expect("static regex is valid"));

/// Builds a [`ProductInfo`] from the page. Returns `None` when no site
/// pattern resolves for the page.
///
/// Missing fields fall back to sentinels: the title to
/// [`UNKNOWN_TITLE`], the price to [`UNKNOWN_PRICE`], the image to an
/// empty string.
#[must_use]
pub fn extract_product_info(
    registry: &PatternRegistry,
    page: &Page,
    now: DateTime<Utc>,
) -> Option<ProductInfo> {
    let resolution = registry.resolve_location(&page.location)?;
    let selectors = &resolution.pattern.selectors;
    let document = &page.document;

    let title = title_text(resolution.pattern, document).unwrap_or_else(|| UNKNOWN_TITLE.into());
    let image = document
        .select_first(&selectors.image)
        .and_then(|el| el.value().attr("src"))
        .map(|src| resolve_image_url(src, &page.location.href))
        .unwrap_or_default();
    let price = document
        .select_first(&selectors.price)
        .map(|el| extract_price(&el.text().collect::<String>()))
        .unwrap_or_else(|| UNKNOWN_PRICE.into());

    Some(ProductInfo {
        title,
        image,
        price,
        url: page.location.href.clone(),
        site: resolution.site_id.to_string(),
        timestamp: now,
    })
}

/// First `$<digits>[.<two digits>]` run in `text`, or [`UNKNOWN_PRICE`].
#[must_use]
pub fn extract_price(text: &str) -> String {
    PRICE_RE
        .find(text)
        .map_or_else(|| UNKNOWN_PRICE.to_string(), |m| m.as_str().to_string())
}

/// Resolves an image `src` against the page URL.
///
/// Absolute URLs are returned unchanged; protocol-relative and
/// origin-relative forms take the page's scheme and origin.
#[must_use]
pub fn resolve_image_url(src: &str, page_url: &str) -> String {
    let src = src.trim();
    if src.is_empty() {
        return String::new();
    }
    match Url::parse(page_url).and_then(|base| base.join(src)) {
        Ok(url) => url.into(),
        Err(e) => {
            tracing::debug!(
                page_url,
                src,
                error = %e,
                "could not resolve image URL; falling back to string joining"
            );
            join_by_hand(src, page_url)
        }
    }
}

fn join_by_hand(src: &str, page_url: &str) -> String {
    if src.contains("://") || src.starts_with("data:") {
        return src.to_string();
    }
    let (scheme, rest) = page_url.split_once("://").unwrap_or(("https", page_url));
    if let Some(host_relative) = src.strip_prefix("//") {
        return format!("{scheme}://{host_relative}");
    }
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let origin = format!("{scheme}://{host}");
    if src.starts_with('/') {
        format!("{origin}{src}")
    } else {
        format!("{origin}/{src}")
    }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
