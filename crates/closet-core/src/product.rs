use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title recorded when the page has no title element.
pub const UNKNOWN_TITLE: &str = "Unknown Product";
/// Price recorded when no `$`-amount can be found.
pub const UNKNOWN_PRICE: &str = "N/A";

/// Snapshot of a product page at extraction time.
///
/// Saved products are deduplicated by [`ProductInfo::url`]: saving the same
/// page again replaces the earlier entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Trimmed title text, or [`UNKNOWN_TITLE`].
    pub title: String,
    /// Absolute main-image URL; empty when the page had none.
    pub image: String,
    /// First `$`-amount found in the price element, e.g. `"$29.99"`, or [`UNKNOWN_PRICE`].
    pub price: String,
    /// Full URL of the page the product was extracted from.
    pub url: String,
    /// Site identifier from the pattern table, e.g. `"amazon"`.
    pub site: String,
    pub timestamp: DateTime<Utc>,
}

/// Cached try-on result for one product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryonImage {
    /// Signed, time-limited URL of the generated image.
    pub url: String,
    pub product_url: String,
    pub timestamp: DateTime<Utc>,
}

impl TryonImage {
    /// Returns `true` once the signed URL is older than `ttl_secs`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_secs: u64) -> bool {
        let ttl = chrono::Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX));
        now.signed_duration_since(self.timestamp) >= ttl
    }
}
