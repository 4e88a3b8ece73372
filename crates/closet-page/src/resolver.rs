//! Site resolution: hostname and URL to the applicable site pattern.

use crate::location::PageLocation;
use crate::registry::{PatternRegistry, SitePattern};

/// The site pattern that applies to a page.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub site_id: &'a str,
    pub variant: &'a str,
    pub pattern: &'a SitePattern,
}

impl PatternRegistry {
    /// Resolves the pattern for `hostname` and `url`.
    ///
    /// The first site whose host fragment occurs in the hostname wins, else
    /// the fallback site. The variant named after the hostname's last label
    /// is tried first; when it is missing or its URL matcher rejects `url`,
    /// the site's default variant is tried. Returns `None` when no variant
    /// accepts the URL.
    #[must_use]
    pub fn resolve(&self, hostname: &str, url: &str) -> Option<Resolution<'_>> {
        let hostname = hostname.to_ascii_lowercase();
        let site = self
            .sites
            .iter()
            .find(|site| {
                site.hosts
                    .iter()
                    .any(|host| !host.is_empty() && hostname.contains(host.as_str()))
            })
            .or_else(|| self.fallback.and_then(|index| self.sites.get(index)))?;

        let region = hostname
            .rsplit_once('.')
            .map(|(_, tld)| tld)
            .filter(|tld| !tld.is_empty());

        if let Some(region) = region.filter(|r| *r != site.default_variant) {
            if let Some((name, pattern)) = site.variants.iter().find(|(name, _)| name == region) {
                if pattern.url_matcher.is_match(url) {
                    return Some(Resolution {
                        site_id: &site.id,
                        variant: name,
                        pattern,
                    });
                }
                tracing::debug!(
                    site = %site.id,
                    variant = region,
                    "region variant rejected URL; trying default variant"
                );
            }
        }

        let pattern = site.variant(&site.default_variant)?;
        if !pattern.url_matcher.is_match(url) {
            tracing::debug!(site = %site.id, url, "URL is not a product page for this site");
            return None;
        }
        Some(Resolution {
            site_id: &site.id,
            variant: &site.default_variant,
            pattern,
        })
    }

    /// Resolves the pattern for a page location.
    #[must_use]
    pub fn resolve_location(&self, location: &PageLocation) -> Option<Resolution<'_>> {
        self.resolve(&location.hostname, &location.href)
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
