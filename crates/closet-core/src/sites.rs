//! Site pattern table: which storefronts are supported and how their
//! product pages are read and decorated.
//!
//! The table is data, not code. The default lives in `config/sites.yaml`
//! and is embedded at compile time; `CLOSET_SITES_PATH` points at a
//! replacement file.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DEFAULT_SITES_YAML: &str = include_str!("../config/sites.yaml");

/// Placeholder every injection template must contain.
pub const IMAGE_URL_TOKEN: &str = "{{imageUrl}}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesFile {
    /// Site used when no host matches. `None` leaves unknown sites non-actionable.
    #[serde(default)]
    pub fallback_site: Option<String>,
    /// Sites in match order: the first site whose host fragment appears in
    /// the page hostname wins.
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub id: String,
    /// Hostname fragments, e.g. `"amazon"` matches `www.amazon.co.uk`.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Variant used when the hostname's TLD has no variant of its own or
    /// that variant rejects the URL.
    #[serde(default = "default_variant_name")]
    pub default_variant: String,
    /// Region variants keyed by TLD (`"com"`, `"ca"`, ...).
    pub variants: BTreeMap<String, VariantConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Regular expression tested against the full page URL.
    pub url_pattern: String,
    pub selectors: SelectorConfig,
    /// HTML for an injected gallery thumbnail. Tokens: `{{imageUrl}}`,
    /// `{{uid}}`, `{{posinset}}`, `{{setsize}}`, `{{timestamp}}`, `{{index}}`.
    #[serde(default)]
    pub inject_template: Option<String>,
    /// Hovering the injected thumbnail previews it in the main image slot.
    #[serde(default)]
    pub mouse_over_transition: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub title: String,
    pub image: String,
    pub price: String,
    /// Anchor the button container is inserted after.
    pub insert_target: String,
    #[serde(default)]
    pub thumbnail_list: Option<String>,
    #[serde(default)]
    pub thumbnail_item: Option<String>,
    /// Gallery containers probed in order when `thumbnail_list` is absent
    /// from the page.
    #[serde(default)]
    pub gallery: Vec<String>,
}

fn default_variant_name() -> String {
    "com".to_string()
}

/// Parse and validate the embedded default site table.
///
/// # Errors
///
/// Returns `ConfigError` if the embedded file fails to parse or validate.
pub fn default_sites() -> Result<SitesFile, ConfigError> {
    parse_sites(DEFAULT_SITES_YAML)
}

/// Load and validate a site table from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sites(path: &Path) -> Result<SitesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SitesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sites(&content)
}

/// Parse and validate a site table from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text fails to parse or validate.
pub fn parse_sites(content: &str) -> Result<SitesFile, ConfigError> {
    let sites_file: SitesFile = serde_yaml::from_str(content)?;
    validate_sites(&sites_file)?;
    Ok(sites_file)
}

fn validate_sites(sites_file: &SitesFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for site in &sites_file.sites {
        if site.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site id must be non-empty".to_string(),
            ));
        }

        if !seen_ids.insert(site.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site id: '{}'",
                site.id
            )));
        }

        let is_fallback = sites_file.fallback_site.as_deref() == Some(site.id.as_str());
        if site.hosts.iter().all(|h| h.trim().is_empty()) && !is_fallback {
            return Err(ConfigError::Validation(format!(
                "site '{}' has no hosts and is not the fallback site",
                site.id
            )));
        }

        if !site.variants.contains_key(&site.default_variant) {
            return Err(ConfigError::Validation(format!(
                "site '{}' has no variant for its default '{}'",
                site.id, site.default_variant
            )));
        }

        for (region, variant) in &site.variants {
            if let Some(template) = &variant.inject_template {
                if !template.contains(IMAGE_URL_TOKEN) {
                    return Err(ConfigError::Validation(format!(
                        "site '{}' variant '{region}': inject_template lacks {IMAGE_URL_TOKEN}",
                        site.id
                    )));
                }
                if !starts_with_element(template) {
                    return Err(ConfigError::Validation(format!(
                        "site '{}' variant '{region}': inject_template must start with an element tag",
                        site.id
                    )));
                }
            }
        }
    }

    if let Some(fallback) = &sites_file.fallback_site {
        if !seen_ids.contains(fallback.as_str()) {
            return Err(ConfigError::Validation(format!(
                "fallback_site '{fallback}' is not defined"
            )));
        }
    }

    Ok(())
}

/// Whether `template`'s first non-whitespace token is an element start tag.
/// The injected thumbnail is marked through that root element.
#[must_use]
pub fn starts_with_element(template: &str) -> bool {
    template
        .trim_start()
        .strip_prefix('<')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
#[path = "sites_test.rs"]
mod tests;
