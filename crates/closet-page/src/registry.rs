//! Compiled site-pattern registry.
//!
//! [`SitesFile`] holds selectors and URL patterns as text; the registry
//! compiles them once so resolution and classification never re-parse.

use closet_core::sites::starts_with_element;
use closet_core::{SelectorConfig, SitesFile, VariantConfig};
use regex::Regex;
use scraper::Selector;

use crate::error::PageError;

/// Compiled selectors for one site variant.
#[derive(Debug)]
pub struct SiteSelectors {
    pub title: Selector,
    pub image: Selector,
    pub price: Selector,
    pub insert_target: Selector,
    pub thumbnail_list: Option<Selector>,
    pub thumbnail_item: Option<Selector>,
    pub gallery: Vec<Selector>,
}

/// A compiled site variant.
#[derive(Debug)]
pub struct SitePattern {
    pub url_matcher: Regex,
    pub selectors: SiteSelectors,
    pub inject_template: Option<String>,
    pub mouse_over_transition: bool,
}

#[derive(Debug)]
pub(crate) struct CompiledSite {
    pub(crate) id: String,
    pub(crate) hosts: Vec<String>,
    pub(crate) default_variant: String,
    pub(crate) variants: Vec<(String, SitePattern)>,
}

impl CompiledSite {
    pub(crate) fn variant(&self, name: &str) -> Option<&SitePattern> {
        self.variants
            .iter()
            .find(|(variant, _)| variant == name)
            .map(|(_, pattern)| pattern)
    }
}

/// Read-only table of supported sites, compiled from a [`SitesFile`].
#[derive(Debug)]
pub struct PatternRegistry {
    pub(crate) sites: Vec<CompiledSite>,
    pub(crate) fallback: Option<usize>,
}

impl PatternRegistry {
    /// Compiles every URL pattern and selector in `sites_file`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] for the first URL pattern or selector that
    /// fails to compile, or a thumbnail template without a root element.
    pub fn compile(sites_file: &SitesFile) -> Result<Self, PageError> {
        let mut sites = Vec::with_capacity(sites_file.sites.len());
        for site in &sites_file.sites {
            let variants = site
                .variants
                .iter()
                .map(|(name, variant)| {
                    compile_variant(&site.id, name, variant).map(|p| (name.clone(), p))
                })
                .collect::<Result<Vec<_>, _>>()?;
            sites.push(CompiledSite {
                id: site.id.clone(),
                hosts: site.hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
                default_variant: site.default_variant.clone(),
                variants,
            });
        }

        let fallback = sites_file
            .fallback_site
            .as_deref()
            .and_then(|id| sites.iter().position(|s| s.id == id));

        tracing::debug!(sites = sites.len(), "compiled site pattern registry");
        Ok(Self { sites, fallback })
    }

    /// Ids of the registered sites in match order.
    pub fn site_ids(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(|s| s.id.as_str())
    }
}

fn compile_variant(
    site: &str,
    variant: &str,
    config: &VariantConfig,
) -> Result<SitePattern, PageError> {
    let url_matcher =
        Regex::new(&config.url_pattern).map_err(|source| PageError::InvalidUrlPattern {
            site: site.to_string(),
            variant: variant.to_string(),
            source,
        })?;
    if let Some(template) = &config.inject_template {
        if !starts_with_element(template) {
            return Err(PageError::InvalidTemplate {
                site: site.to_string(),
                variant: variant.to_string(),
            });
        }
    }
    Ok(SitePattern {
        url_matcher,
        selectors: compile_selectors(site, variant, &config.selectors)?,
        inject_template: config.inject_template.clone(),
        mouse_over_transition: config.mouse_over_transition,
    })
}

fn compile_selectors(
    site: &str,
    variant: &str,
    config: &SelectorConfig,
) -> Result<SiteSelectors, PageError> {
    let parse = |css: &str| {
        Selector::parse(css).map_err(|e| PageError::InvalidSelector {
            site: site.to_string(),
            variant: variant.to_string(),
            selector: css.to_string(),
            reason: e.to_string(),
        })
    };
    Ok(SiteSelectors {
        title: parse(&config.title)?,
        image: parse(&config.image)?,
        price: parse(&config.price)?,
        insert_target: parse(&config.insert_target)?,
        thumbnail_list: config.thumbnail_list.as_deref().map(parse).transpose()?,
        thumbnail_item: config.thumbnail_item.as_deref().map(parse).transpose()?,
        gallery: config
            .gallery
            .iter()
            .map(|css| parse(css))
            .collect::<Result<_, _>>()?,
    })
}
