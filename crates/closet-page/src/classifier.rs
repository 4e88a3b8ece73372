//! Product-page and apparel classification.
//!
//! Both checks are evaluated against the current document on every call;
//! nothing is cached between calls.

use closet_core::apparel::find_apparel_keyword;
use closet_core::ApparelMatch;

use crate::document::HostDocument;
use crate::page::Page;
use crate::registry::{PatternRegistry, SitePattern};

/// A page is a product page when a pattern resolves for it, its title
/// element exists, and either its main image or its thumbnail list exists.
#[must_use]
pub fn is_product_page(registry: &PatternRegistry, page: &Page) -> bool {
    registry
        .resolve_location(&page.location)
        .is_some_and(|resolution| has_product_markup(resolution.pattern, &page.document))
}

/// A product page whose title contains an apparel keyword.
#[must_use]
pub fn is_apparel_page(registry: &PatternRegistry, page: &Page, mode: ApparelMatch) -> bool {
    let Some(resolution) = registry.resolve_location(&page.location) else {
        return false;
    };
    if !has_product_markup(resolution.pattern, &page.document) {
        return false;
    }
    let title = title_text(resolution.pattern, &page.document).unwrap_or_default();
    match find_apparel_keyword(&title, mode) {
        Some(keyword) => {
            tracing::debug!(site = resolution.site_id, keyword, "apparel keyword found in title");
            true
        }
        None => {
            tracing::debug!(site = resolution.site_id, "no apparel keyword in title");
            false
        }
    }
}

pub(crate) fn has_product_markup(pattern: &SitePattern, document: &HostDocument) -> bool {
    let selectors = &pattern.selectors;
    let has_title = document.exists(&selectors.title);
    let has_image = document.exists(&selectors.image)
        || selectors
            .thumbnail_list
            .as_ref()
            .is_some_and(|list| document.exists(list));
    has_title && has_image
}

/// Trimmed text of the title element, `None` when absent or blank.
pub(crate) fn title_text(pattern: &SitePattern, document: &HostDocument) -> Option<String> {
    document
        .select_first(&pattern.selectors.title)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;
