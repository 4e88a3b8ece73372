use crate::document::HostDocument;
use crate::location::PageLocation;

/// A host page: where it lives and what it currently contains.
pub struct Page {
    pub location: PageLocation,
    pub document: HostDocument,
}

impl Page {
    #[must_use]
    pub fn new(href: &str, html: &str) -> Self {
        Self {
            location: PageLocation::parse(href),
            document: HostDocument::parse(html),
        }
    }
}
