//! Page-side engine of the closet extension: site resolution, product-page
//! classification, extraction, idempotent injection, and the content script
//! that drives the save and try-on flows.

pub mod classifier;
pub mod document;
pub mod error;
pub mod extractor;
#[cfg(test)]
mod fixtures;
pub mod injector;
pub mod location;
pub mod markers;
pub mod observer;
pub mod orchestrator;
pub mod page;
pub mod registry;
pub mod resolver;
pub mod template;

pub use classifier::{is_apparel_page, is_product_page};
pub use document::{HostDocument, MutationKind, MutationRecord};
pub use error::{FlowError, InjectError, PageError};
pub use extractor::{extract_price, extract_product_info, resolve_image_url};
pub use injector::Injector;
pub use location::PageLocation;
pub use markers::Role;
pub use observer::{MutationObserver, ObserveScope};
pub use orchestrator::{
    ContentScript, InitOutcome, ReferencePhoto, SaveOutcome, ScriptSettings, TryonOutcome,
    TryonState,
};
pub use page::Page;
pub use registry::{PatternRegistry, SitePattern, SiteSelectors};
pub use resolver::Resolution;
pub use template::{ControlKind, Feedback};
