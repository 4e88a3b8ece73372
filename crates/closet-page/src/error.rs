use closet_core::MessagingError;
use thiserror::Error;

use crate::markers::Role;

/// Failures while compiling the site-pattern registry.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid URL pattern for {site}/{variant}: {source}")]
    InvalidUrlPattern {
        site: String,
        variant: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid selector \"{selector}\" for {site}/{variant}: {reason}")]
    InvalidSelector {
        site: String,
        variant: String,
        selector: String,
        reason: String,
    },
    #[error("thumbnail template for {site}/{variant} does not start with an element")]
    InvalidTemplate { site: String, variant: String },
}

/// Failures surfaced to the user by the save and try-on flows.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("could not extract product details from the page")]
    Extraction,

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("{action} failed: {reason}")]
    Rejected { action: &'static str, reason: String },

    #[error("no reference photo upload is pending")]
    NoPendingUpload,
}

/// Failures while inserting nodes into the host page.
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("no insertion point for {role} on this page")]
    MissingAnchor { role: Role },

    #[error("rendered markup for {role} contained no element")]
    EmptyMarkup { role: Role },
}
