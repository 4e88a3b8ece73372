//! Shared domain types, configuration, and the message protocol spoken
//! between the page-side content script and the background context.

pub mod apparel;
pub mod app_config;
pub mod auth;
pub mod config;
pub mod messages;
pub mod messaging;
pub mod product;
pub mod sites;

use thiserror::Error;

pub use app_config::{AppConfig, ApparelMatch, BackendConfig, Environment};
pub use auth::{Session, User};
pub use config::{load_app_config, load_app_config_from_env};
pub use messages::{Request, Response};
pub use messaging::{Messenger, MessagingError};
pub use product::{ProductInfo, TryonImage, UNKNOWN_PRICE, UNKNOWN_TITLE};
pub use sites::{
    default_sites, load_sites, SelectorConfig, SiteConfig, SitesFile, VariantConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sites file {path}: {source}")]
    SitesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sites file: {0}")]
    SitesFileParse(#[from] serde_yaml::Error),

    #[error("sites validation failed: {0}")]
    Validation(String),
}
