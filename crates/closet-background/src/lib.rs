//! Privileged background context: extension storage, the backend client,
//! and the action router that answers content-script requests.

pub mod channel;
pub mod client;
pub mod error;
pub mod router;
pub mod session;
pub mod storage;

pub use channel::{channel, serve, ChannelMessenger, Envelope};
pub use client::SupabaseClient;
pub use error::{BackendError, BackgroundError, StorageError};
pub use router::{
    log_storage_changes, Background, InstallReason, SAVED_PRODUCTS_KEY, TRYON_IMAGES_KEY,
    USER_IMAGE_KEY,
};
pub use session::{SessionStore, SESSION_KEY};
pub use storage::{read_json, write_json, LocalStore, Storage, StorageChange};
