use thiserror::Error;

/// Errors from the persistent key/value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage file {path} could not be accessed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is not a JSON object: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value under '{key}' has an unexpected shape: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by the backend REST client.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid backend URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend rejected credentials for {url} (HTTP {status})")]
    Unauthorized { status: u16, url: String },

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    /// The try-on function refused the request because the quota is spent.
    #[error("try-on limit exceeded")]
    LimitExceeded,

    #[error("{context} response is missing '{field}'")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },
}

/// Errors surfaced by the background action handlers. Each becomes a
/// `success: false` response carrying the error text.
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("backend is not configured (set SUPABASE_URL and SUPABASE_ANON_KEY)")]
    BackendNotConfigured,

    #[error("not signed in")]
    NotSignedIn,

    #[error("no reference photo has been uploaded")]
    NoUserImage,

    #[error("uploaded image is empty")]
    EmptyImage,
}
