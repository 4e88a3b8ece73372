use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How apparel keywords are matched against a product title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApparelMatch {
    /// Plain case-insensitive substring search. Matches `"tee"` inside
    /// `"Steel"` and `"tie"` inside `"Tie-dye Mug"`.
    Substring,
    /// The keyword must be bounded by non-alphanumeric characters on both sides.
    #[default]
    Word,
}

/// Connection settings for the remote backend (auth, object storage, rows,
/// and the try-on function).
#[derive(Clone)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub tryon_function: String,
    pub image_bucket: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"[redacted]")
            .field("tryon_function", &self.tryon_function)
            .field("image_bucket", &self.image_bucket)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Site pattern file; `None` means the embedded default table.
    pub sites_path: Option<PathBuf>,
    pub storage_path: PathBuf,
    /// `None` when `SUPABASE_URL` / `SUPABASE_ANON_KEY` are not set. Offline
    /// commands still work; backend actions fail with a response error.
    pub backend: Option<BackendConfig>,
    pub feedback_reset_ms: u64,
    pub toast_ms: u64,
    pub apparel_match: ApparelMatch,
    pub signed_url_ttl_secs: u64,
}
