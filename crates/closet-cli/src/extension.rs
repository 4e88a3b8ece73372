//! Wires configuration, storage, the background router and the content
//! script together for one CLI invocation.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use closet_background::{
    channel, log_storage_changes, serve, Background, ChannelMessenger, InstallReason, LocalStore,
    Storage, SupabaseClient, SAVED_PRODUCTS_KEY,
};
use closet_core::{default_sites, load_sites, AppConfig};
use closet_page::{ContentScript, Page, PatternRegistry, ScriptSettings};

const REQUEST_QUEUE: usize = 16;

pub(crate) struct Extension {
    config: AppConfig,
    registry: Arc<PatternRegistry>,
    background: Arc<Background<LocalStore>>,
}

impl Extension {
    pub(crate) async fn start(config: AppConfig) -> anyhow::Result<Self> {
        let sites = match &config.sites_path {
            Some(path) => load_sites(path)?,
            None => default_sites()?,
        };
        let registry = Arc::new(PatternRegistry::compile(&sites)?);
        tracing::debug!(sites = sites.sites.len(), "site patterns compiled");

        let store = Arc::new(LocalStore::open(&config.storage_path).await?);
        let first_run = store.get(SAVED_PRODUCTS_KEY).await?.is_none();
        tokio::spawn(log_storage_changes(store.subscribe()));

        let backend = config
            .backend
            .as_ref()
            .map(SupabaseClient::new)
            .transpose()?;
        if backend.is_none() {
            tracing::info!("no backend configured; sign-in and try-on are unavailable");
        }

        let background =
            Background::new(store, backend).with_signed_url_ttl(config.signed_url_ttl_secs);
        let reason = if first_run {
            InstallReason::Install
        } else {
            InstallReason::Update
        };
        background.on_installed(reason).await?;

        Ok(Self {
            config,
            registry,
            background: Arc::new(background),
        })
    }

    pub(crate) fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub(crate) fn background(&self) -> &Background<LocalStore> {
        &self.background
    }

    /// Loads a saved page and connects a content script for it to the
    /// background.
    pub(crate) async fn open_page(
        &self,
        url: &str,
        html_path: &Path,
    ) -> anyhow::Result<ContentScript<ChannelMessenger>> {
        let html = tokio::fs::read_to_string(html_path)
            .await
            .with_context(|| format!("failed to read {}", html_path.display()))?;
        let (messenger, requests) = channel(REQUEST_QUEUE);
        tokio::spawn(serve(Arc::clone(&self.background), requests));
        Ok(ContentScript::new(
            Arc::clone(&self.registry),
            messenger,
            Page::new(url, &html),
            ScriptSettings::from_config(&self.config),
        ))
    }
}
