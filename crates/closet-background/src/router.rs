//! Action router for the privileged background context.
//!
//! Owns extension storage and the backend client. Every [`Request`] is
//! answered with a [`Response`]; handler errors become `success: false`
//! responses carrying the error text, and an exhausted try-on quota becomes
//! [`Response::limit_exceeded`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use closet_core::{ProductInfo, Request, Response, Session, TryonImage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::client::SupabaseClient;
use crate::error::{BackendError, BackgroundError, StorageError};
use crate::session::SessionStore;
use crate::storage::{read_json, write_json, Storage, StorageChange};

pub const SAVED_PRODUCTS_KEY: &str = "savedProducts";
pub const TRYON_IMAGES_KEY: &str = "tryonImages";
pub const USER_IMAGE_KEY: &str = "userImageId";

const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
}

/// Reference photo id cached for the user that uploaded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedUserImage {
    user_id: String,
    image_id: String,
}

type TryonImages = HashMap<String, TryonImage>;

pub struct Background<S> {
    storage: Arc<S>,
    sessions: SessionStore<S>,
    backend: Option<SupabaseClient>,
    signed_url_ttl_secs: u64,
}

impl<S: Storage> Background<S> {
    /// `backend` is `None` when no backend is configured; storage-only
    /// actions still work and backend actions answer with an error.
    #[must_use]
    pub fn new(storage: Arc<S>, backend: Option<SupabaseClient>) -> Self {
        Self {
            sessions: SessionStore::new(Arc::clone(&storage)),
            storage,
            backend,
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
        }
    }

    /// Lifetime of the signed URLs the try-on function returns. Cached
    /// results older than this are not handed out.
    #[must_use]
    pub fn with_signed_url_ttl(mut self, secs: u64) -> Self {
        self.signed_url_ttl_secs = secs;
        self
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// First-run initialisation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the product list cannot be written.
    pub async fn on_installed(&self, reason: InstallReason) -> Result<(), StorageError> {
        match reason {
            InstallReason::Install => {
                tracing::info!("closet installed");
                write_json(self.storage.as_ref(), SAVED_PRODUCTS_KEY, &Vec::<ProductInfo>::new())
                    .await
            }
            InstallReason::Update => {
                tracing::info!("closet updated");
                Ok(())
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        let action = request.action();
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(BackgroundError::Backend(BackendError::LimitExceeded)) => {
                tracing::info!(action, "try-on limit exceeded");
                Response::limit_exceeded()
            }
            Err(e) => {
                tracing::warn!(action, error = %e, "background action failed");
                Response::failure(e.to_string())
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Response, BackgroundError> {
        match request {
            Request::SaveProduct { product } => self.save_product(product).await,
            Request::GetProducts => Ok(Response {
                products: Some(self.saved_products().await?),
                ..Response::ok()
            }),
            Request::RemoveProduct { product } => self.remove_product(&product.url).await,
            Request::ClearAll => {
                self.store_products(&[]).await?;
                Ok(Response::ok_with_message("All products cleared successfully"))
            }
            Request::GetUser => Ok(Response {
                user: self.sessions.current(Utc::now()).await?.map(|s| s.user),
                ..Response::ok()
            }),
            Request::SignInAnonymously => self.sign_in_anonymously().await,
            Request::SignOut => self.sign_out().await,
            Request::GetUserImageId => {
                let session = self.require_session().await?;
                Ok(Response {
                    user_image_id: self.user_image_id(&session).await?,
                    ..Response::ok()
                })
            }
            Request::UploadImage { image, mime_type } => {
                self.upload_image(image, &mime_type).await
            }
            Request::ProcessTryon { product } => self.process_tryon(&product).await,
            Request::SaveTryonImage {
                tryon_image_url,
                product_url,
            } => {
                self.store_tryon_image(tryon_image_url, product_url).await?;
                Ok(Response::ok_with_message("Try-on image saved successfully"))
            }
            Request::GetTryonImage { product_url } => Ok(Response {
                tryon_image: self.cached_tryon_image(&product_url).await?,
                ..Response::ok()
            }),
        }
    }

    async fn saved_products(&self) -> Result<Vec<ProductInfo>, StorageError> {
        Ok(read_json(self.storage.as_ref(), SAVED_PRODUCTS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn store_products(&self, products: &[ProductInfo]) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), SAVED_PRODUCTS_KEY, products).await
    }

    async fn save_product(&self, product: ProductInfo) -> Result<Response, BackgroundError> {
        let mut products = self.saved_products().await?;
        if let Some(existing) = products.iter_mut().find(|p| p.url == product.url) {
            tracing::debug!(url = %product.url, "replacing saved product");
            *existing = product;
        } else {
            products.insert(0, product);
        }
        self.store_products(&products).await?;
        Ok(Response::ok_with_message("Product saved successfully"))
    }

    async fn remove_product(&self, url: &str) -> Result<Response, BackgroundError> {
        let mut products = self.saved_products().await?;
        products.retain(|p| p.url != url);
        self.store_products(&products).await?;
        Ok(Response::ok_with_message("Product removed successfully"))
    }

    fn backend(&self) -> Result<&SupabaseClient, BackgroundError> {
        self.backend
            .as_ref()
            .ok_or(BackgroundError::BackendNotConfigured)
    }

    async fn require_session(&self) -> Result<Session, BackgroundError> {
        self.sessions
            .current(Utc::now())
            .await?
            .ok_or(BackgroundError::NotSignedIn)
    }

    async fn sign_in_anonymously(&self) -> Result<Response, BackgroundError> {
        let session = self.backend()?.sign_in_anonymously().await?;
        self.sessions.save(&session).await?;
        Ok(Response {
            user: Some(session.user),
            ..Response::ok()
        })
    }

    async fn sign_out(&self) -> Result<Response, BackgroundError> {
        if let (Some(session), Some(backend)) = (
            self.sessions.current(Utc::now()).await?,
            self.backend.as_ref(),
        ) {
            if let Err(e) = backend.sign_out(&session).await {
                tracing::warn!(error = %e, "remote sign-out failed, clearing local session anyway");
            }
        }
        self.sessions.clear().await?;
        self.storage.remove(USER_IMAGE_KEY).await?;
        Ok(Response::ok_with_message("Signed out"))
    }

    /// The user's reference photo id: cached value first, then the newest
    /// `user_images` row.
    async fn user_image_id(&self, session: &Session) -> Result<Option<String>, BackgroundError> {
        let cached: Option<CachedUserImage> =
            read_json(self.storage.as_ref(), USER_IMAGE_KEY).await?;
        if let Some(cached) = cached.filter(|c| c.user_id == session.user.id) {
            return Ok(Some(cached.image_id));
        }
        let latest = self.backend()?.latest_user_image_id(session).await?;
        if let Some(image_id) = &latest {
            self.cache_user_image(session, image_id).await?;
        }
        Ok(latest)
    }

    async fn cache_user_image(&self, session: &Session, image_id: &str) -> Result<(), StorageError> {
        let cached = CachedUserImage {
            user_id: session.user.id.clone(),
            image_id: image_id.to_string(),
        };
        write_json(self.storage.as_ref(), USER_IMAGE_KEY, &cached).await
    }

    async fn upload_image(
        &self,
        image: Vec<u8>,
        mime_type: &str,
    ) -> Result<Response, BackgroundError> {
        if image.is_empty() {
            return Err(BackgroundError::EmptyImage);
        }
        let backend = self.backend()?;
        let session = self.require_session().await?;
        let object_path = backend.upload_image(&session, image, mime_type).await?;
        let image_id = backend.insert_user_image(&session, &object_path).await?;
        self.cache_user_image(&session, &image_id).await?;
        tracing::info!(user_id = %session.user.id, image_id = %image_id, "reference photo stored");
        Ok(Response {
            user_image_id: Some(image_id),
            ..Response::ok_with_message("Image uploaded successfully")
        })
    }

    async fn process_tryon(&self, product: &ProductInfo) -> Result<Response, BackgroundError> {
        let backend = self.backend()?;
        let session = self.require_session().await?;
        let image_id = self
            .user_image_id(&session)
            .await?
            .ok_or(BackgroundError::NoUserImage)?;
        let url = backend.invoke_tryon(&session, product, &image_id).await?;
        self.store_tryon_image(url.clone(), product.url.clone())
            .await?;
        Ok(Response {
            public_url: Some(url),
            ..Response::ok()
        })
    }

    async fn store_tryon_image(
        &self,
        url: String,
        product_url: String,
    ) -> Result<(), StorageError> {
        let mut images: TryonImages = read_json(self.storage.as_ref(), TRYON_IMAGES_KEY)
            .await?
            .unwrap_or_default();
        images.insert(
            product_url.clone(),
            TryonImage {
                url,
                product_url,
                timestamp: Utc::now(),
            },
        );
        write_json(self.storage.as_ref(), TRYON_IMAGES_KEY, &images).await
    }

    async fn cached_tryon_image(
        &self,
        product_url: &str,
    ) -> Result<Option<TryonImage>, StorageError> {
        let images: Option<TryonImages> = read_json(self.storage.as_ref(), TRYON_IMAGES_KEY).await?;
        let image = images.and_then(|mut images| images.remove(product_url));
        Ok(image.filter(|image| {
            let fresh = !image.is_expired(Utc::now(), self.signed_url_ttl_secs);
            if !fresh {
                tracing::debug!(product_url, "cached try-on URL has expired");
            }
            fresh
        }))
    }
}

/// Logs storage changes until the store goes away.
pub async fn log_storage_changes(mut changes: broadcast::Receiver<StorageChange>) {
    loop {
        match changes.recv().await {
            Ok(change) if change.key == SAVED_PRODUCTS_KEY => {
                let count = change
                    .new_value
                    .as_ref()
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                tracing::info!(count, "saved products updated");
            }
            Ok(change) => tracing::debug!(key = %change.key, "storage updated"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "storage change log fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
