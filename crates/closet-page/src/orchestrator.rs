//! The content script: decorates a product page and drives the save and
//! try-on flows against the background context.
//!
//! Everything here runs on one thread. The only suspension points are
//! message round-trips and the feedback timers in [`ContentScript::settle`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use closet_core::{AppConfig, ApparelMatch, Messenger, ProductInfo, Request, Response, User};
use tokio::time::Instant;

use crate::classifier;
use crate::document::HostDocument;
use crate::error::FlowError;
use crate::extractor;
use crate::injector::Injector;
use crate::markers::Role;
use crate::observer::MutationObserver;
use crate::page::Page;
use crate::registry::PatternRegistry;
use crate::template::{ControlKind, Feedback};

pub const LIMIT_EXCEEDED_MESSAGE: &str =
    "You've reached your try-on limit for now. Please try again later.";

/// Page-side tunables.
#[derive(Debug, Clone)]
pub struct ScriptSettings {
    pub apparel_match: ApparelMatch,
    /// How long success/error feedback stays on a button.
    pub feedback_reset: Duration,
    pub toast_duration: Duration,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            apparel_match: ApparelMatch::default(),
            feedback_reset: Duration::from_millis(2000),
            toast_duration: Duration::from_millis(4000),
        }
    }
}

impl ScriptSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            apparel_match: config.apparel_match,
            feedback_reset: Duration::from_millis(config.feedback_reset_ms),
            toast_duration: Duration::from_millis(config.toast_ms),
        }
    }
}

/// Try-on flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TryonState {
    #[default]
    Idle,
    CheckingReferenceImage,
    AwaitingUpload,
    Requesting,
    Injecting,
    ShowingError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    NotProductPage,
    Decorated { apparel: bool, restored_tryon: bool },
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved(ProductInfo),
    /// The save button is still showing feedback from an earlier click.
    Busy,
    Failed(FlowError),
}

#[derive(Debug)]
pub enum TryonOutcome {
    /// The page is not an apparel page, so try-on is not offered.
    Unavailable,
    Busy,
    AwaitingUpload,
    Injected { image_url: String },
    LimitExceeded,
    Failed(FlowError),
}

/// A reference photo chosen in the upload popup.
#[derive(Debug, Clone)]
pub struct ReferencePhoto {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

enum TryonReply {
    Image(String),
    LimitExceeded,
}

#[derive(Debug, Default)]
struct Deadlines {
    save: Option<Instant>,
    tryon: Option<Instant>,
    toast: Option<Instant>,
}

pub struct ContentScript<M> {
    registry: Arc<PatternRegistry>,
    messenger: M,
    page: Page,
    settings: ScriptSettings,
    injector: Injector,
    observer: Option<MutationObserver>,
    tryon_state: TryonState,
    deadlines: Deadlines,
    user: Option<User>,
}

impl<M: Messenger> ContentScript<M> {
    pub fn new(
        registry: Arc<PatternRegistry>,
        messenger: M,
        page: Page,
        settings: ScriptSettings,
    ) -> Self {
        Self {
            registry,
            messenger,
            page,
            settings,
            injector: Injector::new(),
            observer: None,
            tryon_state: TryonState::Idle,
            deadlines: Deadlines::default(),
            user: None,
        }
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Direct access for host-page edits (re-renders, navigation of the
    /// gallery). Changes are picked up by [`Self::handle_mutations`].
    pub fn document_mut(&mut self) -> &mut HostDocument {
        &mut self.page.document
    }

    #[must_use]
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    #[must_use]
    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    #[must_use]
    pub fn tryon_state(&self) -> TryonState {
        self.tryon_state
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Ensures an identity, decorates the page when it is a product page,
    /// restores a cached try-on result, and starts observing mutations.
    pub async fn init(&mut self) -> InitOutcome {
        self.ensure_identity().await;

        let registry = Arc::clone(&self.registry);
        let Some(resolution) = registry.resolve_location(&self.page.location) else {
            tracing::info!(url = %self.page.location.href, "no site pattern for page");
            return InitOutcome::NotProductPage;
        };
        if !classifier::is_product_page(&registry, &self.page) {
            tracing::info!(site = resolution.site_id, "page is not a product page");
            return InitOutcome::NotProductPage;
        }

        let apparel =
            classifier::is_apparel_page(&registry, &self.page, self.settings.apparel_match);
        self.injector.activate(apparel);
        self.injector
            .reconcile(&mut self.page.document, resolution.pattern, Utc::now());
        tracing::info!(site = resolution.site_id, apparel, "decorated product page");

        let restored_tryon = self.restore_tryon(&registry).await;

        self.observer = Some(MutationObserver::body());
        self.page.document.take_records();
        InitOutcome::Decorated {
            apparel,
            restored_tryon,
        }
    }

    /// Stops reacting to mutations.
    pub fn disconnect(&mut self) {
        self.observer = None;
    }

    async fn ensure_identity(&mut self) {
        match self.messenger.send(Request::GetUser).await {
            Ok(Response {
                user: Some(user), ..
            }) => {
                tracing::debug!(user_id = %user.id, "existing session");
                self.user = Some(user);
                return;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "could not look up current user"),
        }

        match self.messenger.send(Request::SignInAnonymously).await {
            Ok(response) if response.success => {
                tracing::info!("signed in anonymously");
                self.user = response.user;
            }
            Ok(response) => tracing::warn!(
                error = response.error.as_deref().unwrap_or("unknown error"),
                "anonymous sign-in failed"
            ),
            Err(e) => tracing::warn!(error = %e, "anonymous sign-in failed"),
        }
    }

    async fn restore_tryon(&mut self, registry: &PatternRegistry) -> bool {
        let request = Request::GetTryonImage {
            product_url: self.page.location.href.clone(),
        };
        let image = match self.messenger.send(request).await {
            Ok(response) => response.tryon_image,
            Err(e) => {
                tracing::warn!(error = %e, "could not look up cached try-on result");
                return false;
            }
        };
        let (Some(image), Some(resolution)) = (image, registry.resolve_location(&self.page.location))
        else {
            return false;
        };
        match self.injector.place_tryon_result(
            &mut self.page.document,
            resolution.pattern,
            &image.url,
            Utc::now(),
        ) {
            Ok(_) => {
                tracing::info!("restored cached try-on result");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not place cached try-on result");
                false
            }
        }
    }

    /// Save button click.
    pub async fn click_save(&mut self) -> SaveOutcome {
        if self.injector.feedback(ControlKind::Save) != Feedback::Idle {
            tracing::debug!("save already in progress");
            return SaveOutcome::Busy;
        }
        self.set_feedback(ControlKind::Save, Feedback::Pending);

        match self.save_current_product().await {
            Ok(product) => {
                tracing::info!(title = %product.title, url = %product.url, "product saved");
                self.set_feedback(ControlKind::Save, Feedback::Success);
                SaveOutcome::Saved(product)
            }
            Err(e) => {
                tracing::warn!(error = %e, "save failed");
                self.set_feedback(ControlKind::Save, Feedback::Error);
                SaveOutcome::Failed(e)
            }
        }
    }

    async fn save_current_product(&self) -> Result<ProductInfo, FlowError> {
        let product = self.extract()?;
        let response = self
            .messenger
            .send(Request::SaveProduct {
                product: product.clone(),
            })
            .await?;
        ensure_success("saveProduct", &response)?;
        Ok(product)
    }

    /// Try-on button click.
    pub async fn click_tryon(&mut self) -> TryonOutcome {
        if !self.injector.tryon_enabled() {
            return TryonOutcome::Unavailable;
        }
        if self.tryon_state != TryonState::Idle
            || self.injector.feedback(ControlKind::Tryon) != Feedback::Idle
        {
            tracing::debug!(state = ?self.tryon_state, "try-on already in progress");
            return TryonOutcome::Busy;
        }

        self.tryon_state = TryonState::CheckingReferenceImage;
        let has_reference = match self.messenger.send(Request::GetUserImageId).await {
            Ok(response) => response.success && response.user_image_id.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "could not check for a reference photo");
                false
            }
        };

        if has_reference {
            self.request_tryon().await
        } else {
            tracing::info!("no reference photo on file; awaiting upload");
            self.tryon_state = TryonState::AwaitingUpload;
            self.injector.open_upload_popup(&mut self.page.document);
            TryonOutcome::AwaitingUpload
        }
    }

    /// Upload popup confirmed with a photo. A failed upload keeps the popup
    /// open so the user can pick again or cancel.
    pub async fn confirm_upload(&mut self, photo: ReferencePhoto) -> TryonOutcome {
        if self.tryon_state != TryonState::AwaitingUpload {
            return TryonOutcome::Failed(FlowError::NoPendingUpload);
        }
        let request = Request::UploadImage {
            image: photo.bytes,
            mime_type: photo.mime_type,
        };
        let uploaded = match self.messenger.send(request).await {
            Ok(response) => ensure_success("uploadImage", &response),
            Err(e) => Err(e.into()),
        };
        match uploaded {
            Ok(()) => {
                tracing::info!("reference photo uploaded");
                self.injector.close_upload_popup(&mut self.page.document);
                self.request_tryon().await
            }
            Err(e) => {
                tracing::warn!(error = %e, "reference photo upload failed");
                TryonOutcome::Failed(e)
            }
        }
    }

    /// Upload popup dismissed.
    pub fn cancel_upload(&mut self) {
        if self.tryon_state == TryonState::AwaitingUpload {
            self.injector.close_upload_popup(&mut self.page.document);
            self.tryon_state = TryonState::Idle;
            tracing::debug!("upload cancelled");
        }
    }

    async fn request_tryon(&mut self) -> TryonOutcome {
        self.tryon_state = TryonState::Requesting;
        self.set_feedback(ControlKind::Tryon, Feedback::Pending);

        match self.fetch_tryon().await {
            Ok(TryonReply::Image(image_url)) => {
                self.tryon_state = TryonState::Injecting;
                let registry = Arc::clone(&self.registry);
                if let Some(resolution) = registry.resolve_location(&self.page.location) {
                    if let Err(e) = self.injector.place_tryon_result(
                        &mut self.page.document,
                        resolution.pattern,
                        &image_url,
                        Utc::now(),
                    ) {
                        tracing::warn!(error = %e, "try-on result kept but not placed");
                    }
                }
                tracing::info!(image_url = %image_url, "try-on complete");
                self.set_feedback(ControlKind::Tryon, Feedback::Success);
                self.tryon_state = TryonState::Idle;
                TryonOutcome::Injected { image_url }
            }
            Ok(TryonReply::LimitExceeded) => {
                tracing::info!("try-on limit exceeded");
                self.show_toast(LIMIT_EXCEEDED_MESSAGE);
                self.set_feedback(ControlKind::Tryon, Feedback::Idle);
                self.tryon_state = TryonState::Idle;
                TryonOutcome::LimitExceeded
            }
            Err(e) => {
                tracing::warn!(error = %e, "try-on failed");
                self.tryon_state = TryonState::ShowingError;
                self.set_feedback(ControlKind::Tryon, Feedback::Error);
                TryonOutcome::Failed(e)
            }
        }
    }

    async fn fetch_tryon(&self) -> Result<TryonReply, FlowError> {
        let product = self.extract()?;
        let response = self.messenger.send(Request::ProcessTryon { product }).await?;
        if response.limit_exceeded {
            return Ok(TryonReply::LimitExceeded);
        }
        ensure_success("processTryon", &response)?;
        response
            .public_url
            .map(TryonReply::Image)
            .ok_or_else(|| FlowError::Rejected {
                action: "processTryon",
                reason: "response carried no image URL".to_string(),
            })
    }

    /// Pointer entering or leaving the injected thumbnail.
    pub fn hover_tryon_thumbnail(&mut self, entering: bool) -> bool {
        let registry = Arc::clone(&self.registry);
        let Some(resolution) = registry.resolve_location(&self.page.location) else {
            return false;
        };
        self.injector
            .preview_tryon(&mut self.page.document, resolution.pattern, entering)
    }

    /// Click on the injected thumbnail.
    pub fn click_tryon_thumbnail(&mut self) -> bool {
        let registry = Arc::clone(&self.registry);
        let Some(resolution) = registry.resolve_location(&self.page.location) else {
            return false;
        };
        self.injector
            .select_tryon(&mut self.page.document, resolution.pattern)
    }

    /// Drains queued mutation records and, when any fall inside the observed
    /// scope, restores injected nodes the host removed. Returns the roles
    /// that had to be restored.
    pub fn handle_mutations(&mut self) -> Vec<Role> {
        let records = self.page.document.take_records();
        let Some(observer) = &self.observer else {
            return Vec::new();
        };
        if !observer.is_relevant(&self.page.document, &records) {
            return Vec::new();
        }

        let registry = Arc::clone(&self.registry);
        let Some(resolution) = registry.resolve_location(&self.page.location) else {
            return Vec::new();
        };
        let restored =
            self.injector
                .reconcile(&mut self.page.document, resolution.pattern, Utc::now());
        if !restored.is_empty() {
            tracing::info!(?restored, "restored injected nodes after host re-render");
        }
        self.page.document.take_records();
        restored
    }

    /// Applies every feedback reset and toast expiry due at `now`. Returns
    /// whether anything changed.
    pub fn expire_feedback(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if self.deadlines.save.is_some_and(|due| due <= now) {
            self.deadlines.save = None;
            self.injector
                .set_feedback(&mut self.page.document, ControlKind::Save, Feedback::Idle);
            changed = true;
        }
        if self.deadlines.tryon.is_some_and(|due| due <= now) {
            self.deadlines.tryon = None;
            self.injector
                .set_feedback(&mut self.page.document, ControlKind::Tryon, Feedback::Idle);
            if self.tryon_state == TryonState::ShowingError {
                self.tryon_state = TryonState::Idle;
            }
            changed = true;
        }
        if self.deadlines.toast.is_some_and(|due| due <= now) {
            self.deadlines.toast = None;
            self.injector.clear_toast(&mut self.page.document);
            changed = true;
        }
        changed
    }

    /// Waits out every pending feedback reset and toast.
    pub async fn settle(&mut self) {
        while let Some(due) = self.next_deadline() {
            tokio::time::sleep_until(due).await;
            self.expire_feedback(Instant::now());
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        [self.deadlines.save, self.deadlines.tryon, self.deadlines.toast]
            .into_iter()
            .flatten()
            .min()
    }

    fn set_feedback(&mut self, kind: ControlKind, feedback: Feedback) {
        self.injector
            .set_feedback(&mut self.page.document, kind, feedback);
        let due = matches!(feedback, Feedback::Success | Feedback::Error)
            .then(|| Instant::now() + self.settings.feedback_reset);
        match kind {
            ControlKind::Save => self.deadlines.save = due,
            ControlKind::Tryon => self.deadlines.tryon = due,
        }
    }

    fn show_toast(&mut self, message: &str) {
        self.injector.show_toast(&mut self.page.document, message);
        self.deadlines.toast = Some(Instant::now() + self.settings.toast_duration);
    }

    fn extract(&self) -> Result<ProductInfo, FlowError> {
        extractor::extract_product_info(&self.registry, &self.page, Utc::now())
            .ok_or(FlowError::Extraction)
    }
}

fn ensure_success(action: &'static str, response: &Response) -> Result<(), FlowError> {
    if response.success {
        Ok(())
    } else {
        Err(FlowError::Rejected {
            action,
            reason: response
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
