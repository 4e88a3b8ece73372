//! Idempotent injection of the extension's nodes into a host page.
//!
//! The free functions each check their marker before touching the
//! document. [`Injector`] holds what *should* be on the page and
//! reconciles the document towards it after host re-renders.

use chrono::{DateTime, Utc};
use ego_tree::NodeId;
use uuid::Uuid;

use crate::document::HostDocument;
use crate::error::InjectError;
use crate::markers::{Role, TRYON_FLAGGED};
use crate::registry::SitePattern;
use crate::template::{self, ControlKind, Feedback, ThumbnailTokens};

/// Inserts the button container after the pattern's anchor. No-op when the
/// container already exists; skipped with a warning when the anchor is missing.
pub fn ensure_container(doc: &mut HostDocument, pattern: &SitePattern) -> Option<NodeId> {
    if let Some(existing) = doc.select_first(Role::Container.selector()) {
        return Some(existing.id());
    }
    let Some(anchor) = doc
        .select_first(&pattern.selectors.insert_target)
        .map(|el| el.id())
    else {
        tracing::warn!(role = %Role::Container, "insertion anchor not found; skipping injection");
        return None;
    };
    let inserted = doc.insert_html_after(anchor, &template::container());
    tracing::debug!(role = %Role::Container, "injected");
    inserted
}

/// Ensures the save button exists as the container's first child.
pub fn ensure_save_button(
    doc: &mut HostDocument,
    pattern: &SitePattern,
    feedback: Feedback,
) -> Option<NodeId> {
    ensure_button(doc, pattern, ControlKind::Save, feedback)
}

/// Ensures the try-on button exists as the container's last child.
pub fn ensure_tryon_button(
    doc: &mut HostDocument,
    pattern: &SitePattern,
    feedback: Feedback,
) -> Option<NodeId> {
    ensure_button(doc, pattern, ControlKind::Tryon, feedback)
}

fn ensure_button(
    doc: &mut HostDocument,
    pattern: &SitePattern,
    kind: ControlKind,
    feedback: Feedback,
) -> Option<NodeId> {
    let role = kind.role();
    if let Some(existing) = doc.select_first(role.selector()) {
        return Some(existing.id());
    }
    let container = ensure_container(doc, pattern)?;
    let html = template::button(kind, feedback);
    let inserted = match kind {
        ControlKind::Save => doc.prepend_html(container, &html),
        ControlKind::Tryon => doc.append_html(container, &html),
    };
    tracing::debug!(%role, "injected");
    inserted
}

/// Re-renders an existing button in place. Returns `false` when the button
/// is not on the page.
pub fn render_button(doc: &mut HostDocument, kind: ControlKind, feedback: Feedback) -> bool {
    let Some(id) = doc.select_first(kind.role().selector()).map(|el| el.id()) else {
        return false;
    };
    doc.replace_html(id, &template::button(kind, feedback)).is_some()
}

/// Places a try-on result on the page, replacing any previous one.
///
/// With a thumbnail template and a thumbnail list (or gallery fallback) on
/// the page, the rendered template is prepended to the list. Otherwise a
/// generic figure is inserted right after the main image.
///
/// # Errors
///
/// Returns [`InjectError::MissingAnchor`] when neither a list nor the main
/// image exists.
pub fn inject_tryon_thumbnail(
    doc: &mut HostDocument,
    pattern: &SitePattern,
    image_url: &str,
    now: DateTime<Utc>,
) -> Result<NodeId, InjectError> {
    let role = Role::TryonThumbnail;
    let removed = doc.remove_all(&TRYON_FLAGGED);
    if removed > 0 {
        tracing::debug!(removed, "removed previous try-on thumbnail");
    }

    if let Some(markup) = pattern.inject_template.as_deref() {
        if let Some(list) = thumbnail_list(doc, pattern) {
            let existing = thumbnail_count(doc, pattern, list);
            let html = template::render_thumbnail(
                markup,
                &ThumbnailTokens {
                    image_url,
                    uid: Uuid::new_v4().to_string(),
                    posinset: 1,
                    setsize: existing + 1,
                    timestamp: now.timestamp_millis(),
                    index: 0,
                },
            );
            let inserted = doc
                .prepend_html(list, &html)
                .ok_or(InjectError::EmptyMarkup { role })?;
            tracing::debug!(%role, setsize = existing + 1, "injected into thumbnail list");
            return Ok(inserted);
        }
        tracing::debug!(%role, "thumbnail list not found; using generic figure");
    }

    let main = doc
        .select_first(&pattern.selectors.image)
        .map(|el| el.id())
        .ok_or(InjectError::MissingAnchor { role })?;
    let inserted = doc
        .insert_html_after(main, &template::generic_figure(image_url))
        .ok_or(InjectError::EmptyMarkup { role })?;
    tracing::debug!(%role, "injected after main image");
    Ok(inserted)
}

fn thumbnail_list(doc: &HostDocument, pattern: &SitePattern) -> Option<NodeId> {
    pattern
        .selectors
        .thumbnail_list
        .iter()
        .chain(&pattern.selectors.gallery)
        .find_map(|selector| doc.select_first(selector))
        .map(|el| el.id())
}

fn thumbnail_count(doc: &HostDocument, pattern: &SitePattern, list: NodeId) -> usize {
    let Some(list) = doc.element(list) else {
        return 0;
    };
    match &pattern.selectors.thumbnail_item {
        Some(item) => list.select(item).count(),
        None => list.child_elements().count(),
    }
}

/// Sets the main image `src`, returning the previous value.
fn swap_main_image(doc: &mut HostDocument, pattern: &SitePattern, src: &str) -> Option<String> {
    let main = doc.select_first(&pattern.selectors.image)?;
    let id = main.id();
    let previous = main.value().attr("src")?.to_string();
    doc.set_attr(id, "src", src).then_some(previous)
}

pub fn show_upload_popup(doc: &mut HostDocument) -> Option<NodeId> {
    if let Some(existing) = doc.select_first(Role::UploadPopup.selector()) {
        return Some(existing.id());
    }
    let body = doc.body()?.id();
    doc.append_html(body, &template::upload_popup())
}

pub fn hide_upload_popup(doc: &mut HostDocument) -> bool {
    doc.remove_all(Role::UploadPopup.selector()) > 0
}

/// Shows `message` as the only toast on the page.
pub fn show_toast(doc: &mut HostDocument, message: &str) -> Option<NodeId> {
    doc.remove_all(Role::Toast.selector());
    let body = doc.body()?.id();
    doc.append_html(body, &template::toast(message))
}

pub fn clear_toast(doc: &mut HostDocument) -> bool {
    doc.remove_all(Role::Toast.selector()) > 0
}

/// Desired injection state for one page.
#[derive(Debug, Default)]
pub struct Injector {
    active: bool,
    tryon_enabled: bool,
    save: Feedback,
    tryon: Feedback,
    tryon_result: Option<String>,
    upload_popup: bool,
    toast: Option<String>,
    preview_original: Option<String>,
}

impl Injector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the page as decorated. The try-on button is only expected on
    /// apparel pages.
    pub fn activate(&mut self, tryon_enabled: bool) {
        self.active = true;
        self.tryon_enabled = tryon_enabled;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn tryon_enabled(&self) -> bool {
        self.tryon_enabled
    }

    #[must_use]
    pub fn feedback(&self, kind: ControlKind) -> Feedback {
        match kind {
            ControlKind::Save => self.save,
            ControlKind::Tryon => self.tryon,
        }
    }

    /// Records the button's feedback state and re-renders it if present.
    pub fn set_feedback(&mut self, doc: &mut HostDocument, kind: ControlKind, feedback: Feedback) {
        match kind {
            ControlKind::Save => self.save = feedback,
            ControlKind::Tryon => self.tryon = feedback,
        }
        render_button(doc, kind, feedback);
    }

    #[must_use]
    pub fn tryon_result(&self) -> Option<&str> {
        self.tryon_result.as_deref()
    }

    /// Records `image_url` as the page's try-on result and injects it.
    ///
    /// # Errors
    ///
    /// Propagates [`inject_tryon_thumbnail`] failures; the result is still
    /// recorded so a later reconcile can place it.
    pub fn place_tryon_result(
        &mut self,
        doc: &mut HostDocument,
        pattern: &SitePattern,
        image_url: &str,
        now: DateTime<Utc>,
    ) -> Result<NodeId, InjectError> {
        self.tryon_result = Some(image_url.to_string());
        self.preview_original = None;
        inject_tryon_thumbnail(doc, pattern, image_url, now)
    }

    pub fn open_upload_popup(&mut self, doc: &mut HostDocument) {
        self.upload_popup = true;
        show_upload_popup(doc);
    }

    pub fn close_upload_popup(&mut self, doc: &mut HostDocument) {
        self.upload_popup = false;
        hide_upload_popup(doc);
    }

    #[must_use]
    pub fn upload_popup_open(&self) -> bool {
        self.upload_popup
    }

    pub fn show_toast(&mut self, doc: &mut HostDocument, message: &str) {
        self.toast = Some(message.to_string());
        show_toast(doc, message);
    }

    pub fn clear_toast(&mut self, doc: &mut HostDocument) {
        self.toast = None;
        clear_toast(doc);
    }

    #[must_use]
    pub fn toast(&self) -> Option<&str> {
        self.toast.as_deref()
    }

    /// Hover handling for sites with `mouse_over_transition`: entering shows
    /// the try-on result in the main image slot, leaving restores it.
    pub fn preview_tryon(
        &mut self,
        doc: &mut HostDocument,
        pattern: &SitePattern,
        entering: bool,
    ) -> bool {
        if !pattern.mouse_over_transition {
            return false;
        }
        if entering {
            if self.preview_original.is_some() {
                return false;
            }
            let Some(url) = self.tryon_result.clone() else {
                return false;
            };
            self.preview_original = swap_main_image(doc, pattern, &url);
            self.preview_original.is_some()
        } else {
            self.preview_original
                .take()
                .and_then(|original| swap_main_image(doc, pattern, &original))
                .is_some()
        }
    }

    /// Click handling: shows the try-on result in the main image slot until
    /// the host replaces it.
    pub fn select_tryon(&mut self, doc: &mut HostDocument, pattern: &SitePattern) -> bool {
        let Some(url) = self.tryon_result.clone() else {
            return false;
        };
        self.preview_original = None;
        swap_main_image(doc, pattern, &url).is_some()
    }

    /// Roles that should currently be on the page.
    #[must_use]
    pub fn expected_roles(&self) -> Vec<Role> {
        if !self.active {
            return Vec::new();
        }
        let mut roles = vec![Role::Container, Role::SaveButton];
        if self.tryon_enabled {
            roles.push(Role::TryonButton);
        }
        if self.tryon_result.is_some() {
            roles.push(Role::TryonThumbnail);
        }
        if self.upload_popup {
            roles.push(Role::UploadPopup);
        }
        if self.toast.is_some() {
            roles.push(Role::Toast);
        }
        roles
    }

    #[must_use]
    pub fn missing_roles(&self, doc: &HostDocument) -> Vec<Role> {
        self.expected_roles()
            .into_iter()
            .filter(|role| !doc.exists(role.selector()))
            .collect()
    }

    /// Re-runs every ensure operation for roles missing from the page.
    /// Returns the roles that were missing.
    pub fn reconcile(
        &mut self,
        doc: &mut HostDocument,
        pattern: &SitePattern,
        now: DateTime<Utc>,
    ) -> Vec<Role> {
        let missing = self.missing_roles(doc);
        if missing.is_empty() {
            return missing;
        }

        ensure_save_button(doc, pattern, self.save);
        if self.tryon_enabled {
            ensure_tryon_button(doc, pattern, self.tryon);
        }
        if missing.contains(&Role::TryonThumbnail) {
            if let Some(url) = self.tryon_result.clone() {
                self.preview_original = None;
                if let Err(e) = inject_tryon_thumbnail(doc, pattern, &url, now) {
                    tracing::warn!(error = %e, "could not restore try-on thumbnail");
                }
            }
        }
        if self.upload_popup {
            show_upload_popup(doc);
        }
        if missing.contains(&Role::Toast) {
            if let Some(message) = &self.toast {
                show_toast(doc, message);
            }
        }
        missing
    }
}

#[cfg(test)]
#[path = "injector_test.rs"]
mod tests;
