//! Rendering of injected HTML: site thumbnail templates, the generic
//! try-on figure, controls, the upload popup, and toasts.

use crate::markers::{
    Role, CONTAINER_ID, SAVE_BUTTON_ID, TRYON_BUTTON_ID, TRYON_THUMBNAIL_ATTR, UPLOAD_POPUP_ID,
};

/// Values substituted into a site's thumbnail template.
#[derive(Debug, Clone)]
pub struct ThumbnailTokens<'a> {
    pub image_url: &'a str,
    pub uid: String,
    pub posinset: usize,
    pub setsize: usize,
    pub timestamp: i64,
    pub index: usize,
}

/// Substitutes every `{{token}}` and marks the template's root element.
#[must_use]
pub fn render_thumbnail(template: &str, tokens: &ThumbnailTokens<'_>) -> String {
    let rendered = template
        .replace("{{imageUrl}}", &escape_attr(tokens.image_url))
        .replace("{{uid}}", &tokens.uid)
        .replace("{{posinset}}", &tokens.posinset.to_string())
        .replace("{{setsize}}", &tokens.setsize.to_string())
        .replace("{{timestamp}}", &tokens.timestamp.to_string())
        .replace("{{index}}", &tokens.index.to_string());
    mark_root(&rendered, &thumbnail_marker())
}

/// Figure inserted after the main image when the site has no thumbnail
/// template or its thumbnail list is missing.
#[must_use]
pub fn generic_figure(image_url: &str) -> String {
    format!(
        r#"<div class="closet-tryon-figure"{marker} style="position: relative; display: inline-block; margin-top: 10px;"><img src="{src}" alt="Virtual Try-On Result" class="closet-tryon-image" style="max-width: 100%; border: 2px solid #667eea; border-radius: 8px; display: block;"><span class="closet-tryon-badge">Virtual Try-On Result</span></div>"#,
        marker = thumbnail_marker(),
        src = escape_attr(image_url),
    )
}

#[must_use]
pub fn container() -> String {
    format!(
        r#"<div id="{CONTAINER_ID}" class="closet-btns-container"{}></div>"#,
        Role::Container.attribute()
    )
}

/// Visual state of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feedback {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

impl Feedback {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Feedback::Idle => "idle",
            Feedback::Pending => "pending",
            Feedback::Success => "success",
            Feedback::Error => "error",
        }
    }
}

/// The two buttons in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Save,
    Tryon,
}

impl ControlKind {
    #[must_use]
    pub fn role(self) -> Role {
        match self {
            ControlKind::Save => Role::SaveButton,
            ControlKind::Tryon => Role::TryonButton,
        }
    }

    #[must_use]
    pub fn label(self, feedback: Feedback) -> &'static str {
        match (self, feedback) {
            (ControlKind::Save, Feedback::Idle) => "Save Secretly",
            (ControlKind::Save, Feedback::Pending) => "Saving...",
            (ControlKind::Save, Feedback::Success) => "Saved!",
            (ControlKind::Save, Feedback::Error) => "Error! Try again",
            (ControlKind::Tryon, Feedback::Idle) => "Try On",
            (ControlKind::Tryon, Feedback::Pending) => "Processing Try-On...",
            (ControlKind::Tryon, Feedback::Success) => "Try-On Complete!",
            (ControlKind::Tryon, Feedback::Error) => "Try-On Failed! Try again",
        }
    }

    fn element_id(self) -> &'static str {
        match self {
            ControlKind::Save => SAVE_BUTTON_ID,
            ControlKind::Tryon => TRYON_BUTTON_ID,
        }
    }
}

/// Renders a button for `kind` in the given feedback state. Buttons are
/// disabled whenever they are not idle.
#[must_use]
pub fn button(kind: ControlKind, feedback: Feedback) -> String {
    let disabled = if feedback == Feedback::Idle {
        ""
    } else {
        " disabled"
    };
    format!(
        r#"<button type="button" id="{id}" class="closet-btn closet-btn-{state}"{marker} data-state="{state}"{disabled}><span>{label}</span></button>"#,
        id = kind.element_id(),
        state = feedback.as_str(),
        marker = kind.role().attribute(),
        label = kind.label(feedback),
    )
}

#[must_use]
pub fn upload_popup() -> String {
    format!(
        r#"<div id="{UPLOAD_POPUP_ID}"{marker}><div class="tryon-popup-overlay"><div class="tryon-popup-container" role="dialog" aria-modal="true"><div class="tryon-popup-header"><h2>Upload Your Photo</h2></div><div class="tryon-popup-content"><p class="tryon-upload-text">Choose a full-length photo of yourself to try this item on.</p><input type="file" id="tryon-file-input" class="tryon-file-input" accept="image/*"><div class="tryon-popup-actions"><button type="button" class="tryon-btn tryon-cancel-btn">Cancel</button><button type="button" class="tryon-btn tryon-upload-btn">Upload</button></div></div></div></div></div>"#,
        marker = Role::UploadPopup.attribute(),
    )
}

#[must_use]
pub fn toast(message: &str) -> String {
    format!(
        r#"<div class="closet-toast" role="status"{marker}>{message}</div>"#,
        marker = Role::Toast.attribute(),
        message = escape_text(message),
    )
}

fn thumbnail_marker() -> String {
    format!(
        r#"{} {TRYON_THUMBNAIL_ATTR}="1""#,
        Role::TryonThumbnail.attribute()
    )
}

/// Splices `attributes` into the first opening tag of `html`. Markup that
/// does not start with an element is returned unchanged.
fn mark_root(html: &str, attributes: &str) -> String {
    let leading = html.len() - html.trim_start().len();
    let Some(rest) = html[leading..].strip_prefix('<') else {
        return html.to_string();
    };
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return html.to_string();
    }
    let split = leading + 1 + name_len;
    format!("{}{attributes}{}", &html[..split], &html[split..])
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
