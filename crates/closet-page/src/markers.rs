//! Identifying markers carried by every injected node.
//!
//! Presence checks go through these markers only, so repeated injection
//! never duplicates a node.

use std::sync::LazyLock;

use scraper::Selector;

pub const MARKER_ATTR: &str = "data-closet";
pub const TRYON_THUMBNAIL_ATTR: &str = "data-closet-tryon";

pub const CONTAINER_ID: &str = "closet-btns-container";
pub const SAVE_BUTTON_ID: &str = "closet-save-btn";
pub const TRYON_BUTTON_ID: &str = "closet-tryon-btn";
pub const UPLOAD_POPUP_ID: &str = "closet-tryon-popup-root";

/// Role of an injected node, rendered as `data-closet="<role>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Container,
    SaveButton,
    TryonButton,
    TryonThumbnail,
    UploadPopup,
    Toast,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Container,
        Role::SaveButton,
        Role::TryonButton,
        Role::TryonThumbnail,
        Role::UploadPopup,
        Role::Toast,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Container => "container",
            Role::SaveButton => "save-button",
            Role::TryonButton => "tryon-button",
            Role::TryonThumbnail => "tryon-thumbnail",
            Role::UploadPopup => "upload-popup",
            Role::Toast => "toast",
        }
    }

    /// Selector matching nodes injected with this role.
    #[must_use]
    pub fn selector(self) -> &'static Selector {
        &ROLE_SELECTORS[self as usize]
    }

    /// Attribute text to splice into an opening tag.
    #[must_use]
    pub fn attribute(self) -> String {
        format!(r#" {MARKER_ATTR}="{}""#, self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static ROLE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    Role::ALL
        .iter()
        .map(|role| {
            Selector::parse(&format!(r#"[{MARKER_ATTR}="{}"]"#, role.as_str()))
                .expect("marker selector is valid")
        })
        .collect()
});

/// Any node carrying the try-on thumbnail flag, including ones rendered
/// from a site template that set the flag itself.
pub static TRYON_FLAGGED: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!(r#"[{TRYON_THUMBNAIL_ATTR}="1"]"#)).expect("marker selector is valid")
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HostDocument;

    #[test]
    fn role_selectors_line_up_with_roles() {
        for role in Role::ALL {
            let html = format!("<html><body><div{}></div></body></html>", role.attribute());
            let doc = HostDocument::parse(&html);
            assert_eq!(doc.count(role.selector()), 1, "{role}");
            for other in Role::ALL.into_iter().filter(|r| *r != role) {
                assert_eq!(doc.count(other.selector()), 0, "{role} vs {other}");
            }
        }
    }
}
