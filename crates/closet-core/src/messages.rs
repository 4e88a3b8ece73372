//! Request/response protocol between the content script and the background
//! context. Requests are tagged by `action`; every request is answered with a
//! [`Response`] whose `success` flag says whether the action took effect.

use serde::{Deserialize, Serialize};

use crate::auth::User;
use crate::product::{ProductInfo, TryonImage};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    SaveProduct {
        product: ProductInfo,
    },
    GetProducts,
    RemoveProduct {
        product: ProductInfo,
    },
    ClearAll,
    GetUser,
    SignInAnonymously,
    SignOut,
    #[serde(rename = "getuserImageId")]
    GetUserImageId,
    #[serde(rename_all = "camelCase")]
    UploadImage {
        image: Vec<u8>,
        mime_type: String,
    },
    ProcessTryon {
        product: ProductInfo,
    },
    #[serde(rename_all = "camelCase")]
    SaveTryonImage {
        tryon_image_url: String,
        product_url: String,
    },
    #[serde(rename_all = "camelCase")]
    GetTryonImage {
        product_url: String,
    },
}

impl Request {
    /// The wire name of this request's action.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Request::SaveProduct { .. } => "saveProduct",
            Request::GetProducts => "getProducts",
            Request::RemoveProduct { .. } => "removeProduct",
            Request::ClearAll => "clearAll",
            Request::GetUser => "getUser",
            Request::SignInAnonymously => "signInAnonymously",
            Request::SignOut => "signOut",
            Request::GetUserImageId => "getuserImageId",
            Request::UploadImage { .. } => "uploadImage",
            Request::ProcessTryon { .. } => "processTryon",
            Request::SaveTryonImage { .. } => "saveTryonImage",
            Request::GetTryonImage { .. } => "getTryonImage",
        }
    }
}

/// Reply to any [`Request`]. Only the fields relevant to the action are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_image_id: Option<String>,
    /// Signed URL of a freshly generated try-on image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tryon_image: Option<TryonImage>,
    /// The backend refused the try-on because the user's quota is spent.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub limit_exceeded: bool,
}

impl Response {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn limit_exceeded() -> Self {
        Self {
            limit_exceeded: true,
            ..Self::failure("try-on limit exceeded")
        }
    }
}
