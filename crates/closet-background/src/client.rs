//! HTTP client for the Supabase-style backend.
//!
//! Covers the four surfaces the extension uses: anonymous auth, object
//! storage for reference photos, the `user_images` table, and the try-on
//! edge function. Every call carries the project's anon key in the `apikey`
//! header plus a bearer token (the user's access token once signed in).
//! Nothing is retried.

use std::time::Duration;

use chrono::{DateTime, Utc};
use closet_core::{BackendConfig, ProductInfo, Session, User};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;

const DEFAULT_TRYON_FUNCTION: &str = "virtual-tryon";
const DEFAULT_IMAGE_BUCKET: &str = "user-images";
const DEFAULT_USER_AGENT: &str = "closet/0.1";
const LIMIT_EXCEEDED: &str = "limit_exceeded";

/// Client for the backend REST API.
///
/// Use [`SupabaseClient::new`] with loaded configuration or
/// [`SupabaseClient::with_base_url`] to point at a mock server in tests.
pub struct SupabaseClient {
    client: Client,
    anon_key: String,
    base_url: Url,
    tryon_function: String,
    image_bucket: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    is_anonymous: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TryonRequest<'a> {
    product_image_url: &'a str,
    product_url: &'a str,
    product_title: &'a str,
    user_image_id: &'a str,
}

impl AuthResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| now + chrono::Duration::seconds(secs))
            });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: User {
                id: self.user.id,
                is_anonymous: self.user.is_anonymous,
            },
        }
    }
}

impl SupabaseClient {
    /// Creates a client from loaded backend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`BackendError::InvalidBaseUrl`] if the
    /// configured URL does not parse.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut client = Self::build(
            &config.anon_key,
            config.request_timeout_secs,
            &config.url,
            &config.user_agent,
        )?;
        client.tryon_function.clone_from(&config.tryon_function);
        client.image_bucket.clone_from(&config.image_bucket);
        Ok(client)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`SupabaseClient::new`].
    pub fn with_base_url(
        anon_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, BackendError> {
        Self::build(anon_key, timeout_secs, base_url, DEFAULT_USER_AGENT)
    }

    fn build(
        anon_key: &str,
        timeout_secs: u64,
        base_url: &str,
        user_agent: &str,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so relative joins append to the path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| BackendError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            anon_key: anon_key.to_owned(),
            base_url,
            tryon_function: DEFAULT_TRYON_FUNCTION.to_string(),
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
        })
    }

    /// Creates a fresh anonymous user and returns its session.
    ///
    /// # Errors
    ///
    /// - [`BackendError::Http`] on network failure.
    /// - [`BackendError::UnexpectedStatus`] / [`BackendError::Unauthorized`]
    ///   on a non-2xx reply.
    /// - [`BackendError::Deserialize`] if the body is not an auth response.
    pub async fn sign_in_anonymously(&self) -> Result<Session, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let request = self
            .authorized(self.client.post(url), &self.anon_key)
            .json(&serde_json::json!({}));
        let response = Self::check_status(request.send().await?).await?;
        let auth: AuthResponse = Self::parse_json(response, "auth/v1/signup").await?;
        let session = auth.into_session(Utc::now());
        tracing::info!(user_id = %session.user.id, "anonymous user created");
        Ok(session)
    }

    /// Revokes the session's tokens.
    ///
    /// # Errors
    ///
    /// Same classes as [`SupabaseClient::sign_in_anonymously`].
    pub async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        let request = self.authorized(self.client.post(url), &session.access_token);
        Self::check_status(request.send().await?).await?;
        Ok(())
    }

    /// Stores a reference photo under `{bucket}/{user_id}/{uuid}.{ext}` and
    /// returns the object path within the bucket.
    ///
    /// # Errors
    ///
    /// Same classes as [`SupabaseClient::sign_in_anonymously`].
    pub async fn upload_image(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<String, BackendError> {
        let object_path = format!(
            "{}/{}.{}",
            session.user.id,
            uuid::Uuid::new_v4(),
            extension_for(mime_type)
        );
        let url = self.endpoint(&format!(
            "storage/v1/object/{}/{object_path}",
            self.image_bucket
        ))?;
        let size = bytes.len();
        let request = self
            .authorized(self.client.post(url), &session.access_token)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes);
        Self::check_status(request.send().await?).await?;
        tracing::debug!(object_path = %object_path, size, "reference photo uploaded");
        Ok(object_path)
    }

    /// Records an uploaded photo in `user_images` and returns the new row id.
    ///
    /// # Errors
    ///
    /// Same classes as [`SupabaseClient::sign_in_anonymously`], plus
    /// [`BackendError::MissingField`] if no row comes back.
    pub async fn insert_user_image(
        &self,
        session: &Session,
        object_path: &str,
    ) -> Result<String, BackendError> {
        let url = self.endpoint("rest/v1/user_images")?;
        let request = self
            .authorized(self.client.post(url), &session.access_token)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "user_id": session.user.id,
                "image_path": object_path,
            }));
        let response = Self::check_status(request.send().await?).await?;
        let rows: Vec<Value> = Self::parse_json(response, "rest/v1/user_images").await?;
        rows.first()
            .and_then(row_id)
            .ok_or(BackendError::MissingField {
                context: "user_images insert",
                field: "id",
            })
    }

    /// Id of the user's most recently uploaded reference photo, if any.
    ///
    /// # Errors
    ///
    /// Same classes as [`SupabaseClient::sign_in_anonymously`].
    pub async fn latest_user_image_id(
        &self,
        session: &Session,
    ) -> Result<Option<String>, BackendError> {
        let mut url = self.endpoint("rest/v1/user_images")?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("user_id", &format!("eq.{}", session.user.id))
            .append_pair("order", "created_at.desc")
            .append_pair("limit", "1");
        let request = self.authorized(self.client.get(url), &session.access_token);
        let response = Self::check_status(request.send().await?).await?;
        let rows: Vec<Value> = Self::parse_json(response, "rest/v1/user_images").await?;
        Ok(rows.first().and_then(row_id))
    }

    /// Runs the try-on function for `product` against the user's reference
    /// photo and returns the signed URL of the generated image.
    ///
    /// # Errors
    ///
    /// - [`BackendError::LimitExceeded`] on HTTP 429 or an
    ///   `{"error": "limit_exceeded"}` body.
    /// - [`BackendError::MissingField`] if the reply carries no image URL.
    /// - Otherwise the same classes as [`SupabaseClient::sign_in_anonymously`].
    pub async fn invoke_tryon(
        &self,
        session: &Session,
        product: &ProductInfo,
        user_image_id: &str,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(&format!("functions/v1/{}", self.tryon_function))?;
        let request = self
            .authorized(self.client.post(url), &session.access_token)
            .json(&TryonRequest {
                product_image_url: &product.image,
                product_url: &product.url,
                product_title: &product.title,
                user_image_id,
            });
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(product_url = %product.url, "try-on quota exhausted");
            return Err(BackendError::LimitExceeded);
        }
        let url = response.url().to_string();
        let text = response.text().await?;
        let parsed = serde_json::from_str::<Value>(&text);
        if parsed
            .as_ref()
            .ok()
            .and_then(|b| b.get("error"))
            .and_then(Value::as_str)
            == Some(LIMIT_EXCEEDED)
        {
            tracing::warn!(product_url = %product.url, "try-on quota exhausted");
            return Err(BackendError::LimitExceeded);
        }
        if !status.is_success() {
            return Err(BackendError::UnexpectedStatus {
                status: status.as_u16(),
                url,
                body: text,
            });
        }
        let body = parsed.map_err(|source| BackendError::Deserialize {
            context: format!("functions/v1/{}", self.tryon_function),
            source,
        })?;
        ["signedUrl", "publicUrl"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or(BackendError::MissingField {
                context: "try-on",
                field: "signedUrl",
            })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::UnexpectedStatus {
            status: status.as_u16(),
            url,
            body,
        })
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, BackendError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}

/// File extension for an uploaded image's MIME type.
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => "bin",
    }
}

fn row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
