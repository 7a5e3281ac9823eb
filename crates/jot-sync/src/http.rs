//! HTTP remote store for a PostgREST-style `notes` table
//!
//! Rows are `{ id, title, desc, user_id }`. Every request carries the
//! project `apikey` header and a bearer token (the user's access token, or
//! the api key when no session token is set). Row ownership is enforced by
//! the server; the `user_id` filters only narrow the request.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::trace;

use jot_core::{Note, NoteFields, NoteId, RemoteError, RemoteStore, UserId};

/// Connection settings for [`HttpRemoteStore`]
#[derive(Debug, Clone)]
pub struct HttpRemoteConfig {
    /// Project URL, e.g. `https://example.supabase.co`
    pub base_url: String,
    /// Public api key sent as the `apikey` header
    pub api_key: String,
    /// Session token of the signed-in user
    pub access_token: Option<String>,
    pub table: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpRemoteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            table: "notes".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }
}

#[derive(Deserialize)]
struct NoteRow {
    id: String,
    title: String,
    #[serde(default)]
    desc: Option<String>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note::with_id(row.id, row.title, row.desc.unwrap_or_default())
    }
}

/// [`RemoteStore`] backed by a hosted REST endpoint
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    config: HttpRemoteConfig,
}

trait WithAuth {
    fn with_auth(self, config: &HttpRemoteConfig) -> Self;
}

impl WithAuth for reqwest::RequestBuilder {
    fn with_auth(self, config: &HttpRemoteConfig) -> Self {
        self.header("apikey", &config.api_key)
            .bearer_auth(config.bearer())
    }
}

impl HttpRemoteStore {
    pub fn new(config: HttpRemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::network(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpRemoteConfig {
        &self.config
    }

    /// POST for a new row
    ///
    /// A replayed insert whose row already exists is ignored server side
    /// (`ON CONFLICT DO NOTHING`) instead of failing with 409.
    fn insert_request(&self, user: &UserId, note: &Note) -> reqwest::RequestBuilder {
        self.client
            .post(self.config.table_url())
            .header("Prefer", "return=minimal,resolution=ignore-duplicates")
            .json(&json!({
                "id": note.id.as_str(),
                "title": note.title,
                "desc": note.desc,
                "user_id": user.as_str(),
            }))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = request
            .with_auth(&self.config)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        trace!(status = status.as_u16(), url = %response.url(), "Remote response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), &body))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn insert(&self, user: &UserId, note: &Note) -> Result<(), RemoteError> {
        self.send(self.insert_request(user, note)).await?;
        Ok(())
    }

    async fn update(
        &self,
        user: &UserId,
        id: &NoteId,
        fields: &NoteFields,
    ) -> Result<(), RemoteError> {
        let request = self
            .client
            .patch(self.config.table_url())
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user)),
            ])
            .header("Prefer", "return=minimal")
            .json(&json!({
                "title": fields.title,
                "desc": fields.desc,
            }));
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, user: &UserId, id: &NoteId) -> Result<(), RemoteError> {
        let request = self.client.delete(self.config.table_url()).query(&[
            ("id", format!("eq.{}", id)),
            ("user_id", format!("eq.{}", user)),
        ]);
        self.send(request).await?;
        Ok(())
    }

    async fn list_all(&self, user: &UserId) -> Result<Vec<Note>, RemoteError> {
        let request = self.client.get(self.config.table_url()).query(&[
            ("user_id", format!("eq.{}", user)),
            ("select", "id,title,desc".to_string()),
        ]);
        let rows: Vec<NoteRow> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        Ok(rows.into_iter().map(Note::from).collect())
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_decode() {
        RemoteError::InvalidResponse(e.to_string())
    } else {
        RemoteError::network(e.to_string())
    }
}

/// Map a non-success response to a [`RemoteError`]
///
/// The message is taken from a JSON `message` field when present, else
/// from the raw body.
pub fn classify_status(status: u16, body: &str) -> RemoteError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        401 | 403 => RemoteError::Unauthorized(message),
        409 => RemoteError::Conflict(message),
        400 | 422 => RemoteError::Validation(message),
        _ => RemoteError::Status { status, message },
    }
}
