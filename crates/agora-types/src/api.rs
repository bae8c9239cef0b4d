use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Session Claims --

/// Claims carried by the session cookie. Shared by every app mounted in the
/// server so one login is valid for commerce, network and mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

use crate::forms::{EMAIL_SUBJECT_MAX, FormError, max_len};

// -- Network JSON API --

/// Body of `PUT /like/{post_id}`. The field is optional so a missing key can
/// be reported as a client error instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct LikeRequest {
    #[serde(default)]
    pub like: Option<bool>,
}

/// Body of `PUT /edit/{post_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct EditPostRequest {
    #[serde(default)]
    pub content: Option<String>,
}

// -- Mail JSON API --

/// Body of `POST /emails`. Recipients are usernames separated by commas.
#[derive(Debug, Default, Deserialize)]
pub struct ComposeRequest {
    #[serde(default)]
    pub recipients: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl ComposeRequest {
    /// The recipient names, trimmed, in the order given. Blank entries are
    /// skipped and at least one name must remain.
    pub fn recipient_names(&self) -> Result<Vec<String>, FormError> {
        let names: Vec<String> = self
            .recipients
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(FormError::Invalid("At least one recipient required.".into()));
        }
        Ok(names)
    }

    pub fn validate(&self) -> Result<(), FormError> {
        max_len("Subject", self.subject.as_deref().unwrap_or_default(), EMAIL_SUBJECT_MAX)
    }
}

/// Body of `PUT /emails/{id}`. Absent flags keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct EmailFlags {
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub archived: Option<bool>,
}

/// One message as the mail page receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailView {
    pub id: i64,
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub timestamp: String,
    pub read: bool,
    pub archived: bool,
}

/// Response body of the JSON APIs: exactly one of `success` or `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMessage {
    Success(String),
    Error(String),
}

impl ApiMessage {
    pub fn success(msg: impl Into<String>) -> Self {
        Self::Success(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }
}
