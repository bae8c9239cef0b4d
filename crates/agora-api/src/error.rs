use askama::Template;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::error;

use agora_db::DbError;
use agora_types::api::ApiMessage;
use agora_wiki::StoreError;

use crate::templates::{ErrorTemplate, Nav};

/// Failure of an HTML handler, rendered as an error page.
#[derive(Debug)]
pub enum PageError {
    NotFound(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    /// The route needs a signed-in user; carries the app's login path.
    LoginRequired(&'static str),
    Internal,
}

impl PageError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::LoginRequired(_) => StatusCode::SEE_OTHER,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound(m) | Self::Forbidden(m) | Self::BadRequest(m) | Self::Conflict(m) => m,
            Self::LoginRequired(_) => "Please sign in.",
            Self::Internal => "Something went wrong.",
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let Self::LoginRequired(login) = self {
            return Redirect::to(login).into_response();
        }

        let status = self.status();
        let page = ErrorTemplate {
            nav: Nav::plain(),
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.message().to_string(),
        };
        match page.render() {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                error!("Error page rendering failed: {}", e);
                (status, self.message().to_string()).into_response()
            }
        }
    }
}

impl From<DbError> for PageError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => Self::NotFound(format!("No such {}.", what)),
            DbError::Forbidden(msg) => Self::Forbidden(msg),
            DbError::Rejected(msg) => Self::BadRequest(msg),
            DbError::Conflict(msg) => Self::Conflict(msg),
            other => {
                error!("Database error: {}", other);
                Self::Internal
            }
        }
    }
}

impl From<StoreError> for PageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidTitle(title) => Self::BadRequest(format!("'{}' is not a valid title.", title)),
            StoreError::Io(e) => {
                error!("Entry store error: {}", e);
                Self::Internal
            }
        }
    }
}

/// Failure of a JSON API handler: `{"error": message}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiMessage::error(self.message))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound("post") => Self::new(StatusCode::NOT_FOUND, "Post not found."),
            DbError::NotFound("email") => Self::new(StatusCode::NOT_FOUND, "Email not found."),
            DbError::NotFound(what) => Self::new(StatusCode::NOT_FOUND, format!("No such {}.", what)),
            DbError::Forbidden(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            DbError::Rejected(msg) | DbError::Conflict(msg) => Self::bad_request(msg),
            other => {
                error!("Database error: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error.")
            }
        }
    }
}
