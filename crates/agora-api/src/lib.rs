pub mod auth;
pub mod commerce;
pub mod encyclopedia;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod network;
pub mod templates;

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state, response::Html, routing::get};

use agora_db::{Database, DbError};
use agora_wiki::EntryStore;

use crate::error::PageError;
use crate::templates::{HomeTemplate, Nav, NavLink, render};

pub const ENCYCLOPEDIA: &str = "/encyclopedia";
pub const COMMERCE: &str = "/commerce";
pub const NETWORK: &str = "/network";
pub const MAIL: &str = "/mail";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub entries: EntryStore,
    pub sessions: SessionConfig,
}

/// Signing secret and lifetime of session cookies.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl: chrono::Duration,
}

/// Every app behind the session middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .nest(ENCYCLOPEDIA, encyclopedia::routes())
        .nest(COMMERCE, commerce::routes())
        .nest(NETWORK, network::routes())
        .nest(MAIL, mail::routes())
        .layer(from_fn_with_state(state.clone(), middleware::resolve_viewer))
        .with_state(state)
}

async fn home() -> Result<Html<String>, PageError> {
    render(&HomeTemplate {
        nav: Nav::plain(),
        apps: vec![
            NavLink::new(ENCYCLOPEDIA, "Encyclopedia"),
            NavLink::new(COMMERCE, "Commerce"),
            NavLink::new(NETWORK, "Network"),
            NavLink::new(MAIL, "Mail"),
        ],
    })
}

async fn health() -> &'static str {
    "ok"
}

/// Runs a database call off the async runtime. Page and JSON handlers both
/// convert the `DbError` with `?`.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> agora_db::Result<T>
where
    F: FnOnce(&Database) -> agora_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| DbError::Task(e.to_string()))?
}

/// Numeric row id from a path segment; `None` when the segment is not one.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

/// Percent-encodes one path segment (titles, usernames) for use in a URL.
pub fn path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    async fn state(dir: &tempfile::TempDir) -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            entries: EntryStore::new(dir.path().join("entries")).await.unwrap(),
            sessions: SessionConfig {
                secret: "test-secret".into(),
                ttl: chrono::Duration::days(1),
            },
        })
    }

    #[tokio::test]
    async fn blocking_errors_convert_for_pages_and_apis() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir).await;

        let missing = blocking(&state, |db| db.get_post(7, None)).await.unwrap();
        assert!(missing.is_none());

        let err = blocking(&state, |_| -> agora_db::Result<()> { Err(DbError::NotFound("post")) })
            .await
            .unwrap_err();
        assert_eq!(ApiError::from(err).status, axum::http::StatusCode::NOT_FOUND);

        let err = blocking(&state, |_| -> agora_db::Result<()> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Task(_)));
        assert_eq!(PageError::from(err).status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn path_segment_escapes_reserved() {
        assert_eq!(path_segment("Python"), "Python");
        assert_eq!(path_segment("a b/c"), "a%20b%2Fc");
        assert_eq!(path_segment("é"), "%C3%A9");
    }

    #[test]
    fn parse_id_accepts_only_integers() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("4.2"), None);
        assert_eq!(parse_id(""), None);
    }
}
