#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use agora_api::{AppState, AppStateInner, SessionConfig, build_router};
use agora_db::Database;
use agora_wiki::EntryStore;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            entries: EntryStore::new(dir.path().join("entries")).await.unwrap(),
            sessions: SessionConfig {
                secret: "integration-test-secret".into(),
                ttl: chrono::Duration::days(1),
            },
        });
        Self {
            router: build_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::get(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    /// POSTs an already url-encoded form body.
    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::from(form.to_string())).unwrap()).await
    }

    /// Sends a JSON body without a content type, the way the feed page does.
    pub async fn json(&self, method: &str, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Registers through the given app and returns the session cookie.
    pub async fn register(&self, app: &str, username: &str, password: &str) -> String {
        let form = format!(
            "username={u}&email={u}%40example.com&nickname=&password={p}&confirmation={p}",
            u = username,
            p = password
        );
        let res = self.post_form(&format!("{}/register", app), &form, None).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "register {} failed", username);
        session_cookie(&res)
    }

    pub fn user_id(&self, username: &str) -> String {
        self.state.db.get_user_by_username(username).unwrap().unwrap().id
    }
}

pub fn session_cookie(res: &Response<Body>) -> String {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("agora_session="))
        .and_then(|v| v.split(';').next())
        .expect("no session cookie")
        .to_string()
}

pub fn location(res: &Response<Body>) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
