//! Password hashing, session tokens and the account pages shared by the
//! commerce, network and mail apps.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};
use uuid::Uuid;

use agora_db::DbError;
use agora_types::api::Claims;
use agora_types::forms::{LoginForm, RegisterForm};
use agora_types::models::{AuthUser, Viewer};

use crate::error::{ApiError, PageError};
use crate::templates::{LoginTemplate, Nav, RegisterTemplate, render};
use crate::{AppState, SessionConfig, blocking};

pub const SESSION_COOKIE: &str = "agora_session";

/// One app's account pages: where they live and how their header looks.
#[derive(Clone, Copy)]
pub struct Site {
    pub prefix: &'static str,
    pub login: &'static str,
    pub show_nickname: bool,
    pub nav: fn(&Viewer) -> Nav,
}

impl Site {
    /// The signed-in user, or a redirect to this app's login page.
    pub fn require_user<'a>(&self, viewer: &'a Viewer) -> Result<&'a AuthUser, PageError> {
        viewer.user().ok_or(PageError::LoginRequired(self.login))
    }
}

/// The signed-in user behind a JSON request, or a 401 error body.
pub fn api_user(viewer: &Viewer) -> Result<&AuthUser, ApiError> {
    viewer
        .user()
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Sign in required."))
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

pub fn create_token(sessions: &SessionConfig, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + sessions.ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(sessions.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Claims of a valid, unexpired token; `None` for anything else.
pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .build()
}

fn sign_in(state: &AppState, jar: CookieJar, site: &Site, user_id: Uuid, username: &str) -> Result<Response, PageError> {
    let token = create_token(&state.sessions, user_id, username).map_err(|e| {
        tracing::error!("Session token creation failed: {}", e);
        PageError::Internal
    })?;
    Ok((jar.add(session_cookie(token)), Redirect::to(site.prefix)).into_response())
}

// -- Pages --

pub fn login_page(site: &Site, viewer: &Viewer) -> Result<Response, PageError> {
    login_form(site, viewer, StatusCode::OK, String::new())
}

fn login_form(site: &Site, viewer: &Viewer, status: StatusCode, message: String) -> Result<Response, PageError> {
    let page = render(&LoginTemplate {
        nav: (site.nav)(viewer),
        message,
    })?;
    Ok((status, page).into_response())
}

pub async fn login(
    state: &AppState,
    site: &Site,
    viewer: &Viewer,
    jar: CookieJar,
    form: LoginForm,
) -> Result<Response, PageError> {
    let username = form.username.trim().to_string();
    let lookup = username.clone();
    let user = blocking(state, move |db| db.get_user_by_username(&lookup)).await?;

    let user = match user {
        Some(user) if verify_password(&form.password, &user.password) => user,
        _ => {
            warn!("Failed login for '{}'", username);
            return login_form(
                site,
                viewer,
                StatusCode::UNAUTHORIZED,
                "Invalid username and/or password.".into(),
            );
        }
    };

    let user_id: Uuid = user.id.parse().map_err(|_| {
        tracing::error!("Stored user id '{}' is not a UUID", user.id);
        PageError::Internal
    })?;

    info!("User '{}' signed in", user.username);
    sign_in(state, jar, site, user_id, &user.username)
}

pub fn logout(site: &Site, jar: CookieJar) -> Response {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to(site.prefix)).into_response()
}

pub fn register_page(site: &Site, viewer: &Viewer) -> Result<Response, PageError> {
    register_form(site, viewer, StatusCode::OK, String::new())
}

fn register_form(site: &Site, viewer: &Viewer, status: StatusCode, message: String) -> Result<Response, PageError> {
    let page = render(&RegisterTemplate {
        nav: (site.nav)(viewer),
        message,
        show_nickname: site.show_nickname,
    })?;
    Ok((status, page).into_response())
}

pub async fn register(
    state: &AppState,
    site: &Site,
    viewer: &Viewer,
    jar: CookieJar,
    form: RegisterForm,
) -> Result<Response, PageError> {
    if let Err(e) = form.validate() {
        return register_form(site, viewer, StatusCode::BAD_REQUEST, e.to_string());
    }

    let password_hash = hash_password(&form.password).map_err(|e| {
        tracing::error!("{}", e);
        PageError::Internal
    })?;

    let user_id = Uuid::new_v4();
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    let nickname = form.nickname_or_default().to_string();

    let name = username.clone();
    let created = blocking(state, move |db| {
        match db.create_user(&user_id.to_string(), &name, &email, &nickname, &password_hash) {
            Ok(()) => Ok(true),
            Err(DbError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    })
    .await?;

    if !created {
        warn!("Registration refused, username '{}' taken", username);
        return register_form(site, viewer, StatusCode::CONFLICT, "Username already taken.".into());
    }

    info!("Registered user '{}'", username);
    sign_in(state, jar, site, user_id, &username)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions() -> SessionConfig {
        SessionConfig {
            secret: "test-secret".into(),
            ttl: chrono::Duration::days(1),
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("pw1").unwrap();
        assert!(verify_password("pw1", &hash));
        assert!(!verify_password("pw2", &hash));
        assert!(!verify_password("pw1", "not-a-hash"));
    }

    #[test]
    fn token_round_trip() {
        let id = Uuid::new_v4();
        let token = create_token(&sessions(), id, "alice").unwrap();

        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");

        assert!(decode_token("other-secret", &token).is_none());
        assert!(decode_token("test-secret", "garbage").is_none());
    }

    #[test]
    fn expired_token_rejected() {
        let expired = SessionConfig {
            secret: "test-secret".into(),
            ttl: chrono::Duration::days(-1),
        };
        let token = create_token(&expired, Uuid::new_v4(), "alice").unwrap();
        assert!(decode_token("test-secret", &token).is_none());
    }
}
