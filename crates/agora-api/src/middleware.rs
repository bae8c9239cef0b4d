use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, error};

use agora_types::models::{AuthUser, Viewer};

use crate::{AppState, blocking};
use crate::auth::{SESSION_COOKIE, decode_token};

/// Resolve the session cookie into a `Viewer` request extension.
///
/// A missing, forged or expired token, or one naming a user that no longer
/// exists, leaves the request anonymous.
pub async fn resolve_viewer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| decode_token(&state.sessions.secret, cookie.value()));

    let viewer = match claims {
        Some(claims) => {
            let id = claims.sub.to_string();
            match blocking(&state, move |db| db.get_user_by_id(&id)).await {
                Ok(Some(_)) => Viewer::Authenticated(AuthUser {
                    id: claims.sub,
                    username: claims.username,
                }),
                Ok(None) => {
                    debug!("Session for unknown user {}", claims.sub);
                    Viewer::Anonymous
                }
                Err(e) => {
                    error!("Session lookup failed: {}", e);
                    Viewer::Anonymous
                }
            }
        }
        None => Viewer::Anonymous,
    };

    req.extensions_mut().insert(viewer);
    next.run(req).await
}
