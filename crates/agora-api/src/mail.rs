//! Mail: a single page that drives a small JSON API for composing messages
//! and browsing the inbox, sent and archive mailboxes.

use axum::{
    Extension, Form, Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;
use tracing::info;

use agora_db::models::EmailRow;
use agora_types::api::{ApiMessage, ComposeRequest, EmailFlags, EmailView};
use agora_types::forms::{LoginForm, RegisterForm};
use agora_types::models::{Mailbox, Viewer};

use crate::auth::{self, Site};
use crate::error::{ApiError, PageError};
use crate::templates::{MailTemplate, Nav, NavLink, display_time, render};
use crate::{AppState, MAIL, blocking, parse_id};

const SITE: Site = Site {
    prefix: MAIL,
    login: "/mail/login",
    show_nickname: false,
    nav,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/register", get(register_page).post(register))
        .route("/emails", any(compose))
        .route("/emails/{key}", any(email_or_mailbox))
}

fn nav(viewer: &Viewer) -> Nav {
    let mut nav = Nav::for_viewer("Mail", MAIL, viewer);
    if viewer.is_authenticated() {
        nav.links = vec![NavLink::new(format!("{}/logout", MAIL), "Log Out")];
    } else {
        nav.links = vec![
            NavLink::new(format!("{}/login", MAIL), "Log In"),
            NavLink::new(format!("{}/register", MAIL), "Register"),
        ];
    }
    nav
}

async fn index(Extension(viewer): Extension<Viewer>) -> Result<Response, PageError> {
    let user = SITE.require_user(&viewer)?;
    Ok(render(&MailTemplate {
        nav: nav(&viewer),
        username: user.username.clone(),
    })?
    .into_response())
}

// -- Accounts --

async fn login_page(Extension(viewer): Extension<Viewer>) -> Result<Response, PageError> {
    auth::login_page(&SITE, &viewer)
}

async fn login(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    auth::login(&state, &SITE, &viewer, jar, form).await
}

async fn logout(jar: CookieJar) -> Response {
    auth::logout(&SITE, jar)
}

async fn register_page(Extension(viewer): Extension<Viewer>) -> Result<Response, PageError> {
    auth::register_page(&SITE, &viewer)
}

async fn register(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    auth::register(&state, &SITE, &viewer, jar, form).await
}

// -- JSON API --

fn email_view(row: EmailRow) -> EmailView {
    EmailView {
        id: row.id,
        timestamp: display_time(&row.created_at),
        sender: row.sender_username,
        recipients: row.recipients,
        subject: row.subject,
        body: row.body,
        read: row.read,
        archived: row.archived,
    }
}

fn parse_body<B: DeserializeOwned>(body: &Bytes) -> Result<B, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid JSON body."))
}

fn email_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Email not found.")
}

async fn compose(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    method: Method,
    body: Bytes,
) -> Result<Response, ApiError> {
    if method != Method::POST {
        return Err(ApiError::bad_request("POST request required."));
    }
    let user = auth::api_user(&viewer)?;

    let request: ComposeRequest = parse_body(&body)?;
    let recipients = request.recipient_names().map_err(|e| ApiError::bad_request(e.to_string()))?;
    request.validate().map_err(|e| ApiError::bad_request(e.to_string()))?;

    let sender_id = user.id.to_string();
    let subject = request.subject.unwrap_or_default();
    let text = request.body.unwrap_or_default();
    let ids = blocking(&state, move |db| db.send_email(&sender_id, &recipients, &subject, &text))
        .await?;
    info!("User '{}' sent mail ({} copies)", user.username, ids.len());

    Ok((StatusCode::CREATED, Json(ApiMessage::success("Email sent successfully."))).into_response())
}

/// `GET /emails/{id}` reads one message and `PUT /emails/{id}` changes its
/// flags; `GET /emails/{mailbox}` lists a mailbox. Numeric keys are ids.
async fn email_or_mailbox(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    method: Method,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if method != Method::GET && method != Method::PUT {
        return Err(ApiError::bad_request("GET or PUT request required."));
    }
    let user_id = auth::api_user(&viewer)?.id.to_string();

    let Some(email_id) = parse_id(&key) else {
        if method == Method::PUT {
            return Err(email_not_found());
        }
        let mailbox = Mailbox::parse(&key).ok_or_else(|| ApiError::bad_request("Invalid mailbox."))?;
        let rows = blocking(&state, move |db| db.mailbox(&user_id, mailbox)).await?;
        let emails: Vec<EmailView> = rows.into_iter().map(email_view).collect();
        return Ok(Json(emails).into_response());
    };

    if method == Method::PUT {
        let flags: EmailFlags = parse_body(&body)?;
        blocking(&state, move |db| {
            db.set_email_flags(&user_id, email_id, flags.read, flags.archived)
        })
        .await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let row = blocking(&state, move |db| db.get_email(&user_id, email_id)).await?;
    let row = row.ok_or_else(email_not_found)?;
    Ok(Json(email_view(row)).into_response())
}
