//! The social network: a paginated post feed, profiles, follows, and the JSON
//! endpoints the feed page calls to like and edit posts.

use axum::{
    Extension, Form, Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get},
};
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;
use tracing::info;

use agora_db::models::FollowRow;
use agora_db::network::Feed;
use agora_db::DbError;
use agora_types::api::{ApiMessage, EditPostRequest, LikeRequest};
use agora_types::forms::{LoginForm, NewPostForm, PageQuery, RegisterForm};
use agora_types::models::{AuthUser, Viewer};

use crate::auth::{self, Site};
use crate::error::{ApiError, PageError};
use crate::templates::{FeedTemplate, Nav, NavLink, PostView, ProfileTemplate, render};
use crate::{AppState, NETWORK, blocking, parse_id, path_segment};

const SITE: Site = Site {
    prefix: NETWORK,
    login: "/network/login",
    show_nickname: false,
    nav,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create_post))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/register", get(register_page).post(register))
        .route("/profile/{username}", get(profile))
        .route("/follow/{username}", get(follow))
        .route("/unfollow/{username}", get(unfollow))
        .route("/following", get(following))
        .route("/edit/{post_id}", any(edit_post))
        .route("/like/{post_id}", any(like_post))
}

fn nav(viewer: &Viewer) -> Nav {
    let mut nav = Nav::for_viewer("Network", NETWORK, viewer);
    nav.links = vec![NavLink::new(NETWORK, "All Posts")];
    match viewer.username() {
        Some(username) => {
            nav.links.push(NavLink::new(profile_href(username), username));
            nav.links.push(NavLink::new(format!("{}/following", NETWORK), "Following"));
            nav.links.push(NavLink::new(format!("{}/logout", NETWORK), "Log Out"));
        }
        None => {
            nav.links.push(NavLink::new(format!("{}/login", NETWORK), "Log In"));
            nav.links.push(NavLink::new(format!("{}/register", NETWORK), "Register"));
        }
    }
    nav
}

fn profile_href(username: &str) -> String {
    format!("{}/profile/{}", NETWORK, path_segment(username))
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

// -- Feeds --

struct FeedPage<'a> {
    heading: &'a str,
    feed: Feed,
    page_base: String,
    show_form: bool,
}

async fn feed_page(
    state: &AppState,
    viewer: &Viewer,
    source: FeedPage<'_>,
    raw_page: Option<String>,
    status: StatusCode,
    message: String,
) -> Result<Response, PageError> {
    let viewer_id = viewer.id().map(|id| id.to_string());
    let feed = source.feed;
    let page = blocking(state, move |db| {
        db.feed_page(&feed, viewer_id.as_deref(), raw_page.as_deref())
    })
    .await?;

    let body = render(&FeedTemplate {
        nav: nav(viewer),
        heading: source.heading.to_string(),
        show_form: source.show_form,
        message,
        posts: page.items.iter().map(|row| PostView::new(row, viewer)).collect(),
        page: page.window,
        page_base: source.page_base,
    })?;
    Ok((status, body).into_response())
}

fn all_posts(viewer: &Viewer) -> FeedPage<'static> {
    FeedPage {
        heading: "All Posts",
        feed: Feed::All,
        page_base: format!("{}?page=", NETWORK),
        show_form: viewer.is_authenticated(),
    }
}

async fn index(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    feed_page(&state, &viewer, all_posts(&viewer), query.page, StatusCode::OK, String::new()).await
}

async fn create_post(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<NewPostForm>,
) -> Result<Response, PageError> {
    let user = SITE.require_user(&viewer)?;

    if let Err(e) = form.validate() {
        return feed_page(&state, &viewer, all_posts(&viewer), None, StatusCode::BAD_REQUEST, e.to_string())
            .await;
    }

    let owner_id = user.id.to_string();
    let content = form.content.trim().to_string();
    let id = blocking(&state, move |db| db.create_post(&owner_id, &content)).await?;
    info!("User '{}' created post {}", user.username, id);

    Ok(Redirect::to(NETWORK).into_response())
}

async fn following(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let user = SITE.require_user(&viewer)?;
    let source = FeedPage {
        heading: "Following",
        feed: Feed::FollowedBy(user.id.to_string()),
        page_base: format!("{}/following?page=", NETWORK),
        show_form: false,
    };
    feed_page(&state, &viewer, source, query.page, StatusCode::OK, String::new()).await
}

// -- Profiles --

async fn profile(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let viewer_id = viewer.id().map(|id| id.to_string());
    let (owner, counts, is_following, page) = blocking(&state, move |db| {
        let owner = db.get_user_by_username(&username)?.ok_or(DbError::NotFound("user"))?;
        let counts = db.follow_counts(&owner.id)?;
        let is_following = match &viewer_id {
            Some(id) => db.is_following(&FollowRow::new(id.as_str(), owner.id.as_str()))?,
            None => false,
        };
        let page = db.feed_page(
            &Feed::ByOwner(owner.id.clone()),
            viewer_id.as_deref(),
            query.page.as_deref(),
        )?;
        Ok((owner, counts, is_following, page))
    })
    .await?;

    let own_profile = viewer.username() == Some(owner.username.as_str());
    let segment = path_segment(&owner.username);

    Ok(render(&ProfileTemplate {
        nav: nav(&viewer),
        following: counts.following,
        followers: counts.followers,
        can_follow: viewer.is_authenticated() && !own_profile,
        is_following,
        follow_href: format!("{}/follow/{}", NETWORK, segment),
        unfollow_href: format!("{}/unfollow/{}", NETWORK, segment),
        posts: page.items.iter().map(|row| PostView::new(row, &viewer)).collect(),
        page: page.window,
        page_base: format!("{}?page=", profile_href(&owner.username)),
        owner: owner.username,
    })?
    .into_response())
}

/// Resolves the target of a follow change, refusing unknown users.
async fn follow_edge(state: &AppState, user: &AuthUser, username: &str) -> Result<FollowRow, PageError> {
    let lookup = username.to_string();
    let target = blocking(state, move |db| db.get_user_by_username(&lookup)).await?;
    let target = target.ok_or_else(|| PageError::NotFound("No such user.".into()))?;
    Ok(FollowRow::new(user.id.to_string(), target.id))
}

async fn follow(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
) -> Result<Response, PageError> {
    let user = SITE.require_user(&viewer)?;
    let edge = follow_edge(&state, user, &username).await?;
    blocking(&state, move |db| db.follow(&edge)).await?;
    Ok(Redirect::to(&profile_href(&username)).into_response())
}

async fn unfollow(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
) -> Result<Response, PageError> {
    let user = SITE.require_user(&viewer)?;
    let edge = follow_edge(&state, user, &username).await?;
    blocking(&state, move |db| db.unfollow(&edge)).await?;
    Ok(Redirect::to(&profile_href(&username)).into_response())
}

// -- JSON API --

/// Checks shared by the post endpoints, in order: PUT only, signed in, the
/// post exists, and the body parses. Clients need not send a content type.
/// An id that is not a number names no post.
async fn api_request<'v, B: DeserializeOwned>(
    state: &AppState,
    method: &Method,
    viewer: &'v Viewer,
    raw_id: &str,
    body: &Bytes,
) -> Result<(&'v AuthUser, i64, B), ApiError> {
    if *method != Method::PUT {
        return Err(ApiError::bad_request("PUT request required."));
    }
    let user = auth::api_user(viewer)?;

    let post_not_found = || ApiError::new(StatusCode::NOT_FOUND, "Post not found.");
    let post_id = parse_id(raw_id).ok_or_else(post_not_found)?;
    let exists = blocking(state, move |db| db.get_post(post_id, None)).await?;
    if exists.is_none() {
        return Err(post_not_found());
    }

    let request = serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid JSON body."))?;
    Ok((user, post_id, request))
}

async fn like_post(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    method: Method,
    Path(post_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiMessage>, ApiError> {
    let (user, post_id, request) =
        api_request::<LikeRequest>(&state, &method, &viewer, &post_id, &body).await?;
    let like = request.like.ok_or_else(|| ApiError::bad_request("Field 'like' is required."))?;

    let user_id = user.id.to_string();
    let likes = blocking(&state, move |db| db.set_like(&user_id, post_id, like)).await?;

    let verb = if like { "liked" } else { "unliked" };
    Ok(Json(ApiMessage::success(format!("Post {} {}, {} likes.", post_id, verb, likes))))
}

async fn edit_post(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    method: Method,
    Path(post_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiMessage>, ApiError> {
    let (user, post_id, request) =
        api_request::<EditPostRequest>(&state, &method, &viewer, &post_id, &body).await?;
    let content = request
        .content
        .ok_or_else(|| ApiError::bad_request("Field 'content' is required."))?;

    let user_id = user.id.to_string();
    blocking(&state, move |db| db.update_post_content(post_id, &user_id, &content)).await?;
    info!("User '{}' edited post {}", user.username, post_id);

    Ok(Json(ApiMessage::success("Post updated.")))
}
