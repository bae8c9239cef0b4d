//! The auction site: listings, bids, comments, watch lists and categories.

use axum::{
    Extension, Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use agora_db::DbError;
use agora_db::auctions::minimum_bid;
use agora_db::models::{BidRow, CommentRow, ListingRow};
use agora_types::forms::{BidForm, CategoryForm, CommentForm, LoginForm, NewListingForm, RegisterForm};
use agora_types::models::Viewer;

use crate::auth::{self, Site};
use crate::error::PageError;
use crate::templates::{
    CategoriesTemplate, ListingCard, ListingTemplate, ListingsTemplate, Nav, NavLink,
    NewListingTemplate, render,
};
use crate::{AppState, COMMERCE, blocking, parse_id};

const SITE: Site = Site {
    prefix: COMMERCE,
    login: "/commerce/login",
    show_nickname: true,
    nav,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/register", get(register_page).post(register))
        .route("/new", get(new_form).post(create))
        .route("/listing/{id}", get(listing))
        .route("/bid", post(bid))
        .route("/comment", post(comment))
        .route("/watch", get(watchlist))
        .route("/addwatch/{id}", get(add_watch))
        .route("/delwatch/{id}", get(remove_watch))
        .route("/close/{id}", get(close))
        .route("/categories", get(categories).post(category_listings))
}

fn nav(viewer: &Viewer) -> Nav {
    let mut nav = Nav::for_viewer("Auctions", COMMERCE, viewer);
    nav.links = vec![
        NavLink::new(COMMERCE, "All Listings"),
        NavLink::new(format!("{}/categories", COMMERCE), "Categories"),
    ];
    if viewer.is_authenticated() {
        nav.links.push(NavLink::new(format!("{}/watch", COMMERCE), "Watchlist"));
        nav.links.push(NavLink::new(format!("{}/new", COMMERCE), "Create Listing"));
        nav.links.push(NavLink::new(format!("{}/logout", COMMERCE), "Log Out"));
    } else {
        nav.links.push(NavLink::new(format!("{}/login", COMMERCE), "Log In"));
        nav.links.push(NavLink::new(format!("{}/register", COMMERCE), "Register"));
    }
    nav
}

fn listing_href(id: i64) -> String {
    format!("{}/listing/{}", COMMERCE, id)
}

/// Listing id from the URL. A segment that is not a number names no listing.
fn listing_id(raw: &str) -> Result<i64, PageError> {
    parse_id(raw).ok_or_else(|| PageError::NotFound("No such listing.".into()))
}

fn cards(rows: &[ListingRow]) -> Vec<ListingCard> {
    rows.iter().map(ListingCard::from).collect()
}

fn listings_page(viewer: &Viewer, heading: &str, rows: &[ListingRow]) -> Result<Response, PageError> {
    Ok(render(&ListingsTemplate {
        nav: nav(viewer),
        heading: heading.to_string(),
        listings: cards(rows),
    })?
    .into_response())
}

async fn index(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Response, PageError> {
    let rows = blocking(&state, |db| db.list_listings()).await?;
    listings_page(&viewer, "All Listings", &rows)
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

// -- Listings --

async fn new_listing_page(
    state: &AppState,
    viewer: &Viewer,
    status: StatusCode,
    message: String,
) -> Result<Response, PageError> {
    let categories = blocking(state, |db| db.list_categories()).await?;
    let page = render(&NewListingTemplate {
        nav: nav(viewer),
        categories,
        message,
    })?;
    Ok((status, page).into_response())
}

async fn new_form(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Response, PageError> {
    SITE.require_user(&viewer)?;
    new_listing_page(&state, &viewer, StatusCode::OK, String::new()).await
}

async fn create(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<NewListingForm>,
) -> Result<Response, PageError> {
    let user = SITE.require_user(&viewer)?;

    let listing = match form.validate() {
        Ok(listing) => listing,
        Err(e) => return new_listing_page(&state, &viewer, StatusCode::BAD_REQUEST, e.to_string()).await,
    };

    let owner_id = user.id.to_string();
    let id = blocking(&state, move |db| db.create_listing(&owner_id, &listing)).await?;
    info!("User '{}' created listing {}", user.username, id);

    Ok(Redirect::to(COMMERCE).into_response())
}

/// Everything the listing page shows. Loading it never writes.
struct ListingDetail {
    listing: ListingRow,
    highest: Option<BidRow>,
    bid_count: u64,
    comments: Vec<CommentRow>,
    watching: bool,
}

async fn load_listing(state: &AppState, viewer: &Viewer, id: i64) -> Result<ListingDetail, PageError> {
    let viewer_id = viewer.id().map(|id| id.to_string());
    blocking(state, move |db| {
        let listing = db.get_listing(id)?.ok_or(DbError::NotFound("listing"))?;
        let watching = match &viewer_id {
            Some(user_id) => db.is_watching(user_id, id)?,
            None => false,
        };
        Ok(ListingDetail {
            highest: db.highest_bid(id)?,
            bid_count: db.bid_count(id)?,
            comments: db.comments_for_listing(id)?,
            watching,
            listing,
        })
    })
    .await
    .map_err(PageError::from)
}

async fn listing_page(
    state: &AppState,
    viewer: &Viewer,
    id: i64,
    status: StatusCode,
    message: String,
) -> Result<Response, PageError> {
    let detail = load_listing(state, viewer, id).await?;
    let listing = detail.listing;
    let highest_amount = detail.highest.as_ref().map(|b| b.amount);

    let page = render(&ListingTemplate {
        nav: nav(viewer),
        id: listing.id,
        is_owner: viewer.username() == Some(listing.owner_username.as_str()),
        viewer_is_highest: detail
            .highest
            .as_ref()
            .is_some_and(|b| viewer.username() == Some(b.bidder_username.as_str())),
        highest_bidder: detail.highest.map(|b| b.bidder_username).unwrap_or_default(),
        title: listing.title,
        description: listing.description,
        image_url: listing.image_url.unwrap_or_default(),
        category: listing.category_name,
        owner: listing.owner_username,
        active: listing.active,
        starting_price: listing.starting_price.to_string(),
        current_price: listing.current_price.to_string(),
        minimum_bid: minimum_bid(listing.starting_price, highest_amount).to_string(),
        bid_count: detail.bid_count,
        is_watching: detail.watching,
        comments: detail.comments.iter().map(Into::into).collect(),
        message,
    })?;
    Ok((status, page).into_response())
}

async fn listing(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    let id = listing_id(&id)?;
    listing_page(&state, &viewer, id, StatusCode::OK, String::new()).await
}

async fn bid(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<BidForm>,
) -> Result<Response, PageError> {
    let user = SITE.require_user(&viewer)?;
    let listing_id = form.listing_id().map_err(|e| PageError::BadRequest(e.to_string()))?;

    let amount = match form.amount() {
        Ok(amount) => amount,
        Err(e) => return listing_page(&state, &viewer, listing_id, StatusCode::BAD_REQUEST, e.to_string()).await,
    };

    let bidder_id = user.id.to_string();
    let placed = blocking(&state, move |db| match db.place_bid(listing_id, &bidder_id, amount) {
        Ok(price) => Ok(Ok(price)),
        Err(DbError::Rejected(msg)) => Ok(Err(msg)),
        Err(e) => Err(e),
    })
    .await?;

    match placed {
        Ok(price) => {
            info!("User '{}' bid ${} on listing {}", user.username, price, listing_id);
            Ok(Redirect::to(&listing_href(listing_id)).into_response())
        }
        Err(msg) => {
            warn!("Bid by '{}' on listing {} rejected: {}", user.username, listing_id, msg);
            listing_page(&state, &viewer, listing_id, StatusCode::BAD_REQUEST, msg).await
        }
    }
}

async fn comment(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    let user = SITE.require_user(&viewer)?;
    let listing_id = form.listing_id().map_err(|e| PageError::BadRequest(e.to_string()))?;

    if let Err(e) = form.validate() {
        return listing_page(&state, &viewer, listing_id, StatusCode::BAD_REQUEST, e.to_string()).await;
    }

    let author_id = user.id.to_string();
    let content = form.content.trim().to_string();
    blocking(&state, move |db| db.add_comment(listing_id, &author_id, &content)).await?;

    Ok(Redirect::to(&listing_href(listing_id)).into_response())
}

// -- Watch list --

async fn watchlist(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Response, PageError> {
    let user_id = SITE.require_user(&viewer)?.id.to_string();
    let rows = blocking(&state, move |db| db.watchlist(&user_id)).await?;
    listings_page(&viewer, "Watchlist", &rows)
}

async fn add_watch(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    let id = listing_id(&id)?;
    let user_id = SITE.require_user(&viewer)?.id.to_string();
    blocking(&state, move |db| db.add_watch(&user_id, id)).await?;
    Ok(Redirect::to(&listing_href(id)).into_response())
}

async fn remove_watch(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    let id = listing_id(&id)?;
    let user_id = SITE.require_user(&viewer)?.id.to_string();
    blocking(&state, move |db| db.remove_watch(&user_id, id)).await?;
    Ok(Redirect::to(&listing_href(id)).into_response())
}

async fn close(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    let id = listing_id(&id)?;
    let user = SITE.require_user(&viewer)?;
    let user_id = user.id.to_string();
    blocking(&state, move |db| db.close_listing(id, &user_id)).await?;
    info!("User '{}' closed listing {}", user.username, id);
    Ok(Redirect::to(&listing_href(id)).into_response())
}

// -- Categories --

async fn categories(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Response, PageError> {
    let categories = blocking(&state, |db| db.list_categories()).await?;
    Ok(render(&CategoriesTemplate {
        nav: nav(&viewer),
        categories,
        selected: String::new(),
        listings: vec![],
    })?
    .into_response())
}

async fn category_listings(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, PageError> {
    let category_id = form.category_id().map_err(|e| PageError::BadRequest(e.to_string()))?;

    let (categories, selected, rows) = blocking(&state, move |db| {
        let selected = db.get_category(category_id)?.ok_or(DbError::NotFound("category"))?;
        Ok((db.list_categories()?, selected, db.listings_in_category(category_id)?))
    })
    .await?;

    Ok(render(&CategoriesTemplate {
        nav: nav(&viewer),
        categories,
        selected: selected.name,
        listings: cards(&rows),
    })?
    .into_response())
}
