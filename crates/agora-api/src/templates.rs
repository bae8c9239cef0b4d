//! Page templates and the view structs they render.
//!
//! Templates live in `templates/` and extend `base.html`, which draws the
//! site header from the `nav` field every page carries.

use askama::Template;
use axum::response::Html;
use tracing::error;

use agora_db::models::{CategoryRow, CommentRow, ListingRow, PostRow};
use agora_types::PageWindow;
use agora_types::models::Viewer;

use crate::error::PageError;
use crate::{COMMERCE, NETWORK, path_segment};

pub fn render<T: Template>(template: &T) -> Result<Html<String>, PageError> {
    template.render().map(Html).map_err(|e| {
        error!("Template rendering failed: {}", e);
        PageError::Internal
    })
}

/// Human-readable form of a stored RFC 3339 timestamp.
pub fn display_time(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.format("%b %-d %Y, %-I:%M %p").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

// -- Layout --

#[derive(Debug, Clone)]
pub struct NavLink {
    pub href: String,
    pub label: String,
}

impl NavLink {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self { href: href.into(), label: label.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Nav {
    pub site_name: &'static str,
    pub home: &'static str,
    pub signed_in: bool,
    pub username: String,
    pub links: Vec<NavLink>,
    /// Form action of the header search box; empty hides the box.
    pub search_action: &'static str,
}

impl Nav {
    /// Header for pages that belong to no particular app.
    pub fn plain() -> Self {
        Self {
            site_name: "Agora",
            home: "/",
            signed_in: false,
            username: String::new(),
            links: vec![],
            search_action: "",
        }
    }

    pub fn for_viewer(site_name: &'static str, home: &'static str, viewer: &Viewer) -> Self {
        Self {
            site_name,
            home,
            signed_in: viewer.is_authenticated(),
            username: viewer.username().unwrap_or_default().to_string(),
            links: vec![],
            search_action: "",
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub apps: Vec<NavLink>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: Nav,
    pub status: u16,
    pub title: String,
    pub message: String,
}

// -- Accounts --

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub message: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub message: String,
    pub show_nickname: bool,
}

// -- Encyclopedia --

#[derive(Template)]
#[template(path = "encyclopedia/index.html")]
pub struct WikiIndexTemplate {
    pub nav: Nav,
    pub entries: Vec<NavLink>,
}

#[derive(Template)]
#[template(path = "encyclopedia/entry.html")]
pub struct WikiEntryTemplate {
    pub nav: Nav,
    pub title: String,
    pub content_html: String,
}

#[derive(Template)]
#[template(path = "encyclopedia/edit.html")]
pub struct WikiEditTemplate {
    pub nav: Nav,
    pub title: String,
    pub content: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "encyclopedia/new.html")]
pub struct WikiNewTemplate {
    pub nav: Nav,
    pub title: String,
    pub content: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "encyclopedia/search.html")]
pub struct WikiSearchTemplate {
    pub nav: Nav,
    pub query: String,
    pub candidates: Vec<NavLink>,
}

// -- Commerce --

/// A listing as shown in a list of listings.
#[derive(Debug, Clone)]
pub struct ListingCard {
    pub href: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub category: String,
    pub active: bool,
}

impl From<&ListingRow> for ListingCard {
    fn from(row: &ListingRow) -> Self {
        Self {
            href: format!("{}/listing/{}", COMMERCE, row.id),
            title: row.title.clone(),
            description: row.description.clone(),
            price: row.current_price.to_string(),
            image_url: row.image_url.clone().unwrap_or_default(),
            category: row.category_name.clone(),
            active: row.active,
        }
    }
}

#[derive(Template)]
#[template(path = "commerce/index.html")]
pub struct ListingsTemplate {
    pub nav: Nav,
    pub heading: String,
    pub listings: Vec<ListingCard>,
}

#[derive(Template)]
#[template(path = "commerce/new.html")]
pub struct NewListingTemplate {
    pub nav: Nav,
    pub categories: Vec<CategoryRow>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub author: String,
    pub content: String,
    pub created_at: String,
}

impl From<&CommentRow> for CommentView {
    fn from(row: &CommentRow) -> Self {
        Self {
            author: row.author_username.clone(),
            content: row.content.clone(),
            created_at: display_time(&row.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "commerce/listing.html")]
pub struct ListingTemplate {
    pub nav: Nav,
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub owner: String,
    pub active: bool,
    pub starting_price: String,
    pub current_price: String,
    pub minimum_bid: String,
    pub bid_count: u64,
    pub highest_bidder: String,
    pub viewer_is_highest: bool,
    pub is_owner: bool,
    pub is_watching: bool,
    pub comments: Vec<CommentView>,
    pub message: String,
}

#[derive(Template)]
#[template(path = "commerce/categories.html")]
pub struct CategoriesTemplate {
    pub nav: Nav,
    pub categories: Vec<CategoryRow>,
    pub selected: String,
    pub listings: Vec<ListingCard>,
}

// -- Network --

#[derive(Debug, Clone)]
pub struct PostView {
    pub id: i64,
    pub owner: String,
    pub owner_href: String,
    pub content: String,
    pub likes: i64,
    pub created_at: String,
    pub liked: bool,
    pub editable: bool,
}

impl PostView {
    pub fn new(row: &PostRow, viewer: &Viewer) -> Self {
        Self {
            id: row.id,
            owner: row.owner_username.clone(),
            owner_href: format!("{}/profile/{}", NETWORK, path_segment(&row.owner_username)),
            content: row.content.clone(),
            likes: row.likes,
            created_at: display_time(&row.created_at),
            liked: row.liked,
            editable: viewer.username() == Some(row.owner_username.as_str()),
        }
    }
}

#[derive(Template)]
#[template(path = "network/feed.html")]
pub struct FeedTemplate {
    pub nav: Nav,
    pub heading: String,
    pub show_form: bool,
    pub message: String,
    pub posts: Vec<PostView>,
    pub page: PageWindow,
    pub page_base: String,
}

#[derive(Template)]
#[template(path = "network/profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub owner: String,
    pub following: u64,
    pub followers: u64,
    pub can_follow: bool,
    pub is_following: bool,
    pub follow_href: String,
    pub unfollow_href: String,
    pub posts: Vec<PostView>,
    pub page: PageWindow,
    pub page_base: String,
}

// -- Mail --

/// The mail page. Mailboxes and messages are loaded by its script.
#[derive(Template)]
#[template(path = "mail/inbox.html")]
pub struct MailTemplate {
    pub nav: Nav,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_time_formats_rfc3339() {
        assert_eq!(display_time("2026-10-16T14:05:00.000000Z"), "Oct 16 2026, 2:05 PM");
        assert_eq!(display_time("garbage"), "garbage");
    }
}
