//! Form bodies submitted by the HTML pages, with their field constraints.
//!
//! Every field deserializes as a string (missing fields default to empty) so
//! that a bad submission re-renders the form with a message instead of being
//! rejected by the extractor.

use serde::Deserialize;
use thiserror::Error;

use crate::money::{Cents, MoneyError};

pub const WIKI_TITLE_MAX: usize = 10;
pub const LISTING_TITLE_MAX: usize = 20;
pub const LISTING_DESCRIPTION_MAX: usize = 128;
pub const NICKNAME_MAX: usize = 64;
pub const USERNAME_MAX: usize = 150;
pub const EMAIL_SUBJECT_MAX: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required.")]
    Required(&'static str),
    #[error("{field} must be at most {max} characters.")]
    TooLong { field: &'static str, max: usize },
    #[error("Passwords must match.")]
    PasswordMismatch,
    #[error("Invalid price: {0}.")]
    Money(#[from] MoneyError),
    #[error("{0}")]
    Invalid(String),
}

pub(crate) fn required(field: &'static str, value: &str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        return Err(FormError::Required(field));
    }
    Ok(())
}

pub(crate) fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), FormError> {
    if value.chars().count() > max {
        return Err(FormError::TooLong { field, max });
    }
    Ok(())
}

fn parse_id(field: &'static str, value: &str) -> Result<i64, FormError> {
    required(field, value)?;
    value
        .trim()
        .parse()
        .map_err(|_| FormError::Invalid(format!("{} is not a valid id.", field)))
}

// -- Accounts --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub nickname: String,
    pub password: String,
    pub confirmation: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FormError> {
        required("Username", &self.username)?;
        max_len("Username", &self.username, USERNAME_MAX)?;
        max_len("Nickname", &self.nickname, NICKNAME_MAX)?;
        required("Password", &self.password)?;
        if self.password != self.confirmation {
            return Err(FormError::PasswordMismatch);
        }
        Ok(())
    }

    /// Nickname to store; blank submissions keep the historical default.
    pub fn nickname_or_default(&self) -> &str {
        let nick = self.nickname.trim();
        if nick.is_empty() { "None" } else { nick }
    }
}

// -- Encyclopedia --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewPageForm {
    pub title: String,
    pub content: String,
}

impl NewPageForm {
    pub fn validate(&self) -> Result<(), FormError> {
        required("Title", &self.title)?;
        max_len("Title", self.title.trim(), WIKI_TITLE_MAX)?;
        required("Content", &self.content)?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EditPageForm {
    pub title: String,
    pub content: String,
}

impl EditPageForm {
    pub fn validate(&self) -> Result<(), FormError> {
        required("Title", &self.title)?;
        required("Content", &self.content)?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub q: String,
}

// -- Commerce --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewListingForm {
    pub title: String,
    pub description: String,
    pub price: String,
    pub url: String,
    pub category: String,
}

/// A listing submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub starting_price: Cents,
    pub image_url: Option<String>,
    pub category_id: i64,
}

impl NewListingForm {
    pub fn validate(&self) -> Result<NewListing, FormError> {
        required("Title", &self.title)?;
        max_len("Title", self.title.trim(), LISTING_TITLE_MAX)?;
        required("Description", &self.description)?;
        max_len("Description", self.description.trim(), LISTING_DESCRIPTION_MAX)?;
        let starting_price: Cents = self.price.parse()?;

        let url = self.url.trim();
        let image_url = if url.is_empty() {
            None
        } else if url.starts_with("http://") || url.starts_with("https://") {
            Some(url.to_string())
        } else {
            return Err(FormError::Invalid("Image URL must start with http:// or https://.".into()));
        };

        let category_id = parse_id("Category", &self.category)?;

        Ok(NewListing {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            starting_price,
            image_url,
            category_id,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BidForm {
    pub listing_id: String,
    pub bid: String,
}

impl BidForm {
    pub fn listing_id(&self) -> Result<i64, FormError> {
        parse_id("Listing", &self.listing_id)
    }

    pub fn amount(&self) -> Result<Cents, FormError> {
        Ok(self.bid.parse()?)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub listing_id: String,
    pub content: String,
}

impl CommentForm {
    pub fn listing_id(&self) -> Result<i64, FormError> {
        parse_id("Listing", &self.listing_id)
    }

    pub fn validate(&self) -> Result<(), FormError> {
        required("Comment", &self.content)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub category: String,
}

impl CategoryForm {
    pub fn category_id(&self) -> Result<i64, FormError> {
        parse_id("Category", &self.category)
    }
}

// -- Network --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewPostForm {
    pub content: String,
}

impl NewPostForm {
    pub fn validate(&self) -> Result<(), FormError> {
        required("Post", &self.content)
    }
}

/// `?page=` on paginated feeds. Kept raw; see `PageWindow::resolve`.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}
