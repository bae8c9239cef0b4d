use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user whose session cookie was verified for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// Who is making the request. Resolved once per request by the session
/// middleware and handed to every handler by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewer {
    Authenticated(AuthUser),
    #[default]
    Anonymous,
}

impl Viewer {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn id(&self) -> Option<Uuid> {
        self.user().map(|u| u.id)
    }

    pub fn username(&self) -> Option<&str> {
        self.user().map(|u| u.username.as_str())
    }

    /// Whether this viewer is the given user.
    pub fn is(&self, user_id: &Uuid) -> bool {
        self.id().as_ref() == Some(user_id)
    }
}

/// One of a user's mail folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mailbox {
    /// Received and not archived.
    Inbox,
    /// Written by the user.
    Sent,
    /// Received and archived.
    Archive,
}

impl Mailbox {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "inbox" => Some(Self::Inbox),
            "sent" => Some(Self::Sent),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }
}
