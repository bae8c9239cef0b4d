//! Database row types. Each maps directly to a SQLite row.
//! Owned values only; related rows are fetched by explicit queries.

use agora_types::Cents;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub nickname: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ListingRow {
    pub id: i64,
    pub owner_id: String,
    pub owner_username: String,
    pub title: String,
    pub description: String,
    pub starting_price: Cents,
    pub current_price: Cents,
    pub category_id: i64,
    pub category_name: String,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct BidRow {
    pub id: i64,
    pub listing_id: i64,
    pub bidder_id: String,
    pub bidder_username: String,
    pub amount: Cents,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub listing_id: i64,
    pub author_username: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub owner_id: String,
    pub owner_username: String,
    pub content: String,
    pub likes: i64,
    pub created_at: String,
    /// Whether the requesting user has liked this post.
    pub liked: bool,
}

impl PostRow {
    /// A like count can never drop below zero.
    pub fn valid_like(&self) -> bool {
        self.likes >= 0
    }
}

/// Directed edge: `follower_id` follows `followee_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowRow {
    pub follower_id: String,
    pub followee_id: String,
}

impl FollowRow {
    pub fn new(follower_id: impl Into<String>, followee_id: impl Into<String>) -> Self {
        Self {
            follower_id: follower_id.into(),
            followee_id: followee_id.into(),
        }
    }

    /// Users may not follow themselves.
    pub fn valid_follow(&self) -> bool {
        self.follower_id != self.followee_id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowCounts {
    pub following: u64,
    pub followers: u64,
}

/// One user's copy of a message. Sending writes a copy for the sender and for
/// each recipient, so read and archive flags are per user.
#[derive(Debug, Clone)]
pub struct EmailRow {
    pub id: i64,
    pub owner_id: String,
    pub sender_username: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub archived: bool,
    pub created_at: String,
}
