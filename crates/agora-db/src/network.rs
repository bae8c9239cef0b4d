use agora_types::{Page, PageWindow, POSTS_PER_PAGE};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, TransactionBehavior};
use tracing::{info, warn};

use crate::models::{FollowCounts, FollowRow, PostRow};
use crate::{Database, DbError, OptionalExt, Result, now_timestamp};

/// Post columns plus a `liked` flag for the bound viewer id (first `?`).
const POST_SELECT: &str = "
    SELECT p.id, p.owner_id, u.username, p.content, p.likes, p.created_at,
           EXISTS(SELECT 1 FROM likes k WHERE k.post_id = p.id AND k.user_id = ?) AS liked
    FROM posts p
    JOIN users u ON u.id = p.owner_id";

/// Which posts a feed page draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// Every post.
    All,
    /// Posts written by one user.
    ByOwner(String),
    /// Posts written by anyone the given user follows.
    FollowedBy(String),
}

impl Feed {
    fn filter(&self) -> (&'static str, Vec<Value>) {
        match self {
            Self::All => ("1 = 1", vec![]),
            Self::ByOwner(owner) => ("p.owner_id = ?", vec![Value::Text(owner.clone())]),
            Self::FollowedBy(user) => (
                "p.owner_id IN (SELECT followee_id FROM follows WHERE follower_id = ?)",
                vec![Value::Text(user.clone())],
            ),
        }
    }
}

impl Database {
    // -- Posts --

    pub fn create_post(&self, owner_id: &str, content: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (owner_id, content, created_at) VALUES (?1, ?2, ?3)",
                (owner_id, content, now_timestamp()),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, post_id: i64, viewer_id: Option<&str>) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.id = ?", POST_SELECT);
            conn.query_row(&sql, rusqlite::params![viewer_id.unwrap_or(""), post_id], map_post)
                .optional()
        })
    }

    /// One page of a feed, newest first (ties broken by id).
    pub fn feed_page(
        &self,
        feed: &Feed,
        viewer_id: Option<&str>,
        raw_page: Option<&str>,
    ) -> Result<Page<PostRow>> {
        let (clause, filter_args) = feed.filter();

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM posts p WHERE {}", clause),
                rusqlite::params_from_iter(filter_args.iter()),
                |r| r.get(0),
            )?;
            let window = PageWindow::resolve(raw_page, total.max(0) as u64, POSTS_PER_PAGE);

            let mut args = Vec::with_capacity(filter_args.len() + 3);
            args.push(Value::Text(viewer_id.unwrap_or("").to_string()));
            args.extend(filter_args.iter().cloned());
            args.push(Value::Integer(window.limit() as i64));
            args.push(Value::Integer(window.offset() as i64));

            let sql = format!(
                "{} WHERE {} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
                POST_SELECT, clause
            );
            let items = query_posts(conn, &sql, &args)?;
            Ok(Page::new(items, window))
        })
    }

    /// Overwrites a post's content. Only the owner may edit.
    pub fn update_post_content(&self, post_id: i64, editor_id: &str, content: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let owner: String = conn
                .query_row("SELECT owner_id FROM posts WHERE id = ?1", [post_id], |r| r.get(0))
                .optional()?
                .ok_or(DbError::NotFound("post"))?;
            if owner != editor_id {
                warn!("User {} tried to edit post {} owned by {}", editor_id, post_id, owner);
                return Err(DbError::Forbidden("only the author can edit this post".into()));
            }
            conn.execute("UPDATE posts SET content = ?1 WHERE id = ?2", rusqlite::params![content, post_id])?;
            Ok(())
        })
    }

    // -- Likes --

    /// Sets whether `user_id` likes `post_id` and returns the post's like
    /// count afterwards. Repeating the same request is a no-op, so a pair
    /// never has more than one row.
    pub fn set_like(&self, user_id: &str, post_id: i64, like: bool) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let found: Option<i64> = tx
                .query_row("SELECT id FROM posts WHERE id = ?1", [post_id], |r| r.get(0))
                .optional()?;
            if found.is_none() {
                return Err(DbError::NotFound("post"));
            }

            let changed = if like {
                tx.execute(
                    "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(user_id, post_id) DO NOTHING",
                    rusqlite::params![user_id, post_id, now_timestamp()],
                )?
            } else {
                tx.execute(
                    "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                    rusqlite::params![user_id, post_id],
                )?
            };

            if changed > 0 {
                let delta: i64 = if like { 1 } else { -1 };
                tx.execute(
                    "UPDATE posts SET likes = likes + ?1 WHERE id = ?2",
                    rusqlite::params![delta, post_id],
                )?;
            }

            let likes: i64 = tx.query_row("SELECT likes FROM posts WHERE id = ?1", [post_id], |r| r.get(0))?;
            tx.commit()?;
            Ok(likes)
        })
    }

    /// Number of like rows for one (user, post) pair: 0 or 1.
    pub fn like_rows(&self, user_id: &str, post_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE user_id = ?1 AND post_id = ?2",
                rusqlite::params![user_id, post_id],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    // -- Follows --

    /// Creates the edge. Self-follows are refused; following twice is a no-op.
    /// Returns true when a new edge was written.
    pub fn follow(&self, edge: &FollowRow) -> Result<bool> {
        if !edge.valid_follow() {
            return Err(DbError::Rejected("You cannot follow yourself.".into()));
        }
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(follower_id, followee_id) DO NOTHING",
                rusqlite::params![edge.follower_id, edge.followee_id, now_timestamp()],
            )?;
            if changed > 0 {
                info!("{} now follows {}", edge.follower_id, edge.followee_id);
            }
            Ok(changed > 0)
        })
    }

    /// Returns true when an edge was removed.
    pub fn unfollow(&self, edge: &FollowRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                rusqlite::params![edge.follower_id, edge.followee_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn is_following(&self, edge: &FollowRow) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    rusqlite::params![edge.follower_id, edge.followee_id],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn follow_counts(&self, user_id: &str) -> Result<FollowCounts> {
        self.with_conn(|conn| {
            let following: i64 =
                conn.query_row("SELECT COUNT(*) FROM follows WHERE follower_id = ?1", [user_id], |r| r.get(0))?;
            let followers: i64 =
                conn.query_row("SELECT COUNT(*) FROM follows WHERE followee_id = ?1", [user_id], |r| r.get(0))?;
            Ok(FollowCounts {
                following: following as u64,
                followers: followers as u64,
            })
        })
    }
}

fn query_posts(conn: &Connection, sql: &str, args: &[Value]) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_username: row.get(2)?,
        content: row.get(3)?,
        likes: row.get(4)?,
        created_at: row.get(5)?,
        liked: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::tests::add_user;

    #[test]
    fn like_toggle_never_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let u = add_user(&db, "u");
        let post = db.create_post(&u, "hello").unwrap();

        assert_eq!(db.set_like(&u, post, true).unwrap(), 1);
        assert_eq!(db.set_like(&u, post, true).unwrap(), 1);
        assert_eq!(db.like_rows(&u, post).unwrap(), 1);

        assert_eq!(db.set_like(&u, post, false).unwrap(), 0);
        assert_eq!(db.set_like(&u, post, false).unwrap(), 0);
        assert_eq!(db.like_rows(&u, post).unwrap(), 0);

        let row = db.get_post(post, Some(&u)).unwrap().unwrap();
        assert!(row.valid_like());
        assert!(!row.liked);
    }

    #[test]
    fn like_on_missing_post_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let u = add_user(&db, "u");
        assert!(matches!(db.set_like(&u, 42, true), Err(DbError::NotFound("post"))));
    }

    #[test]
    fn negative_like_count_is_invalid() {
        let row = PostRow {
            id: 1,
            owner_id: "a".into(),
            owner_username: "a".into(),
            content: "Neg Like".into(),
            likes: -1,
            created_at: String::new(),
            liked: false,
        };
        assert!(!row.valid_like());
    }

    #[test]
    fn self_follow_rejected_by_validator_and_store() {
        let db = Database::open_in_memory().unwrap();
        let u = add_user(&db, "1");

        let edge = FollowRow::new(u.clone(), u.clone());
        assert!(!edge.valid_follow());
        assert!(matches!(db.follow(&edge), Err(DbError::Rejected(_))));

        // The table refuses it too, even when the validator is bypassed.
        let raw = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?1, 'now')",
                [&u],
            )
            .map_err(DbError::from)
        });
        assert!(raw.is_err());
        assert_eq!(db.follow_counts(&u).unwrap(), FollowCounts::default());
    }

    #[test]
    fn follow_is_idempotent_and_counted() {
        let db = Database::open_in_memory().unwrap();
        let a = add_user(&db, "a");
        let b = add_user(&db, "b");
        let edge = FollowRow::new(a.clone(), b.clone());

        assert!(edge.valid_follow());
        assert!(db.follow(&edge).unwrap());
        assert!(!db.follow(&edge).unwrap());
        assert!(db.is_following(&edge).unwrap());
        assert_eq!(db.follow_counts(&a).unwrap(), FollowCounts { following: 1, followers: 0 });
        assert_eq!(db.follow_counts(&b).unwrap(), FollowCounts { following: 0, followers: 1 });

        assert!(db.unfollow(&edge).unwrap());
        assert!(!db.unfollow(&edge).unwrap());
        assert!(!db.is_following(&edge).unwrap());
    }

    #[test]
    fn feed_pages_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let u = add_user(&db, "u");
        for i in 0..23 {
            db.create_post(&u, &format!("post {}", i)).unwrap();
        }

        let first = db.feed_page(&Feed::All, None, None).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].content, "post 22");
        assert_eq!(first.window.num_pages, 3);

        let last = db.feed_page(&Feed::All, None, Some("99")).unwrap();
        assert_eq!(last.window.number, 3);
        assert_eq!(last.items.len(), 3);
        assert_eq!(last.items[2].content, "post 0");
    }

    #[test]
    fn following_feed_only_shows_followed_users() {
        let db = Database::open_in_memory().unwrap();
        let a = add_user(&db, "a");
        let b = add_user(&db, "b");
        let c = add_user(&db, "c");
        db.create_post(&b, "from b").unwrap();
        db.create_post(&c, "from c").unwrap();
        db.follow(&FollowRow::new(a.clone(), b.clone())).unwrap();

        let page = db.feed_page(&Feed::FollowedBy(a.clone()), Some(&a), None).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].owner_username, "b");

        let profile = db.feed_page(&Feed::ByOwner(c.clone()), None, None).unwrap();
        assert_eq!(profile.items.len(), 1);
        assert_eq!(profile.items[0].content, "from c");
    }

    #[test]
    fn only_owner_edits_post() {
        let db = Database::open_in_memory().unwrap();
        let a = add_user(&db, "a");
        let b = add_user(&db, "b");
        let post = db.create_post(&a, "draft").unwrap();

        assert!(matches!(db.update_post_content(post, &b, "hijack"), Err(DbError::Forbidden(_))));
        db.update_post_content(post, &a, "final").unwrap();
        assert_eq!(db.get_post(post, None).unwrap().unwrap().content, "final");
        assert!(matches!(db.update_post_content(999, &a, "x"), Err(DbError::NotFound("post"))));
    }
}
