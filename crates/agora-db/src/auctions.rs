use agora_types::Cents;
use agora_types::forms::NewListing;
use rusqlite::{Connection, Row, TransactionBehavior};
use tracing::{info, warn};

use crate::models::{BidRow, CategoryRow, CommentRow, ListingRow};
use crate::{Database, DbError, OptionalExt, Result, now_timestamp};

const LISTING_SELECT: &str = "
    SELECT l.id, l.owner_id, u.username, l.title, l.description, l.starting_price,
           l.current_price, l.category_id, c.name, l.image_url, l.active, l.created_at
    FROM listings l
    JOIN users u ON u.id = l.owner_id
    JOIN categories c ON c.id = l.category_id";

/// Lowest amount a new bid may offer: the starting price while nobody has
/// bid, otherwise one cent above the highest recorded bid.
pub fn minimum_bid(starting_price: Cents, highest_bid: Option<Cents>) -> Cents {
    match highest_bid {
        Some(highest) => highest.next_step(),
        None => starting_price,
    }
}

impl Database {
    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| Ok(CategoryRow { id: row.get(0)?, name: row.get(1)? }))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_category(&self, id: i64) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, name FROM categories WHERE id = ?1", [id], |row| {
                Ok(CategoryRow { id: row.get(0)?, name: row.get(1)? })
            })
            .optional()
        })
    }

    // -- Listings --

    pub fn create_listing(&self, owner_id: &str, listing: &NewListing) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let category: Option<i64> = conn
                .query_row("SELECT id FROM categories WHERE id = ?1", [listing.category_id], |r| r.get(0))
                .optional()?;
            if category.is_none() {
                return Err(DbError::NotFound("category"));
            }

            conn.execute(
                "INSERT INTO listings
                    (owner_id, title, description, starting_price, current_price, category_id, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    owner_id,
                    listing.title,
                    listing.description,
                    listing.starting_price.as_i64(),
                    listing.category_id,
                    listing.image_url,
                    now_timestamp(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            info!("Listing {} '{}' created by {}", id, listing.title, owner_id);
            Ok(id)
        })
    }

    /// Every listing, newest first. Closed auctions are included.
    pub fn list_listings(&self) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            query_listings(conn, &format!("{} ORDER BY l.created_at DESC, l.id DESC", LISTING_SELECT), rusqlite::params![])
        })
    }

    /// Active listings in one category, newest first.
    pub fn listings_in_category(&self, category_id: i64) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE l.category_id = ?1 AND l.active = 1 ORDER BY l.created_at DESC, l.id DESC",
                LISTING_SELECT
            );
            query_listings(conn, &sql, [category_id])
        })
    }

    pub fn get_listing(&self, id: i64) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE l.id = ?1", LISTING_SELECT);
            conn.query_row(&sql, [id], map_listing).optional()
        })
    }

    /// Marks the listing closed. Only its owner may do this; closing twice is
    /// harmless.
    pub fn close_listing(&self, listing_id: i64, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let owner: String = conn
                .query_row("SELECT owner_id FROM listings WHERE id = ?1", [listing_id], |r| r.get(0))
                .optional()?
                .ok_or(DbError::NotFound("listing"))?;

            if owner != user_id {
                warn!("User {} tried to close listing {} owned by {}", user_id, listing_id, owner);
                return Err(DbError::Forbidden("only the owner can close this listing".into()));
            }

            conn.execute("UPDATE listings SET active = 0 WHERE id = ?1", [listing_id])?;
            info!("Listing {} closed", listing_id);
            Ok(())
        })
    }

    // -- Bids --

    /// Records a bid and settles the listing's current price.
    ///
    /// Runs as one immediate transaction: the minimum is computed from the
    /// bids table, the bidder's row is upserted, the price is updated and the
    /// bidder starts watching the listing. A refused bid changes nothing.
    pub fn place_bid(&self, listing_id: i64, bidder_id: &str, amount: Cents) -> Result<Cents> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let (owner_id, active, starting): (String, bool, i64) = tx
                .query_row(
                    "SELECT owner_id, active, starting_price FROM listings WHERE id = ?1",
                    [listing_id],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
                .optional()?
                .ok_or(DbError::NotFound("listing"))?;

            if !active {
                return Err(DbError::Rejected("This auction is closed.".into()));
            }
            if owner_id == bidder_id {
                return Err(DbError::Rejected("You cannot bid on your own listing.".into()));
            }

            let highest: Option<i64> = tx.query_row(
                "SELECT MAX(amount) FROM bids WHERE listing_id = ?1",
                [listing_id],
                |r| r.get(0),
            )?;
            let minimum = minimum_bid(Cents(starting), highest.map(Cents));
            if amount < minimum {
                warn!("Bid {} on listing {} below minimum {}", amount, listing_id, minimum);
                return Err(DbError::Rejected(format!("Your bid must be at least ${}.", minimum)));
            }

            let now = now_timestamp();
            tx.execute(
                "INSERT INTO bids (listing_id, bidder_id, amount, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(listing_id, bidder_id)
                 DO UPDATE SET amount = excluded.amount, updated_at = excluded.updated_at",
                rusqlite::params![listing_id, bidder_id, amount.as_i64(), now],
            )?;
            tx.execute(
                "UPDATE listings SET current_price = ?1 WHERE id = ?2",
                rusqlite::params![amount.as_i64(), listing_id],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO watchlist (user_id, listing_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![bidder_id, listing_id, now],
            )?;
            tx.commit()?;

            info!("Bid {} on listing {} by {}", amount, listing_id, bidder_id);
            Ok(amount)
        })
    }

    /// Highest bid on a listing; ties go to the earlier bid.
    pub fn highest_bid(&self, listing_id: i64) -> Result<Option<BidRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT b.id, b.listing_id, b.bidder_id, u.username, b.amount, b.updated_at
                 FROM bids b
                 JOIN users u ON u.id = b.bidder_id
                 WHERE b.listing_id = ?1
                 ORDER BY b.amount DESC, b.updated_at ASC, b.id ASC
                 LIMIT 1",
                [listing_id],
                |row| {
                    Ok(BidRow {
                        id: row.get(0)?,
                        listing_id: row.get(1)?,
                        bidder_id: row.get(2)?,
                        bidder_username: row.get(3)?,
                        amount: Cents(row.get(4)?),
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn bid_count(&self, listing_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM bids WHERE listing_id = ?1", [listing_id], |r| r.get(0))?;
            Ok(n as u64)
        })
    }

    // -- Comments --

    pub fn add_comment(&self, listing_id: i64, author_id: &str, content: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            ensure_listing(conn, listing_id)?;
            conn.execute(
                "INSERT INTO comments (listing_id, author_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![listing_id, author_id, content, now_timestamp()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Comments on a listing, oldest first.
    pub fn comments_for_listing(&self, listing_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.listing_id, u.username, c.content, c.created_at
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.listing_id = ?1
                 ORDER BY c.created_at ASC, c.id ASC",
            )?;
            let rows = stmt
                .query_map([listing_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        listing_id: row.get(1)?,
                        author_username: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Watch list --

    /// Returns true when the entry was new.
    pub fn add_watch(&self, user_id: &str, listing_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            ensure_listing(conn, listing_id)?;
            let changed = conn.execute(
                "INSERT OR IGNORE INTO watchlist (user_id, listing_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, listing_id, now_timestamp()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns true when an entry was removed.
    pub fn remove_watch(&self, user_id: &str, listing_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM watchlist WHERE user_id = ?1 AND listing_id = ?2",
                rusqlite::params![user_id, listing_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn is_watching(&self, user_id: &str, listing_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM watchlist WHERE user_id = ?1 AND listing_id = ?2",
                    rusqlite::params![user_id, listing_id],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Listings on a user's watch list, most recently watched first.
    pub fn watchlist(&self, user_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN watchlist w ON w.listing_id = l.id
                 WHERE w.user_id = ?1
                 ORDER BY w.created_at DESC, l.id DESC",
                LISTING_SELECT
            );
            query_listings(conn, &sql, [user_id])
        })
    }
}

fn ensure_listing(conn: &Connection, listing_id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM listings WHERE id = ?1", [listing_id], |r| r.get(0))
        .optional()?;
    found.map(|_| ()).ok_or(DbError::NotFound("listing"))
}

fn query_listings<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<ListingRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_listing)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_listing(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_username: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        starting_price: Cents(row.get(5)?),
        current_price: Cents(row.get(6)?),
        category_id: row.get(7)?,
        category_name: row.get(8)?,
        image_url: row.get(9)?,
        active: row.get(10)?,
        created_at: row.get(11)?,
    })
}
