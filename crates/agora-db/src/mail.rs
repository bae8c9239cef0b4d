use agora_types::models::Mailbox;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use tracing::{info, warn};

use crate::models::EmailRow;
use crate::{Database, DbError, OptionalExt, Result, now_timestamp};

const EMAIL_SELECT: &str = "
    SELECT e.id, e.owner_id, u.username, e.subject, e.body, e.is_read, e.archived, e.created_at
    FROM emails e
    JOIN users u ON u.id = e.sender_id";

/// Copies addressed to their owner: the inbox and archive draw from these.
const RECEIVED: &str =
    "EXISTS(SELECT 1 FROM email_recipients r WHERE r.email_id = e.id AND r.user_id = e.owner_id)";

fn mailbox_filter(mailbox: Mailbox) -> String {
    match mailbox {
        Mailbox::Inbox => format!("{} AND e.archived = 0", RECEIVED),
        Mailbox::Sent => "e.sender_id = e.owner_id".to_string(),
        Mailbox::Archive => format!("{} AND e.archived = 1", RECEIVED),
    }
}

impl Database {
    /// Delivers a message: one copy for the sender and one for each distinct
    /// recipient, all in one transaction. An unknown recipient refuses the
    /// whole send. Returns the ids of the copies, the sender's first.
    pub fn send_email(
        &self,
        sender_id: &str,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<Vec<i64>> {
        if recipients.is_empty() {
            return Err(DbError::Rejected("At least one recipient required.".into()));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let mut recipient_ids: Vec<String> = Vec::with_capacity(recipients.len());
            for name in recipients {
                let id: Option<String> = tx
                    .query_row("SELECT id FROM users WHERE username = ?1", [name], |r| r.get(0))
                    .optional()?;
                let Some(id) = id else {
                    warn!("Mail from {} refused, no user '{}'", sender_id, name);
                    return Err(DbError::Rejected(format!("User {} does not exist.", name)));
                };
                if !recipient_ids.contains(&id) {
                    recipient_ids.push(id);
                }
            }

            let mut owners = vec![sender_id.to_string()];
            owners.extend(recipient_ids.iter().filter(|id| id.as_str() != sender_id).cloned());

            let created_at = now_timestamp();
            let mut ids = Vec::with_capacity(owners.len());
            for owner in &owners {
                let id = insert_copy(&tx, owner, sender_id, &recipient_ids, subject, body, &created_at)?;
                ids.push(id);
            }

            tx.commit()?;
            info!("Mail {} sent by {} to {} recipient(s)", ids[0], sender_id, recipient_ids.len());
            Ok(ids)
        })
    }

    /// A user's copies in one mailbox, newest first.
    pub fn mailbox(&self, user_id: &str, mailbox: Mailbox) -> Result<Vec<EmailRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE e.owner_id = ?1 AND {} ORDER BY e.created_at DESC, e.id DESC",
                EMAIL_SELECT,
                mailbox_filter(mailbox)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_email)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            with_recipients(conn, rows)
        })
    }

    /// One copy, only if `user_id` owns it.
    pub fn get_email(&self, user_id: &str, email_id: i64) -> Result<Option<EmailRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE e.id = ?1 AND e.owner_id = ?2", EMAIL_SELECT);
            let row = conn
                .query_row(&sql, rusqlite::params![email_id, user_id], map_email)
                .optional()?;
            match row {
                Some(row) => Ok(with_recipients(conn, vec![row])?.pop()),
                None => Ok(None),
            }
        })
    }

    /// Updates the read and archived flags of the user's own copy. `None`
    /// leaves a flag as it is.
    pub fn set_email_flags(
        &self,
        user_id: &str,
        email_id: i64,
        read: Option<bool>,
        archived: Option<bool>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE emails SET is_read = COALESCE(?1, is_read), archived = COALESCE(?2, archived)
                 WHERE id = ?3 AND owner_id = ?4",
                rusqlite::params![read, archived, email_id, user_id],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("email"));
            }
            Ok(())
        })
    }
}

fn insert_copy(
    tx: &Transaction<'_>,
    owner_id: &str,
    sender_id: &str,
    recipient_ids: &[String],
    subject: &str,
    body: &str,
    created_at: &str,
) -> Result<i64> {
    // The sender's own copy starts out read.
    let read = owner_id == sender_id;
    tx.execute(
        "INSERT INTO emails (owner_id, sender_id, subject, body, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![owner_id, sender_id, subject, body, read, created_at],
    )?;
    let email_id = tx.last_insert_rowid();
    for user_id in recipient_ids {
        tx.execute(
            "INSERT INTO email_recipients (email_id, user_id) VALUES (?1, ?2)",
            rusqlite::params![email_id, user_id],
        )?;
    }
    Ok(email_id)
}

/// Fills in each row's recipient names, in the order they were addressed.
fn with_recipients(conn: &Connection, mut rows: Vec<EmailRow>) -> Result<Vec<EmailRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.username FROM email_recipients r
         JOIN users u ON u.id = r.user_id
         WHERE r.email_id = ?1
         ORDER BY r.rowid",
    )?;
    for row in &mut rows {
        row.recipients = stmt
            .query_map([row.id], |r| r.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
    }
    Ok(rows)
}

fn map_email(row: &Row<'_>) -> rusqlite::Result<EmailRow> {
    Ok(EmailRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        sender_username: row.get(2)?,
        recipients: vec![],
        subject: row.get(3)?,
        body: row.get(4)?,
        read: row.get(5)?,
        archived: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::tests::add_user;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn send_writes_one_copy_per_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let carol = add_user(&db, "carol");

        let ids = db.send_email(&alice, &names(&["bob", "carol", "bob"]), "Hi", "Hello").unwrap();
        assert_eq!(ids.len(), 3);

        let sent = db.mailbox(&alice, Mailbox::Sent).unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].read);
        assert_eq!(sent[0].recipients, ["bob", "carol"]);
        assert!(db.mailbox(&alice, Mailbox::Inbox).unwrap().is_empty());

        for user in [&bob, &carol] {
            let inbox = db.mailbox(user, Mailbox::Inbox).unwrap();
            assert_eq!(inbox.len(), 1);
            assert_eq!(inbox[0].sender_username, "alice");
            assert!(!inbox[0].read);
            assert!(db.mailbox(user, Mailbox::Sent).unwrap().is_empty());
        }
    }

    #[test]
    fn unknown_recipient_sends_nothing() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");
        add_user(&db, "bob");

        let err = db.send_email(&alice, &names(&["bob", "nobody"]), "Hi", "x").unwrap_err();
        assert!(matches!(err, DbError::Rejected(ref m) if m == "User nobody does not exist."));
        assert!(db.mailbox(&alice, Mailbox::Sent).unwrap().is_empty());

        assert!(matches!(db.send_email(&alice, &[], "Hi", "x"), Err(DbError::Rejected(_))));
    }

    #[test]
    fn mail_to_self_lands_in_both_boxes() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");

        let ids = db.send_email(&alice, &names(&["alice"]), "Note", "to self").unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(db.mailbox(&alice, Mailbox::Inbox).unwrap().len(), 1);
        assert_eq!(db.mailbox(&alice, Mailbox::Sent).unwrap().len(), 1);
    }

    #[test]
    fn flags_move_mail_between_boxes() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let ids = db.send_email(&alice, &names(&["bob"]), "Hi", "x").unwrap();
        let bobs_copy = ids[1];

        db.set_email_flags(&bob, bobs_copy, Some(true), None).unwrap();
        let email = db.get_email(&bob, bobs_copy).unwrap().unwrap();
        assert!(email.read);
        assert!(!email.archived);

        db.set_email_flags(&bob, bobs_copy, None, Some(true)).unwrap();
        assert!(db.mailbox(&bob, Mailbox::Inbox).unwrap().is_empty());
        assert_eq!(db.mailbox(&bob, Mailbox::Archive).unwrap().len(), 1);
        assert!(db.get_email(&bob, bobs_copy).unwrap().unwrap().read);

        // Copies belong to their owner alone.
        assert!(db.get_email(&alice, bobs_copy).unwrap().is_none());
        let err = db.set_email_flags(&alice, bobs_copy, Some(false), None).unwrap_err();
        assert!(matches!(err, DbError::NotFound("email")));
    }

    #[test]
    fn mailbox_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        db.send_email(&alice, &names(&["bob"]), "first", "x").unwrap();
        db.send_email(&alice, &names(&["bob"]), "second", "x").unwrap();

        let subjects: Vec<String> =
            db.mailbox(&bob, Mailbox::Inbox).unwrap().into_iter().map(|e| e.subject).collect();
        assert_eq!(subjects, ["second", "first"]);
    }
}
