use rusqlite::{Connection, Row};

use crate::models::UserRow;
use crate::{Database, DbError, OptionalExt, Result, now_timestamp};

const USER_COLUMNS: &str = "id, username, email, nickname, password, created_at";

impl Database {
    /// Inserts a user. A taken username surfaces as `DbError::Conflict` and
    /// nothing is written.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        nickname: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, nickname, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, username, email, nickname, password_hash, now_timestamp()),
            )
            .map_err(|e| DbError::from_constraint(e, "username already taken"))?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        nickname: row.get(3)?,
        password: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn add_user(db: &Database, username: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.create_user(&id, username, "", "None", "hash").unwrap();
        id
    }

    #[test]
    fn duplicate_username_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        add_user(&db, "alice");

        let err = db
            .create_user(&uuid::Uuid::new_v4().to_string(), "alice", "", "None", "hash")
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[test]
    fn lookup_by_username_and_id() {
        let db = Database::open_in_memory().unwrap();
        let id = add_user(&db, "bob");

        let by_name = db.get_user_by_username("bob").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.nickname, "None");

        let by_id = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(by_id.username, "bob");

        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }
}
