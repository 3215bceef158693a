//! CRUD operations for back-office [`User`] accounts.

use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{User, UserDraft, UserRole};
use crate::stories::not_found;

impl Database {
    /// Insert a new user.  Email is UNIQUE; a duplicate surfaces as
    /// [`StoreError::Duplicate`].
    pub fn create_user(&self, draft: &UserDraft) -> Result<User> {
        if draft.email.trim().is_empty() {
            return Err(StoreError::Validation("email is required".into()));
        }

        self.conn().execute(
            "INSERT INTO users (name, email, password_hash, role)
             VALUES (?1, ?2, ?3, ?4)",
            params![draft.name, draft.email, draft.password_hash, draft.role.as_str()],
        )?;

        self.get_user(self.conn().last_insert_rowid())
    }

    /// Fetch a single user by id.
    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, name, email, password_hash, role FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Fetch a single user by email (login lookups).
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, name, email, password_hash, role FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// List all users ordered by name.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, email, password_hash, role FROM users ORDER BY name ASC",
        )?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Update a user's fields.
    pub fn update_user(&self, id: i64, draft: &UserDraft) -> Result<User> {
        let affected = self.conn().execute(
            "UPDATE users SET name = ?1, email = ?2, password_hash = ?3, role = ?4 WHERE id = ?5",
            params![draft.name, draft.email, draft.password_hash, draft.role.as_str(), id],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    /// Delete a user by id.  Returns `true` if a row was deleted.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role_col: String = row.get(4)?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: UserRole::parse(&role_col),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(email: &str) -> UserDraft {
        UserDraft {
            name: "Biên tập viên".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: UserRole::Editor,
        }
    }

    #[test]
    fn email_is_unique() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&draft("bt@truyenkho.vn")).unwrap();
        let err = db.create_user(&draft("bt@truyenkho.vn")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn lookup_by_email() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&draft("admin@truyenkho.vn")).unwrap();
        assert_eq!(db.get_user_by_email("admin@truyenkho.vn").unwrap(), user);
        assert!(matches!(
            db.get_user_by_email("missing@truyenkho.vn"),
            Err(StoreError::NotFound)
        ));
    }
}
