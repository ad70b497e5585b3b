use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use super::users_model::{normalize_username_lookup, NewUser, User, UserDB};
use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::users;

/// Repository for managing user records in the database
pub struct UserRepository {
    pool: Arc<DbPool>,
}

impl UserRepository {
    /// Creates a new UserRepository instance
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Creates a new user. The input is normalized and validated here so
    /// every caller gets the same canonical form.
    pub fn create(&self, new_user: NewUser) -> Result<User> {
        let new_user = new_user.sanitized()?;

        let row = UserDB {
            id: 0,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.credential_hash(),
            registered_at: Utc::now().naive_utc(),
        };

        let mut conn = get_connection(&self.pool)?;

        let inserted = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserDB::as_returning())
            .get_result::<UserDB>(&mut conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Error::Conflict("Username or email already exists.".to_string())
                }
                other => other.into(),
            })?;

        Ok(inserted.into())
    }

    /// Retrieves a user by username
    pub fn get_by_username(&self, username: &str) -> Result<User> {
        let username = normalize_username_lookup(username)?;
        let mut conn = get_connection(&self.pool)?;

        let user = users::table
            .filter(users::username.eq(&username))
            .select(UserDB::as_select())
            .first::<UserDB>(&mut conn)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("User '{}' not found.", username)))?;

        Ok(user.into())
    }

    /// Resolves a username to its stable identifier
    pub fn find_id_by_username(&self, username: &str) -> Result<i64> {
        let username = normalize_username_lookup(username)?;
        let mut conn = get_connection(&self.pool)?;

        users::table
            .filter(users::username.eq(&username))
            .select(users::id)
            .first::<i64>(&mut conn)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("User '{}' not found.", username)))
    }

    /// Lists all registered users
    pub fn list(&self) -> Result<Vec<User>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = users::table
            .order(users::id.asc())
            .select(UserDB::as_select())
            .load::<UserDB>(&mut conn)?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Looks up a user by the full credential triple inside a caller-supplied
    /// transaction. Returns `None` when any of the three does not match.
    pub fn find_by_credentials_in_transaction(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserDB>> {
        let user = users::table
            .filter(users::username.eq(username))
            .filter(users::email.eq(email))
            .filter(users::password_hash.eq(password_hash))
            .select(UserDB::as_select())
            .first::<UserDB>(conn)
            .optional()?;

        Ok(user)
    }

    /// Deletes a user by id inside a caller-supplied transaction. Coins,
    /// transactions and statistics go with it via the cascading foreign keys.
    pub fn delete_in_transaction(&self, conn: &mut SqliteConnection, user_id: i64) -> Result<usize> {
        let affected = diesel::delete(users::table.find(user_id)).execute(conn)?;

        if affected == 0 {
            return Err(Error::NotFound(format!(
                "User with id {} not found",
                user_id
            )));
        }

        Ok(affected)
    }
}
