use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use super::coins_model::{Coin, CoinDB};
use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::coins;

/// Repository for managing watchlist entries in the database.
/// Name and symbol arguments are expected in canonical (normalized) form.
pub struct CoinRepository {
    pool: Arc<DbPool>,
}

impl CoinRepository {
    /// Creates a new CoinRepository instance
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Adds a coin to a user's watchlist
    pub fn create(&self, user_id: i64, name: &str, symbol: &str) -> Result<Coin> {
        let row = CoinDB {
            id: 0,
            user_id,
            name: name.to_string(),
            symbol: symbol.to_string(),
            added_at: Utc::now().naive_utc(),
        };

        let mut conn = get_connection(&self.pool)?;

        let inserted = diesel::insert_into(coins::table)
            .values(&row)
            .returning(CoinDB::as_returning())
            .get_result::<CoinDB>(&mut conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Error::Conflict(format!(
                        "Coin '{}' ({}) already exists for this user.",
                        name, symbol
                    ))
                }
                other => other.into(),
            })?;

        Ok(inserted.into())
    }

    /// Lists a user's watchlist
    pub fn list_for_user(&self, user_id: i64) -> Result<Vec<Coin>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = coins::table
            .filter(coins::user_id.eq(user_id))
            .order((coins::name.asc(), coins::symbol.asc()))
            .select(CoinDB::as_select())
            .load::<CoinDB>(&mut conn)?;

        Ok(rows.into_iter().map(Coin::from).collect())
    }

    /// Resolves a (user, name, symbol) triple to the coin's stable identifier
    pub fn find_id(&self, user_id: i64, name: &str, symbol: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;

        coins::table
            .filter(coins::user_id.eq(user_id))
            .filter(coins::name.eq(name))
            .filter(coins::symbol.eq(symbol))
            .select(coins::id)
            .first::<i64>(&mut conn)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Coin '{}' ({}) not found.", name, symbol)))
    }

    /// Checks that a coin exists and belongs to the user, inside a
    /// caller-supplied transaction.
    pub fn exists_in_transaction(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        coin_id: i64,
    ) -> Result<bool> {
        let found = coins::table
            .filter(coins::id.eq(coin_id))
            .filter(coins::user_id.eq(user_id))
            .select(coins::id)
            .first::<i64>(conn)
            .optional()?;

        Ok(found.is_some())
    }

    /// Removes a coin from a user's watchlist. Its transactions and
    /// statistics row go with it via the cascading foreign keys.
    pub fn delete(&self, user_id: i64, name: &str, symbol: &str) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;

        let affected = diesel::delete(
            coins::table
                .filter(coins::user_id.eq(user_id))
                .filter(coins::name.eq(name))
                .filter(coins::symbol.eq(symbol)),
        )
        .execute(&mut conn)?;

        if affected == 0 {
            return Err(Error::NotFound(format!(
                "Coin '{}' ({}) not found.",
                name, symbol
            )));
        }

        Ok(())
    }
}
