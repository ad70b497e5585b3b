use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use super::statistics_model::{Statistics, StatisticsDB};
use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::coin_statistics;

/// Repository for the per-(user, coin) statistics rows.
pub struct StatisticsRepository {
    pool: Arc<DbPool>,
}

impl StatisticsRepository {
    /// Creates a new StatisticsRepository instance
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Retrieves the statistics row for a pair
    pub fn get_by_pair(&self, user_id: i64, coin_id: i64) -> Result<Statistics> {
        let mut conn = get_connection(&self.pool)?;

        let row = coin_statistics::table
            .filter(coin_statistics::user_id.eq(user_id))
            .filter(coin_statistics::coin_id.eq(coin_id))
            .select(StatisticsDB::as_select())
            .first::<StatisticsDB>(&mut conn)
            .optional()?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No statistics for coin {} of user {}.",
                    coin_id, user_id
                ))
            })?;

        Ok(row.into())
    }

    /// Loads the statistics row for a pair inside a caller-supplied
    /// transaction, or `None` when the pair has no row yet.
    pub fn find_by_pair_in_transaction(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        coin_id: i64,
    ) -> Result<Option<Statistics>> {
        let row = coin_statistics::table
            .filter(coin_statistics::user_id.eq(user_id))
            .filter(coin_statistics::coin_id.eq(coin_id))
            .select(StatisticsDB::as_select())
            .first::<StatisticsDB>(conn)
            .optional()?;

        Ok(row.map(Statistics::from))
    }

    /// Persists the folded statistics inside a caller-supplied transaction:
    /// update the pair's row if it exists, insert it otherwise. Also stamps
    /// `updated_at`.
    pub fn upsert_in_transaction(
        &self,
        conn: &mut SqliteConnection,
        statistics: &Statistics,
    ) -> Result<Statistics> {
        let row = StatisticsDB::from(statistics);

        let updated = diesel::update(
            coin_statistics::table
                .filter(coin_statistics::user_id.eq(statistics.user_id))
                .filter(coin_statistics::coin_id.eq(statistics.coin_id)),
        )
        .set(&row)
        .execute(conn)?;

        if updated == 0 {
            let inserted = diesel::insert_into(coin_statistics::table)
                .values(&row)
                .returning(StatisticsDB::as_returning())
                .get_result::<StatisticsDB>(conn)?;
            return Ok(inserted.into());
        }

        let reloaded = coin_statistics::table
            .filter(coin_statistics::user_id.eq(statistics.user_id))
            .filter(coin_statistics::coin_id.eq(statistics.coin_id))
            .select(StatisticsDB::as_select())
            .first::<StatisticsDB>(conn)?;

        Ok(reloaded.into())
    }
}
