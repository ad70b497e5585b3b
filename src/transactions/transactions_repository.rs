use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use super::transactions_model::{NewTransaction, Transaction, TransactionDB};
use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::coin_transactions;

/// Repository for the append-only transaction ledger.
pub struct TransactionRepository {
    pool: Arc<DbPool>,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository instance
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Appends a ledger row inside a caller-supplied database transaction.
    ///
    /// The row is immutable once written; there is deliberately no update or
    /// single-row delete counterpart.
    pub fn insert_in_transaction(
        &self,
        conn: &mut SqliteConnection,
        new_transaction: &NewTransaction,
    ) -> Result<Transaction> {
        let row = TransactionDB::from(new_transaction);

        let inserted = diesel::insert_into(coin_transactions::table)
            .values(&row)
            .returning(TransactionDB::as_returning())
            .get_result::<TransactionDB>(conn)?;

        Ok(inserted.into())
    }

    /// Lists the ledger for one (user, coin) pair in commit order.
    pub fn list_for_coin(&self, user_id: i64, coin_id: i64) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = coin_transactions::table
            .filter(coin_transactions::user_id.eq(user_id))
            .filter(coin_transactions::coin_id.eq(coin_id))
            .order((
                coin_transactions::created_at.asc(),
                coin_transactions::id.asc(),
            ))
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)?;

        Ok(rows.into_iter().map(Transaction::from).collect())
    }
}
