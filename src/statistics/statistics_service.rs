use dashmap::DashMap;
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::statistics_model::Statistics;
use super::statistics_repository::StatisticsRepository;
use crate::coins::CoinRepository;
use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::transactions::{NewTransaction, TransactionInput, TransactionRepository};

/// The statistics aggregator.
///
/// Applies one transaction at a time to the running per-(user, coin)
/// statistics row. Each apply runs inside a single SQLite immediate
/// transaction (ledger insert + statistics upsert commit or roll back
/// together), and a per-pair async mutex serializes concurrent applies to
/// the same pair. Distinct pairs never share a lock. SQLite has no
/// `SELECT ... FOR UPDATE`; the pair lock plays that role.
pub struct StatisticsService {
    pool: Arc<DbPool>,
    coin_repository: Arc<CoinRepository>,
    transaction_repository: Arc<TransactionRepository>,
    repository: Arc<StatisticsRepository>,
    pair_locks: DashMap<(i64, i64), Arc<Mutex<()>>>,
}

impl StatisticsService {
    /// Creates a new StatisticsService instance
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            coin_repository: Arc::new(CoinRepository::new(pool.clone())),
            transaction_repository: Arc::new(TransactionRepository::new(pool.clone())),
            repository: Arc::new(StatisticsRepository::new(pool.clone())),
            pool,
            pair_locks: DashMap::new(),
        }
    }

    /// Applies one transaction for a (user, coin) pair and returns the
    /// updated statistics.
    ///
    /// The input is resolved (and possibly rejected) before any storage
    /// access. On any failure inside the atomic block, both the ledger row
    /// and the statistics update roll back; partial application is never
    /// observable.
    pub async fn apply_transaction(
        &self,
        user_id: i64,
        coin_id: i64,
        input: TransactionInput,
    ) -> Result<Statistics> {
        let amounts = input.resolve()?;

        let lock = self.pair_lock(user_id, coin_id);
        let _guard = lock.lock().await;

        let mut conn = get_connection(&self.pool)?;
        let statistics = conn.immediate_transaction::<_, Error, _>(|tx_conn| {
            if !self
                .coin_repository
                .exists_in_transaction(tx_conn, user_id, coin_id)?
            {
                return Err(Error::NotFound(format!(
                    "Coin {} not found for user {}.",
                    coin_id, user_id
                )));
            }

            let new_transaction = NewTransaction {
                user_id,
                coin_id,
                amounts,
            };
            let transaction = self
                .transaction_repository
                .insert_in_transaction(tx_conn, &new_transaction)?;

            let mut statistics = self
                .repository
                .find_by_pair_in_transaction(tx_conn, user_id, coin_id)?
                .unwrap_or_else(|| Statistics::new(user_id, coin_id));
            statistics.apply(&transaction);

            self.repository.upsert_in_transaction(tx_conn, &statistics)
        })?;

        debug!(
            "Applied transaction for pair ({}, {}): {} transactions, holdings {}",
            user_id, coin_id, statistics.transactions_count, statistics.holdings
        );
        Ok(statistics)
    }

    /// Retrieves the current statistics for a pair
    pub fn get_statistics(&self, user_id: i64, coin_id: i64) -> Result<Statistics> {
        self.repository.get_by_pair(user_id, coin_id)
    }

    /// The exclusive lock guarding one (user, coin) pair. Entries are
    /// created lazily and live for the lifetime of the service; the registry
    /// is bounded by the number of tracked pairs.
    fn pair_lock(&self, user_id: i64, coin_id: i64) -> Arc<Mutex<()>> {
        self.pair_locks
            .entry((user_id, coin_id))
            .or_default()
            .clone()
    }
}
