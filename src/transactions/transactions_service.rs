use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::transactions_model::{Transaction, TransactionInput};
use super::transactions_repository::TransactionRepository;
use crate::coins::{normalize_coin_name, normalize_coin_symbol, CoinRepository};
use crate::db::DbPool;
use crate::errors::Result;
use crate::statistics::{Statistics, StatisticsService};
use crate::users::UserRepository;

/// Input model for recording a transaction addressed by username and
/// coin name/symbol rather than raw identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTransaction {
    pub username: String,
    pub coin_name: String,
    pub coin_symbol: String,
    #[serde(flatten)]
    pub amounts: TransactionInput,
}

/// Service for submitting transactions into the ledger.
///
/// Resolves the caller-facing identifiers to stable ids and hands the atomic
/// ledger-plus-statistics work to [`StatisticsService`].
pub struct TransactionService {
    user_repository: Arc<UserRepository>,
    coin_repository: Arc<CoinRepository>,
    repository: Arc<TransactionRepository>,
    statistics_service: Arc<StatisticsService>,
}

impl TransactionService {
    /// Creates a new TransactionService instance
    pub fn new(pool: Arc<DbPool>, statistics_service: Arc<StatisticsService>) -> Self {
        Self {
            user_repository: Arc::new(UserRepository::new(pool.clone())),
            coin_repository: Arc::new(CoinRepository::new(pool.clone())),
            repository: Arc::new(TransactionRepository::new(pool)),
            statistics_service,
        }
    }

    /// Records one buy/sell transaction and returns the updated statistics.
    pub async fn record_transaction(&self, record: RecordTransaction) -> Result<Statistics> {
        // Reject contradictory amounts before any storage access.
        record.amounts.resolve()?;

        let coin_name = normalize_coin_name(&record.coin_name)?;
        let coin_symbol = normalize_coin_symbol(&record.coin_symbol)?;

        let user_id = self
            .user_repository
            .find_id_by_username(&record.username)?;
        let coin_id = self
            .coin_repository
            .find_id(user_id, &coin_name, &coin_symbol)?;

        debug!(
            "Recording transaction for user '{}', coin '{}' ({})",
            record.username, record.coin_name, record.coin_symbol
        );

        self.statistics_service
            .apply_transaction(user_id, coin_id, record.amounts)
            .await
    }

    /// Lists the ledger for one (user, coin) pair in commit order.
    pub fn list_transactions(&self, user_id: i64, coin_id: i64) -> Result<Vec<Transaction>> {
        self.repository.list_for_coin(user_id, coin_id)
    }
}
