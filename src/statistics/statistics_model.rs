use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::DECIMAL_SCALE;
use crate::transactions::Transaction;
use crate::utils::{decimal_from_db, decimal_to_db};

/// Running aggregates for one (user, coin) pair.
///
/// This row is a cached fold over the pair's ledger: after N committed
/// transactions it equals [`Statistics::apply`] replayed over them in commit
/// order, starting from [`Statistics::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub id: i64,
    pub user_id: i64,
    pub coin_id: i64,
    pub buy_total: Decimal,
    pub sell_total: Decimal,
    pub invested_total: Decimal,
    pub invested_avg: Decimal,
    pub realized_total: Decimal,
    pub realized_avg: Decimal,
    pub holdings: Decimal,
    pub fee_total: Decimal,
    pub transactions_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl Statistics {
    /// A fresh all-zero row for a pair that has no statistics yet.
    pub fn new(user_id: i64, coin_id: i64) -> Self {
        Self {
            id: 0,
            user_id,
            coin_id,
            buy_total: Decimal::ZERO,
            sell_total: Decimal::ZERO,
            invested_total: Decimal::ZERO,
            invested_avg: Decimal::ZERO,
            realized_total: Decimal::ZERO,
            realized_avg: Decimal::ZERO,
            holdings: Decimal::ZERO,
            fee_total: Decimal::ZERO,
            transactions_count: 0,
            updated_at: Utc::now(),
        }
    }

    /// Folds one committed transaction into the running aggregates.
    ///
    /// `paid` counts toward the invested side on buys and the realized side
    /// on sells; the per-unit averages are recomputed from the running totals
    /// every time, so they stay exact regardless of the order transactions
    /// arrive in.
    pub fn apply(&mut self, transaction: &Transaction) {
        self.buy_total += transaction.buy;
        self.sell_total += transaction.sell;

        if transaction.buy > Decimal::ZERO {
            self.invested_total += transaction.paid;
        }
        if transaction.sell > Decimal::ZERO {
            self.realized_total += transaction.paid;
        }

        self.holdings += transaction.buy - transaction.sell;
        self.fee_total += transaction.fee;
        self.transactions_count += 1;

        self.invested_avg = per_unit(self.invested_total, self.buy_total);
        self.realized_avg = per_unit(self.realized_total, self.sell_total);
    }
}

fn per_unit(total: Decimal, units: Decimal) -> Decimal {
    if units.is_zero() {
        Decimal::ZERO
    } else {
        (total / units).round_dp(DECIMAL_SCALE)
    }
}

/// Database model for coin statistics
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::coin_statistics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StatisticsDB {
    #[diesel(skip_insertion)]
    pub id: i64,
    pub user_id: i64,
    pub coin_id: i64,
    pub buy_total: String,
    pub sell_total: String,
    pub invested_total: String,
    pub invested_avg: String,
    pub realized_total: String,
    pub realized_avg: String,
    pub holdings: String,
    pub fee_total: String,
    pub transactions_count: i64,
    pub updated_at: NaiveDateTime,
}

impl From<StatisticsDB> for Statistics {
    fn from(db: StatisticsDB) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            coin_id: db.coin_id,
            buy_total: decimal_from_db(&db.buy_total, "buy_total"),
            sell_total: decimal_from_db(&db.sell_total, "sell_total"),
            invested_total: decimal_from_db(&db.invested_total, "invested_total"),
            invested_avg: decimal_from_db(&db.invested_avg, "invested_avg"),
            realized_total: decimal_from_db(&db.realized_total, "realized_total"),
            realized_avg: decimal_from_db(&db.realized_avg, "realized_avg"),
            holdings: decimal_from_db(&db.holdings, "holdings"),
            fee_total: decimal_from_db(&db.fee_total, "fee_total"),
            transactions_count: db.transactions_count,
            updated_at: db.updated_at.and_utc(),
        }
    }
}

impl From<&Statistics> for StatisticsDB {
    fn from(domain: &Statistics) -> Self {
        Self {
            id: domain.id,
            user_id: domain.user_id,
            coin_id: domain.coin_id,
            buy_total: decimal_to_db(&domain.buy_total),
            sell_total: decimal_to_db(&domain.sell_total),
            invested_total: decimal_to_db(&domain.invested_total),
            invested_avg: decimal_to_db(&domain.invested_avg),
            realized_total: decimal_to_db(&domain.realized_total),
            realized_avg: decimal_to_db(&domain.realized_avg),
            holdings: decimal_to_db(&domain.holdings),
            fee_total: decimal_to_db(&domain.fee_total),
            transactions_count: domain.transactions_count,
            updated_at: Utc::now().naive_utc(),
        }
    }
}
