use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transactions_errors::DerivationError;
use crate::constants::DECIMAL_SCALE;
use crate::utils::{decimal_from_db, decimal_to_db};

/// Domain model representing one immutable ledger entry.
///
/// Exactly one of `buy`/`sell` is strictly positive; `paid` and
/// `average_price` are both resolved by [`TransactionInput::resolve`] before
/// the row is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub coin_id: i64,
    pub buy: Decimal,
    pub sell: Decimal,
    pub paid: Decimal,
    pub average_price: Decimal,
    pub fee: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Monetary fields of a submitted transaction, before derivation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct TransactionInput {
    pub buy: Decimal,
    pub sell: Decimal,
    pub paid: Decimal,
    pub average_price: Decimal,
    pub fee: Decimal,
}

impl TransactionInput {
    /// Resolves the `{paid, average_price}` pair from whichever of the two
    /// was submitted, or validates the free-transfer case.
    ///
    /// The fee handling is asymmetric on purpose: deriving `paid` from
    /// `average_price` subtracts the fee (clamped at zero), while deriving
    /// `average_price` from `paid` folds the fee into the rate.
    pub fn resolve(mut self) -> Result<Self, DerivationError> {
        for (name, value) in [
            ("buy", self.buy),
            ("sell", self.sell),
            ("paid", self.paid),
            ("average_price", self.average_price),
            ("fee", self.fee),
        ] {
            if value < Decimal::ZERO {
                return Err(DerivationError::NegativeAmount(name));
            }
        }

        if self.buy > Decimal::ZERO && self.sell > Decimal::ZERO {
            return Err(DerivationError::InvalidDirection);
        }
        if self.buy.is_zero() && self.sell.is_zero() {
            return Err(DerivationError::InvalidDirection);
        }

        let units = if self.buy > Decimal::ZERO {
            self.buy
        } else {
            self.sell
        };

        if self.paid > Decimal::ZERO && self.average_price > Decimal::ZERO {
            return Err(DerivationError::AmbiguousPrice);
        }

        if self.paid.is_zero() && self.average_price.is_zero() {
            // A free transfer: no money moved, nothing to derive.
            if self.fee.is_zero() {
                return Ok(self);
            }
            return Err(DerivationError::MissingPrice);
        }

        if self.average_price > Decimal::ZERO {
            self.paid = (units * self.average_price - self.fee).max(Decimal::ZERO);
        } else {
            if units.is_zero() {
                return Err(DerivationError::ZeroUnits);
            }
            self.average_price = ((self.paid + self.fee) / units).round_dp(DECIMAL_SCALE);
        }

        Ok(self)
    }
}

/// Input model for appending a ledger entry. `amounts` must already be
/// resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub user_id: i64,
    pub coin_id: i64,
    #[serde(flatten)]
    pub amounts: TransactionInput,
}

/// Database model for ledger entries
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::coin_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    #[diesel(skip_insertion)]
    pub id: i64,
    pub user_id: i64,
    pub coin_id: i64,
    pub buy: String,
    pub sell: String,
    pub paid: String,
    pub average_price: String,
    pub fee: String,
    pub created_at: NaiveDateTime,
}

impl From<TransactionDB> for Transaction {
    fn from(db: TransactionDB) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            coin_id: db.coin_id,
            buy: decimal_from_db(&db.buy, "buy"),
            sell: decimal_from_db(&db.sell, "sell"),
            paid: decimal_from_db(&db.paid, "paid"),
            average_price: decimal_from_db(&db.average_price, "average_price"),
            fee: decimal_from_db(&db.fee, "fee"),
            created_at: db.created_at.and_utc(),
        }
    }
}

impl From<&NewTransaction> for TransactionDB {
    fn from(domain: &NewTransaction) -> Self {
        Self {
            id: 0,
            user_id: domain.user_id,
            coin_id: domain.coin_id,
            buy: decimal_to_db(&domain.amounts.buy),
            sell: decimal_to_db(&domain.amounts.sell),
            paid: decimal_to_db(&domain.amounts.paid),
            average_price: decimal_to_db(&domain.amounts.average_price),
            fee: decimal_to_db(&domain.amounts.fee),
            created_at: Utc::now().naive_utc(),
        }
    }
}
