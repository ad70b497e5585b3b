use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{COIN_NAME_MAX_LEN, COIN_SYMBOL_MAX_LEN};
use crate::errors::{Error, Result, ValidationError};
use crate::users::normalize_username_lookup;

/// Domain model representing one watchlist entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub symbol: String,
    pub added_at: DateTime<Utc>,
}

/// Input model for adding (or addressing) a watchlist entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoin {
    pub username: String,
    pub name: String,
    pub symbol: String,
}

impl NewCoin {
    /// Normalizes and validates the coin data, returning the canonical form
    /// (title-cased name, uppercased symbol).
    pub fn sanitized(mut self) -> Result<Self> {
        self.username = normalize_username_lookup(&self.username)?;
        self.name = normalize_coin_name(&self.name)?;
        self.symbol = normalize_coin_symbol(&self.symbol)?;
        Ok(self)
    }
}

/// Database model for coins
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::coins)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CoinDB {
    #[diesel(skip_insertion)]
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub symbol: String,
    pub added_at: NaiveDateTime,
}

impl From<CoinDB> for Coin {
    fn from(db: CoinDB) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            symbol: db.symbol,
            added_at: db.added_at.and_utc(),
        }
    }
}

/// Validates a coin name and returns the canonical title-cased form.
pub(crate) fn normalize_coin_name(value: &str) -> Result<String> {
    let value = title_case(value.trim());

    if value.is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            "coin_name".to_string(),
        )));
    }
    if value.len() > COIN_NAME_MAX_LEN {
        return Err(Error::Validation(ValidationError::InvalidInput(format!(
            "Coin name must be at most {} characters.",
            COIN_NAME_MAX_LEN
        ))));
    }

    Ok(value)
}

/// Validates a coin symbol and returns the canonical uppercased form.
/// Symbols carry no whitespace.
pub(crate) fn normalize_coin_symbol(value: &str) -> Result<String> {
    let value = value.trim().to_uppercase();

    if value.is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            "coin_symbol".to_string(),
        )));
    }
    if value.contains(char::is_whitespace) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Coin symbol can't contain whitespace.".to_string(),
        )));
    }
    if value.len() > COIN_SYMBOL_MAX_LEN {
        return Err(Error::Validation(ValidationError::InvalidInput(format!(
            "Coin symbol must be at most {} characters.",
            COIN_SYMBOL_MAX_LEN
        ))));
    }

    Ok(value)
}

/// Uppercases the first letter of every word and lowercases the rest,
/// preserving the original separators.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_alpha = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_is_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(c);
            prev_is_alpha = false;
        }
    }

    out
}
