use log::{info, warn};
use std::sync::Arc;

use super::coins_model::{normalize_coin_name, normalize_coin_symbol, Coin, NewCoin};
use super::coins_repository::CoinRepository;
use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::users::{normalize_username_lookup, UserRepository};

/// Service for managing per-user coin watchlists
pub struct CoinService {
    user_repository: Arc<UserRepository>,
    repository: Arc<CoinRepository>,
}

impl CoinService {
    /// Creates a new CoinService instance
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            user_repository: Arc::new(UserRepository::new(pool.clone())),
            repository: Arc::new(CoinRepository::new(pool)),
        }
    }

    /// Adds a coin to a user's watchlist
    pub async fn add_coin(&self, new_coin: NewCoin) -> Result<Coin> {
        let new_coin = new_coin.sanitized()?;
        let user_id = self.user_repository.find_id_by_username(&new_coin.username)?;

        let coin = self
            .repository
            .create(user_id, &new_coin.name, &new_coin.symbol)?;

        info!(
            "Coin '{}' ({}) added for user '{}'.",
            coin.name, coin.symbol, new_coin.username
        );
        Ok(coin)
    }

    /// Lists a user's watchlist. An unknown user simply has no coins.
    pub fn list_coins(&self, username: &str) -> Result<Vec<Coin>> {
        let username = normalize_username_lookup(username)?;

        let user_id = match self.user_repository.find_id_by_username(&username) {
            Ok(id) => id,
            Err(Error::NotFound(_)) => {
                warn!("No coins to list: user '{}' not found.", username);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        self.repository.list_for_user(user_id)
    }

    /// Resolves a (user, coin name, coin symbol) triple to the coin id
    pub fn get_coin_id(&self, user_id: i64, name: &str, symbol: &str) -> Result<i64> {
        let name = normalize_coin_name(name)?;
        let symbol = normalize_coin_symbol(symbol)?;
        self.repository.find_id(user_id, &name, &symbol)
    }

    /// Removes a coin from a user's watchlist, cascading to its transactions
    /// and statistics row.
    pub async fn delete_coin(&self, username: &str, name: &str, symbol: &str) -> Result<()> {
        let username = normalize_username_lookup(username)?;
        let name = normalize_coin_name(name)?;
        let symbol = normalize_coin_symbol(symbol)?;

        let user_id = self.user_repository.find_id_by_username(&username)?;
        self.repository.delete(user_id, &name, &symbol)?;

        info!(
            "Coin '{}' ({}) deleted for user '{}'.",
            name, symbol, username
        );
        Ok(())
    }
}
