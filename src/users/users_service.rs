use log::info;
use std::sync::Arc;

use super::users_model::{NewUser, User, UserCredentials};
use super::users_repository::UserRepository;
use crate::db::{DbPool, DbTransactionExecutor};
use crate::errors::{Error, Result};

/// Service for managing user accounts
pub struct UserService {
    pool: Arc<DbPool>,
    repository: Arc<UserRepository>,
}

impl UserService {
    /// Creates a new UserService instance
    pub fn new(pool: Arc<DbPool>) -> Self {
        let repository = Arc::new(UserRepository::new(pool.clone()));
        Self { pool, repository }
    }

    /// Registers a new user account
    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let user = self.repository.create(new_user)?;
        info!("User created: username='{}', email='{}'.", user.username, user.email);
        Ok(user)
    }

    /// Retrieves a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.repository.get_by_username(username)
    }

    /// Lists all registered users
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.repository.list()
    }

    /// Deletes a user account, cascading to its coins, transactions and
    /// statistics. Requires the full credential triple to match; a bare
    /// username is not enough to destroy an account.
    pub async fn delete_user(&self, credentials: UserCredentials) -> Result<User> {
        let credentials = credentials.sanitized()?;
        let password_hash = credentials.credential_hash();
        let repository = self.repository.clone();

        let deleted = self.pool.execute(move |tx_conn| {
            let user = repository
                .find_by_credentials_in_transaction(
                    tx_conn,
                    &credentials.username,
                    &credentials.email,
                    &password_hash,
                )?
                .ok_or_else(|| {
                    Error::NotFound(format!(
                        "User '{}' with the provided email and password not found.",
                        credentials.username
                    ))
                })?;

            repository.delete_in_transaction(tx_conn, user.id)?;
            Ok(User::from(user))
        })?;

        info!("User deleted: username='{}'.", deleted.username);
        Ok(deleted)
    }
}
