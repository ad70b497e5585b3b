// Module declarations
pub(crate) mod transactions_errors;
pub(crate) mod transactions_model;
pub(crate) mod transactions_repository;
pub(crate) mod transactions_service;


// Re-export the public interface
pub use transactions_errors::DerivationError;
pub use transactions_model::{NewTransaction, Transaction, TransactionDB, TransactionInput};
pub use transactions_repository::TransactionRepository;
pub use transactions_service::{RecordTransaction, TransactionService};
