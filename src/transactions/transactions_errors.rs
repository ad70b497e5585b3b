use thiserror::Error;

/// Failures while resolving the monetary fields of a submitted transaction.
///
/// All of these are rejected before anything touches storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("exactly one of 'buy' or 'sell' must be greater than zero")]
    InvalidDirection,

    #[error("'paid' and 'average_price' cannot both be set at the same time")]
    AmbiguousPrice,

    #[error("either 'paid' or 'average_price' must be set unless the transaction is free (fee = 0)")]
    MissingPrice,

    #[error("cannot calculate 'average_price' with zero units")]
    ZeroUnits,

    #[error("'{0}' must not be negative")]
    NegativeAmount(&'static str),
}
