//! Error types for input validation and wallet interaction.

use thiserror::Error;

/// A user-supplied value could not be turned into contract-call arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("token contract address is required for token transfers")]
    MissingTokenContract,
    #[error("invalid contract reference '{0}': expected <issuer>.<name>")]
    MalformedContractRef(String),
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("token amount '{0}' must be a whole number of base units")]
    FractionalTokenAmount(String),
    #[error("amount '{0}' exceeds the uint range")]
    AmountOverflow(String),
    #[error("unknown transfer mode '{0}': expected stx or token")]
    UnknownMode(String),
}

/// Reason a submission attempt was refused before the wallet was contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please provide between {min} and {max} valid addresses (found {count})")]
    RecipientCount { count: usize, min: usize, max: usize },
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Failure reported by the wallet layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("request was rejected in the wallet")]
    Rejected,
    #[error("wallet error: {0}")]
    Provider(String),
}

/// Connecting or disconnecting the wallet failed; session state is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("wallet connection failed: {0}")]
pub struct ConnectionError(#[from] pub WalletError);
