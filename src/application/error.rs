use serde::Serialize;
use thiserror::Error;

use crate::domain::{LedgerError, TierId, WalletId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("Identification level not found: {0}")]
    LimitNotFound(TierId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Wallet {0} was modified concurrently, nothing was written")]
    ConcurrentModification(WalletId),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// True for outcomes caused by the request itself rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Database(_))
    }

    /// Message safe to show to a caller; store failures are not described.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Internal storage error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Stable machine-readable name of the failure.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::WalletNotFound(_) => "wallet_not_found",
            AppError::LimitNotFound(_) => "limit_not_found",
            AppError::Ledger(_) => "rejected",
            AppError::ConcurrentModification(_) => "conflict",
            AppError::Database(_) => "internal",
        }
    }

    /// Sanitised error as reported to a caller.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.client_message(),
        }
    }
}

/// Error envelope printed for a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}
