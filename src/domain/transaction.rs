use serde::{Deserialize, Serialize};

use super::LedgerError;

pub const TRANSACTION_KIND_DEBIT: i64 = 1;
pub const TRANSACTION_KIND_DEPOSIT: i64 = 2;

/// A balance-changing transaction applied through `Wallet::apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Permanent reduction of the balance against previously held funds
    Debit,
    /// Permanent increase of the balance, bounded by the tier limit
    Deposit,
}

impl TransactionKind {
    pub fn code(&self) -> i64 {
        match self {
            TransactionKind::Debit => TRANSACTION_KIND_DEBIT,
            TransactionKind::Deposit => TRANSACTION_KIND_DEPOSIT,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, LedgerError> {
        match code {
            TRANSACTION_KIND_DEBIT => Ok(TransactionKind::Debit),
            TRANSACTION_KIND_DEPOSIT => Ok(TransactionKind::Deposit),
            other => Err(LedgerError::UnknownTransactionType(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Debit => "debit",
            TransactionKind::Deposit => "deposit",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
