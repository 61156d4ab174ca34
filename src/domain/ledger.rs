use std::fmt;

use super::{Amount, BoundPolicy, TierId};

/// Deterministic failures of the wallet state machine.
/// A ledger error never leaves a wallet partially mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Zero or negative amount supplied to an operation
    InvalidAmount(Amount),
    /// Hold requested beyond the available (non-held) balance
    InsufficientFunds { available: Amount, requested: Amount },
    /// Release or debit requested beyond the held amount
    InsufficientHold { held: Amount, requested: Amount },
    /// Resulting balance falls outside the tier bounds
    LimitViolation {
        balance: Amount,
        balance_min: Amount,
        balance_max: Amount,
        policy: BoundPolicy,
    },
    /// Transaction kind code is neither debit nor deposit
    UnknownTransactionType(i64),
    /// The limit supplied does not belong to the wallet's tier
    TierMismatch { wallet_tier: TierId, limit_tier: TierId },
    /// A balance/hold pair that breaks `0 <= hold <= balance`
    InvalidFunds { balance: Amount, hold: Amount },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InvalidAmount(amount) => {
                write!(f, "Amount must be positive, got {}", amount)
            }
            LedgerError::InsufficientFunds {
                available,
                requested,
            } => write!(
                f,
                "Insufficient funds: available {}, requested {}",
                available, requested
            ),
            LedgerError::InsufficientHold { held, requested } => write!(
                f,
                "Insufficient hold: held {}, requested {}",
                held, requested
            ),
            LedgerError::LimitViolation {
                balance,
                balance_min,
                balance_max,
                policy,
            } => write!(
                f,
                "Balance {} is outside the tier limit {} ({} bounds)",
                balance,
                policy.describe(*balance_min, *balance_max),
                policy
            ),
            LedgerError::UnknownTransactionType(code) => {
                write!(f, "Unknown transaction type: {}", code)
            }
            LedgerError::TierMismatch {
                wallet_tier,
                limit_tier,
            } => write!(
                f,
                "Limit for tier {} cannot be applied to a wallet of tier {}",
                limit_tier, wallet_tier
            ),
            LedgerError::InvalidFunds { balance, hold } => write!(
                f,
                "Invalid funds: hold {} must be between 0 and balance {}",
                hold, balance
            ),
        }
    }
}

impl std::error::Error for LedgerError {}
