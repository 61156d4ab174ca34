use super::LedgerError;

/// Money is an integer count of the smallest currency unit.
/// There is a single currency, so no rounding or conversion ever happens.
pub type Amount = i64;

/// Reject zero and negative operation amounts.
pub fn ensure_positive(amount: Amount) -> Result<Amount, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(amount)
}
