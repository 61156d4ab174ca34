use serde::{Deserialize, Serialize};

use super::{ensure_positive, Amount, LedgerError};

/// Balance and hold of a wallet.
///
/// A `Funds` value always satisfies `0 <= hold <= balance`. Every transition
/// returns a fresh value, so a failed transition leaves the receiver untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFunds", into = "RawFunds")]
pub struct Funds {
    balance: Amount,
    hold: Amount,
}

#[derive(Serialize, Deserialize)]
struct RawFunds {
    balance: Amount,
    hold: Amount,
}

impl Funds {
    pub fn new(balance: Amount, hold: Amount) -> Result<Self, LedgerError> {
        if hold < 0 || balance < hold {
            return Err(LedgerError::InvalidFunds { balance, hold });
        }
        Ok(Self { balance, hold })
    }

    /// Fresh funds with nothing held.
    pub fn opening(balance: Amount) -> Result<Self, LedgerError> {
        if balance < 0 {
            return Err(LedgerError::InvalidAmount(balance));
        }
        Self::new(balance, 0)
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn hold(&self) -> Amount {
        self.hold
    }

    /// Funds not reserved by a hold.
    pub fn available(&self) -> Amount {
        self.balance - self.hold
    }

    pub fn with_hold(&self, amount: Amount) -> Result<Self, LedgerError> {
        let amount = ensure_positive(amount)?;
        if amount > self.available() {
            return Err(LedgerError::InsufficientFunds {
                available: self.available(),
                requested: amount,
            });
        }
        Self::new(self.balance, self.hold + amount)
    }

    pub fn without_hold(&self, amount: Amount) -> Result<Self, LedgerError> {
        let amount = ensure_positive(amount)?;
        if self.hold < amount {
            return Err(LedgerError::InsufficientHold {
                held: self.hold,
                requested: amount,
            });
        }
        Self::new(self.balance, self.hold - amount)
    }

    /// Release `amount` from the hold and remove it from the balance.
    pub fn debited(&self, amount: Amount) -> Result<Self, LedgerError> {
        let released = self.without_hold(amount)?;
        Self::new(released.balance - amount, released.hold)
    }

    /// Add `amount` to the balance. Tier bounds are the caller's concern.
    ///
    /// `None` when `amount` is not positive or the balance would overflow.
    pub fn deposited(&self, amount: Amount) -> Option<Self> {
        if amount <= 0 {
            return None;
        }
        let balance = self.balance.checked_add(amount)?;
        Some(Self {
            balance,
            hold: self.hold,
        })
    }
}

impl TryFrom<RawFunds> for Funds {
    type Error = LedgerError;

    fn try_from(raw: RawFunds) -> Result<Self, Self::Error> {
        Funds::new(raw.balance, raw.hold)
    }
}

impl From<Funds> for RawFunds {
    fn from(funds: Funds) -> Self {
        RawFunds {
            balance: funds.balance,
            hold: funds.hold,
        }
    }
}
