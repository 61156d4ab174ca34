use serde::{Deserialize, Serialize};

use super::{Amount, LedgerError};

/// Identification level of a wallet. Each level has exactly one Limit row.
pub type TierId = i64;

pub const IDENTIFICATION_LEVEL_ANONYMOUS: TierId = 1;
pub const IDENTIFICATION_LEVEL_SIMPLIFIED: TierId = 2;
pub const IDENTIFICATION_LEVEL_FULL: TierId = 3;

/// How the `balance_min` / `balance_max` pair of a Limit is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundPolicy {
    /// `balance_min < balance < balance_max`
    #[default]
    Exclusive,
    /// `balance_min < balance <= balance_max`
    UpperInclusive,
    /// `balance_min <= balance <= balance_max`
    Inclusive,
}

impl BoundPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundPolicy::Exclusive => "exclusive",
            BoundPolicy::UpperInclusive => "upper-inclusive",
            BoundPolicy::Inclusive => "inclusive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "exclusive" => Some(BoundPolicy::Exclusive),
            "upper-inclusive" | "upper_inclusive" => Some(BoundPolicy::UpperInclusive),
            "inclusive" => Some(BoundPolicy::Inclusive),
            _ => None,
        }
    }

    pub fn contains(&self, balance: Amount, balance_min: Amount, balance_max: Amount) -> bool {
        match self {
            BoundPolicy::Exclusive => balance_min < balance && balance < balance_max,
            BoundPolicy::UpperInclusive => balance_min < balance && balance <= balance_max,
            BoundPolicy::Inclusive => balance_min <= balance && balance <= balance_max,
        }
    }

    /// Render the admissible range, e.g. `0 < balance <= 10000`.
    pub fn describe(&self, balance_min: Amount, balance_max: Amount) -> String {
        let (low, high) = match self {
            BoundPolicy::Exclusive => ("<", "<"),
            BoundPolicy::UpperInclusive => ("<", "<="),
            BoundPolicy::Inclusive => ("<=", "<="),
        };
        format!("{} {} balance {} {}", balance_min, low, high, balance_max)
    }
}

impl std::fmt::Display for BoundPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Balance range permitted for one identification level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub id: TierId,
    /// Human name of the identification level ("anonymous", "full", ...)
    pub name: String,
    pub balance_min: Amount,
    pub balance_max: Amount,
}

impl Limit {
    pub fn new(id: TierId, name: impl Into<String>, balance_min: Amount, balance_max: Amount) -> Self {
        Self {
            id,
            name: name.into(),
            balance_min,
            balance_max,
        }
    }

    pub fn permits(&self, balance: Amount, policy: BoundPolicy) -> bool {
        policy.contains(balance, self.balance_min, self.balance_max)
    }

    /// Validate a prospective balance against this tier.
    pub fn check(&self, balance: Amount, policy: BoundPolicy) -> Result<(), LedgerError> {
        if self.permits(balance, policy) {
            Ok(())
        } else {
            Err(self.violation(balance, policy))
        }
    }

    /// Error for a balance that falls outside this tier.
    pub fn violation(&self, balance: Amount, policy: BoundPolicy) -> LedgerError {
        LedgerError::LimitViolation {
            balance,
            balance_min: self.balance_min,
            balance_max: self.balance_max,
            policy,
        }
    }

    /// The limit must describe the tier it is applied to.
    pub fn ensure_tier(&self, tier: TierId) -> Result<(), LedgerError> {
        if self.id != tier {
            return Err(LedgerError::TierMismatch {
                wallet_tier: tier,
                limit_tier: self.id,
            });
        }
        Ok(())
    }
}
