use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ensure_positive, Amount, BoundPolicy, Funds, LedgerError, Limit, TierId, TransactionKind};

pub type WalletId = i64;

/// A per-user wallet: funds plus the identification level that selects its Limit.
///
/// Operations validate against a private copy of the funds and only assign it
/// back on success, so a failed operation leaves the wallet unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Assigned by the repository on insert; 0 until then
    pub id: WalletId,
    pub funds: Funds,
    pub identification_level: TierId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Open a new wallet with `initial_balance` and nothing held.
    pub fn create(
        initial_balance: Amount,
        tier: TierId,
        limit: &Limit,
        policy: BoundPolicy,
    ) -> Result<Self, LedgerError> {
        limit.ensure_tier(tier)?;
        let funds = Funds::opening(initial_balance)?;
        limit.check(funds.balance(), policy)?;

        let now = Utc::now();
        Ok(Self {
            id: 0,
            funds,
            identification_level: tier,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn balance(&self) -> Amount {
        self.funds.balance()
    }

    pub fn hold_amount(&self) -> Amount {
        self.funds.hold()
    }

    pub fn available(&self) -> Amount {
        self.funds.available()
    }

    /// Reserve `amount` against the available balance.
    pub fn hold(&mut self, amount: Amount) -> Result<(), LedgerError> {
        let funds = self.funds.with_hold(amount)?;
        self.commit(funds);
        Ok(())
    }

    /// Give back `amount` of previously held funds.
    pub fn release_hold(&mut self, amount: Amount) -> Result<(), LedgerError> {
        let funds = self.funds.without_hold(amount)?;
        self.commit(funds);
        Ok(())
    }

    /// Remove `amount` from the balance. The amount must already be held.
    pub fn debit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        let funds = self.funds.debited(amount)?;
        self.commit(funds);
        Ok(())
    }

    /// Add `amount` to the balance if the result stays within the tier limit.
    pub fn deposit(
        &mut self,
        limit: &Limit,
        policy: BoundPolicy,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        limit.ensure_tier(self.identification_level)?;
        let amount = ensure_positive(amount)?;
        let funds = self
            .funds
            .deposited(amount)
            .ok_or_else(|| limit.violation(self.balance().saturating_add(amount), policy))?;
        limit.check(funds.balance(), policy)?;
        self.commit(funds);
        Ok(())
    }

    /// Dispatch a typed transaction by its kind code.
    pub fn apply(
        &mut self,
        limit: &Limit,
        policy: BoundPolicy,
        kind_code: i64,
        amount: Amount,
    ) -> Result<TransactionKind, LedgerError> {
        let amount = ensure_positive(amount)?;
        let kind = TransactionKind::from_code(kind_code)?;
        match kind {
            TransactionKind::Debit => self.debit(amount)?,
            TransactionKind::Deposit => self.deposit(limit, policy, amount)?,
        }
        Ok(kind)
    }

    fn commit(&mut self, funds: Funds) {
        self.funds = funds;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IDENTIFICATION_LEVEL_ANONYMOUS;

    fn limit() -> Limit {
        Limit::new(IDENTIFICATION_LEVEL_ANONYMOUS, "anonymous", 0, 10000)
    }

    fn wallet(balance: Amount) -> Wallet {
        Wallet::create(
            balance,
            IDENTIFICATION_LEVEL_ANONYMOUS,
            &limit(),
            BoundPolicy::Exclusive,
        )
        .unwrap()
    }

    #[test]
    fn test_create_within_limit() {
        let wallet = wallet(5000);
        assert_eq!(wallet.balance(), 5000);
        assert_eq!(wallet.hold_amount(), 0);
        assert_eq!(wallet.identification_level, IDENTIFICATION_LEVEL_ANONYMOUS);
        assert_eq!(wallet.created_at, wallet.updated_at);
    }

    #[test]
    fn test_create_outside_limit() {
        let result = Wallet::create(
            10000,
            IDENTIFICATION_LEVEL_ANONYMOUS,
            &limit(),
            BoundPolicy::Exclusive,
        );
        assert!(matches!(result, Err(LedgerError::LimitViolation { .. })));

        // The same balance is fine once the upper bound is inclusive
        let result = Wallet::create(
            10000,
            IDENTIFICATION_LEVEL_ANONYMOUS,
            &limit(),
            BoundPolicy::UpperInclusive,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_create_with_foreign_limit() {
        let result = Wallet::create(5000, 3, &limit(), BoundPolicy::Exclusive);
        assert!(matches!(result, Err(LedgerError::TierMismatch { .. })));
    }

    #[test]
    fn test_hold_beyond_balance() {
        let mut wallet = wallet(5000);
        let before = wallet.clone();

        assert_eq!(
            wallet.hold(6000),
            Err(LedgerError::InsufficientFunds {
                available: 5000,
                requested: 6000
            })
        );
        assert_eq!(wallet, before);
    }

    #[test]
    fn test_hold_then_debit() {
        let mut wallet = wallet(5000);
        wallet.hold(2000).unwrap();
        assert_eq!(wallet.hold_amount(), 2000);
        assert_eq!(wallet.available(), 3000);

        wallet.debit(2000).unwrap();
        assert_eq!(wallet.balance(), 3000);
        assert_eq!(wallet.hold_amount(), 0);
    }

    #[test]
    fn test_release_without_hold() {
        let mut wallet = wallet(5000);
        assert_eq!(
            wallet.release_hold(100),
            Err(LedgerError::InsufficientHold {
                held: 0,
                requested: 100
            })
        );
    }

    #[test]
    fn test_deposit_over_limit_is_rolled_back() {
        let mut wallet = wallet(3000);
        let before = wallet.clone();

        let err = wallet
            .deposit(&limit(), BoundPolicy::Exclusive, 8000)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::LimitViolation { balance: 11000, .. }
        ));
        assert_eq!(wallet, before);
        assert_eq!(wallet.balance(), 3000);
    }

    #[test]
    fn test_deposit_keeps_hold() {
        let mut wallet = wallet(3000);
        wallet.hold(1000).unwrap();
        wallet.deposit(&limit(), BoundPolicy::Exclusive, 500).unwrap();

        assert_eq!(wallet.balance(), 3500);
        assert_eq!(wallet.hold_amount(), 1000);
    }

    #[test]
    fn test_deposit_overflow_reports_the_wallet_tier() {
        let open = Limit::new(IDENTIFICATION_LEVEL_ANONYMOUS, "anonymous", 0, Amount::MAX);
        let mut wallet = Wallet::create(
            Amount::MAX - 1,
            IDENTIFICATION_LEVEL_ANONYMOUS,
            &open,
            BoundPolicy::Inclusive,
        )
        .unwrap();
        let before = wallet.clone();

        assert_eq!(
            wallet.deposit(&open, BoundPolicy::Inclusive, 10),
            Err(LedgerError::LimitViolation {
                balance: Amount::MAX,
                balance_min: 0,
                balance_max: Amount::MAX,
                policy: BoundPolicy::Inclusive,
            })
        );
        assert_eq!(wallet, before);
    }

    #[test]
    fn test_apply_dispatches_by_kind() {
        let mut wallet = wallet(3000);
        wallet.hold(1000).unwrap();

        let kind = wallet
            .apply(&limit(), BoundPolicy::Exclusive, 1, 1000)
            .unwrap();
        assert_eq!(kind, TransactionKind::Debit);
        assert_eq!(wallet.balance(), 2000);

        let kind = wallet
            .apply(&limit(), BoundPolicy::Exclusive, 2, 500)
            .unwrap();
        assert_eq!(kind, TransactionKind::Deposit);
        assert_eq!(wallet.balance(), 2500);
    }

    #[test]
    fn test_apply_unknown_kind() {
        let mut wallet = wallet(3000);
        assert_eq!(
            wallet.apply(&limit(), BoundPolicy::Exclusive, 99, 100),
            Err(LedgerError::UnknownTransactionType(99))
        );
    }

    #[test]
    fn test_apply_checks_amount_before_kind() {
        let mut wallet = wallet(3000);
        assert_eq!(
            wallet.apply(&limit(), BoundPolicy::Exclusive, 99, 0),
            Err(LedgerError::InvalidAmount(0))
        );
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let mut wallet = wallet(3000);
        assert_eq!(wallet.hold(0), Err(LedgerError::InvalidAmount(0)));
        assert_eq!(wallet.release_hold(-1), Err(LedgerError::InvalidAmount(-1)));
        assert_eq!(wallet.debit(0), Err(LedgerError::InvalidAmount(0)));
        assert_eq!(
            wallet.deposit(&limit(), BoundPolicy::Exclusive, -5),
            Err(LedgerError::InvalidAmount(-5))
        );
    }
}
