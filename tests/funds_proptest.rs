/// Property-based tests for the wallet state machine using proptest
///
/// Arbitrary sequences of holds, releases, debits and deposits are applied to
/// a wallet; whatever succeeds or fails, the funds must stay consistent.
use balance::domain::{Amount, BoundPolicy, LedgerError, Limit, Wallet};
use proptest::prelude::*;

const TIER: i64 = 1;

#[derive(Debug, Clone)]
enum Op {
    Hold(Amount),
    Release(Amount),
    Debit(Amount),
    Deposit(Amount),
    Apply(i64, Amount),
}

fn limit() -> Limit {
    Limit::new(TIER, "anonymous", 0, 15000)
}

fn policy_strategy() -> impl Strategy<Value = BoundPolicy> {
    prop_oneof![
        Just(BoundPolicy::Exclusive),
        Just(BoundPolicy::UpperInclusive),
        Just(BoundPolicy::Inclusive),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let amount = -50i64..6000;
    prop_oneof![
        amount.clone().prop_map(Op::Hold),
        amount.clone().prop_map(Op::Release),
        amount.clone().prop_map(Op::Debit),
        amount.clone().prop_map(Op::Deposit),
        (0i64..4, amount).prop_map(|(kind, amount)| Op::Apply(kind, amount)),
    ]
}

fn run(wallet: &mut Wallet, op: &Op, policy: BoundPolicy) -> Result<(), LedgerError> {
    match *op {
        Op::Hold(amount) => wallet.hold(amount),
        Op::Release(amount) => wallet.release_hold(amount),
        Op::Debit(amount) => wallet.debit(amount),
        Op::Deposit(amount) => wallet.deposit(&limit(), policy, amount),
        Op::Apply(kind, amount) => wallet.apply(&limit(), policy, kind, amount).map(|_| ()),
    }
}

proptest! {
    #[test]
    fn test_hold_never_exceeds_balance(
        initial in 1i64..14999,
        ops in prop::collection::vec(op_strategy(), 0..40),
        policy in policy_strategy(),
    ) {
        let mut wallet = Wallet::create(initial, TIER, &limit(), policy).unwrap();

        for op in &ops {
            let _ = run(&mut wallet, op, policy);
            prop_assert!(wallet.hold_amount() >= 0);
            prop_assert!(wallet.hold_amount() <= wallet.balance());
            prop_assert!(wallet.balance() >= 0);
        }
    }

    #[test]
    fn test_failed_operations_do_not_mutate(
        initial in 1i64..14999,
        ops in prop::collection::vec(op_strategy(), 0..40),
        policy in policy_strategy(),
    ) {
        let mut wallet = Wallet::create(initial, TIER, &limit(), policy).unwrap();

        for op in &ops {
            let before = wallet.clone();
            if run(&mut wallet, op, policy).is_err() {
                prop_assert_eq!(&wallet, &before);
            }
        }
    }

    #[test]
    fn test_successful_deposit_stays_in_bounds(
        initial in 1i64..14999,
        amount in 1i64..20000,
        policy in policy_strategy(),
    ) {
        let mut wallet = Wallet::create(initial, TIER, &limit(), policy).unwrap();

        match wallet.deposit(&limit(), policy, amount) {
            Ok(()) => prop_assert!(limit().permits(wallet.balance(), policy)),
            Err(err) => {
                let is_limit_violation = matches!(err, LedgerError::LimitViolation { .. });
                prop_assert!(is_limit_violation);
                prop_assert_eq!(wallet.balance(), initial);
            }
        }
    }

    #[test]
    fn test_hold_release_roundtrip(
        initial in 1i64..14999,
        already_held in 0i64..14999,
        amount in 1i64..14999,
    ) {
        let mut wallet = Wallet::create(initial, TIER, &limit(), BoundPolicy::Exclusive).unwrap();
        prop_assume!(already_held <= initial);
        if already_held > 0 {
            wallet.hold(already_held).unwrap();
        }

        if wallet.hold(amount).is_ok() {
            wallet.release_hold(amount).unwrap();
        }
        prop_assert_eq!(wallet.hold_amount(), already_held);
        prop_assert_eq!(wallet.balance(), initial);
    }

    #[test]
    fn test_debit_after_hold_reduces_both(
        initial in 1i64..14999,
        extra_hold in 0i64..1000,
        amount in 1i64..14999,
    ) {
        prop_assume!(amount + extra_hold <= initial);
        let mut wallet = Wallet::create(initial, TIER, &limit(), BoundPolicy::Exclusive).unwrap();
        wallet.hold(amount + extra_hold).unwrap();

        wallet.debit(amount).unwrap();
        prop_assert_eq!(wallet.balance(), initial - amount);
        prop_assert_eq!(wallet.hold_amount(), extra_hold);
    }
}
