use std::sync::Arc;

use crate::domain::{
    Amount, BoundPolicy, LedgerError, Limit, TierId, TransactionKind, Wallet, WalletId,
};
use crate::storage::{Repository, StoredWallet, WalletLocks};

use super::{AppError, EventKind, LogNotifier, Notifier, WalletEvent};

/// Application service providing the wallet operations.
/// This is the primary interface for any client (CLI, API, etc.).
pub struct WalletService {
    repo: Repository,
    locks: WalletLocks,
    notifier: Arc<dyn Notifier>,
    policy: BoundPolicy,
}

/// A wallet together with the limit of its identification level
#[derive(Debug, Clone)]
pub struct WalletInfo {
    pub wallet: Wallet,
    pub limit: Limit,
    /// Store version the wallet was read or written at
    pub version: i64,
}

/// Result of applying a typed transaction
#[derive(Debug, Clone)]
pub struct TransactionResult {
    pub info: WalletInfo,
    pub kind: TransactionKind,
    pub amount: Amount,
}

impl WalletService {
    /// Create a new service over the given repository.
    /// Events go to the log and tier bounds are exclusive until configured otherwise.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            locks: WalletLocks::new(),
            notifier: Arc::new(LogNotifier),
            policy: BoundPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BoundPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn policy(&self) -> BoundPolicy {
        self.policy
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Limit catalog
    // ========================

    /// Get the limit of an identification level.
    pub async fn get_limit(&self, tier: TierId) -> Result<Limit, AppError> {
        self.repo
            .get_limit(tier)
            .await?
            .ok_or(AppError::LimitNotFound(tier))
    }

    /// List all identification levels.
    pub async fn list_limits(&self) -> Result<Vec<Limit>, AppError> {
        Ok(self.repo.list_limits().await?)
    }

    // ========================
    // Wallet operations
    // ========================

    /// Open a wallet with `initial_balance` on identification level `tier`.
    pub async fn create_wallet(
        &self,
        initial_balance: Amount,
        tier: TierId,
    ) -> Result<WalletInfo, AppError> {
        let limit = self.get_limit(tier).await?;
        let mut wallet =
            Wallet::create(initial_balance, tier, &limit, self.policy).inspect_err(|e| {
                tracing::info!(tier, initial_balance, error = %e, "wallet creation rejected");
            })?;
        self.repo.insert_wallet(&mut wallet).await?;

        tracing::info!(
            wallet_id = wallet.id,
            tier,
            balance = wallet.balance(),
            "wallet created"
        );
        self.notify(WalletEvent::new(EventKind::Created, &wallet, &limit).with_amount(initial_balance));

        Ok(WalletInfo {
            wallet,
            limit,
            version: 0,
        })
    }

    /// Fetch a wallet and its limit.
    pub async fn get_wallet(&self, id: WalletId) -> Result<WalletInfo, AppError> {
        let StoredWallet { wallet, version } = self.load_wallet(id).await?;
        let limit = self.get_limit(wallet.identification_level).await?;

        self.notify(WalletEvent::new(EventKind::Fetched, &wallet, &limit));
        Ok(WalletInfo {
            wallet,
            limit,
            version,
        })
    }

    /// Reserve `amount` of the wallet's available funds.
    pub async fn hold(&self, id: WalletId, amount: Amount) -> Result<WalletInfo, AppError> {
        let (info, ()) = self
            .mutate(id, "hold", |wallet, _, _| wallet.hold(amount))
            .await?;

        self.notify(WalletEvent::new(EventKind::Held, &info.wallet, &info.limit).with_amount(amount));
        Ok(info)
    }

    /// Release `amount` of previously held funds.
    pub async fn release_hold(&self, id: WalletId, amount: Amount) -> Result<WalletInfo, AppError> {
        let (info, ()) = self
            .mutate(id, "release_hold", |wallet, _, _| wallet.release_hold(amount))
            .await?;

        self.notify(
            WalletEvent::new(EventKind::Released, &info.wallet, &info.limit).with_amount(amount),
        );
        Ok(info)
    }

    /// Apply a debit (kind 1) or deposit (kind 2).
    pub async fn apply_transaction(
        &self,
        id: WalletId,
        kind_code: i64,
        amount: Amount,
    ) -> Result<TransactionResult, AppError> {
        let (info, kind) = self
            .mutate(id, "apply_transaction", |wallet, limit, policy| {
                wallet.apply(limit, policy, kind_code, amount)
            })
            .await?;

        self.notify(
            WalletEvent::new(EventKind::Edited, &info.wallet, &info.limit)
                .with_amount(amount)
                .with_transaction(kind),
        );
        Ok(TransactionResult { info, kind, amount })
    }

    /// Debit `amount` of held funds.
    pub async fn debit(&self, id: WalletId, amount: Amount) -> Result<TransactionResult, AppError> {
        self.apply_transaction(id, TransactionKind::Debit.code(), amount)
            .await
    }

    /// Deposit `amount` within the tier limit.
    pub async fn deposit(&self, id: WalletId, amount: Amount) -> Result<TransactionResult, AppError> {
        self.apply_transaction(id, TransactionKind::Deposit.code(), amount)
            .await
    }

    // ========================
    // Internals
    // ========================

    /// Run one read-modify-write cycle on a wallet under its lock.
    /// Nothing is written when `op` fails.
    async fn mutate<T, F>(
        &self,
        id: WalletId,
        operation: &'static str,
        op: F,
    ) -> Result<(WalletInfo, T), AppError>
    where
        F: FnOnce(&mut Wallet, &Limit, BoundPolicy) -> Result<T, LedgerError>,
    {
        let _guard = self.locks.acquire(id).await;

        let mut stored = self.load_wallet(id).await?;
        let limit = self.get_limit(stored.wallet.identification_level).await?;

        let output = op(&mut stored.wallet, &limit, self.policy).inspect_err(|e| {
            tracing::info!(wallet_id = id, operation, error = %e, "wallet operation rejected");
        })?;

        if !self.repo.replace_wallet(&mut stored).await? {
            tracing::warn!(wallet_id = id, operation, "wallet changed underneath the lock");
            return Err(AppError::ConcurrentModification(id));
        }

        let StoredWallet { wallet, version } = stored;
        tracing::info!(
            wallet_id = id,
            operation,
            balance = wallet.balance(),
            hold = wallet.hold_amount(),
            version,
            "wallet updated"
        );
        Ok((
            WalletInfo {
                wallet,
                limit,
                version,
            },
            output,
        ))
    }

    async fn load_wallet(&self, id: WalletId) -> Result<StoredWallet, AppError> {
        self.repo
            .get_wallet(id)
            .await?
            .ok_or(AppError::WalletNotFound(id))
    }

    fn notify(&self, event: WalletEvent) {
        if let Err(e) = self.notifier.publish(&event) {
            tracing::warn!(
                event = %event.kind,
                wallet_id = event.wallet.wallet_id,
                error = %e,
                "failed to publish wallet event"
            );
        }
    }
}
