//! Wallet notifications.
//!
//! Every successful request publishes one [`WalletEvent`] carrying the
//! wallet's post-operation state. Publishing is fire-and-forget: a failing
//! notifier is logged by the service and never fails the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{Amount, Limit, TierId, TransactionKind, Wallet, WalletId};

/// Name of the operation that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "holded")]
    Held,
    #[serde(rename = "disholded")]
    Released,
    #[serde(rename = "edited")]
    Edited,
    #[serde(rename = "got")]
    Fetched,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Held => "holded",
            EventKind::Released => "disholded",
            EventKind::Edited => "edited",
            EventKind::Fetched => "got",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    pub id: TierId,
    pub name: String,
}

/// Snapshot of a wallet as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletData {
    pub wallet_id: WalletId,
    pub balance: Amount,
    pub hold: Amount,
    pub identification: Identification,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletData {
    pub fn new(wallet: &Wallet, limit: &Limit) -> Self {
        Self {
            wallet_id: wallet.id,
            balance: wallet.balance(),
            hold: wallet.hold_amount(),
            identification: Identification {
                id: limit.id,
                name: limit.name.clone(),
            },
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub occurred_at: DateTime<Utc>,
    /// Amount moved by the operation; absent for fetches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    /// Set for `edited` events only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionKind>,
    pub wallet: WalletData,
}

impl WalletEvent {
    pub fn new(kind: EventKind, wallet: &Wallet, limit: &Limit) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            occurred_at: Utc::now(),
            amount: None,
            transaction: None,
            wallet: WalletData::new(wallet, limit),
        }
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_transaction(mut self, kind: TransactionKind) -> Self {
        self.transaction = Some(kind);
        self
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("No subscriber is listening for wallet events")]
    NoSubscribers,

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound side of the notification bus.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: &WalletEvent) -> Result<(), NotifyError>;
}

/// Writes every event as a JSON line through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, event: &WalletEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event)?;
        tracing::info!(
            target: "balance::events",
            event = %event.kind,
            wallet_id = event.wallet.wallet_id,
            payload = %payload,
            "wallet event"
        );
        Ok(())
    }
}

/// In-process fan-out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<WalletEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, event: &WalletEvent) -> Result<(), NotifyError> {
        self.tx
            .send(event.clone())
            .map(|_| ())
            .map_err(|_| NotifyError::NoSubscribers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoundPolicy, IDENTIFICATION_LEVEL_FULL};

    fn sample_event(kind: EventKind) -> WalletEvent {
        let limit = Limit::new(IDENTIFICATION_LEVEL_FULL, "full", 0, 600000);
        let mut wallet =
            Wallet::create(1200, IDENTIFICATION_LEVEL_FULL, &limit, BoundPolicy::Exclusive)
                .unwrap();
        wallet.id = 7;
        WalletEvent::new(kind, &wallet, &limit)
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::Created.as_str(), "created");
        assert_eq!(EventKind::Held.as_str(), "holded");
        assert_eq!(EventKind::Released.as_str(), "disholded");
        assert_eq!(EventKind::Edited.as_str(), "edited");
        assert_eq!(EventKind::Fetched.as_str(), "got");
    }

    #[test]
    fn test_payload_shape() {
        let event = sample_event(EventKind::Edited)
            .with_amount(200)
            .with_transaction(TransactionKind::Deposit);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "edited");
        assert_eq!(json["amount"], 200);
        assert_eq!(json["transaction"], "deposit");
        assert_eq!(json["wallet"]["wallet_id"], 7);
        assert_eq!(json["wallet"]["balance"], 1200);
        assert_eq!(json["wallet"]["hold"], 0);
        assert_eq!(json["wallet"]["identification"]["name"], "full");
    }

    #[test]
    fn test_fetch_payload_omits_amount() {
        let json = serde_json::to_value(sample_event(EventKind::Fetched)).unwrap();
        assert!(json.get("amount").is_none());
        assert!(json.get("transaction").is_none());
    }

    #[test]
    fn test_broadcast_without_subscribers_fails() {
        let notifier = BroadcastNotifier::new(4);
        assert!(matches!(
            notifier.publish(&sample_event(EventKind::Created)),
            Err(NotifyError::NoSubscribers)
        ));
    }

    #[test]
    fn test_broadcast_delivers() {
        let notifier = BroadcastNotifier::new(4);
        let mut rx = notifier.subscribe();
        let event = sample_event(EventKind::Held);

        notifier.publish(&event).unwrap();
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[test]
    fn test_log_notifier_never_fails() {
        assert!(LogNotifier.publish(&sample_event(EventKind::Fetched)).is_ok());
    }
}
