// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use balance::application::{EventKind, Notifier, NotifyError, WalletEvent, WalletService};
use balance::domain::{BoundPolicy, Limit, TierId};
use tempfile::TempDir;

/// Tier used by most scenarios: 0 < balance < 10000 under the default policy
pub const TEST_TIER: TierId = 9;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(WalletService, TempDir)> {
    test_service_with(BoundPolicy::default()).await
}

/// Helper to create a test service with a given bound policy and the test tier seeded
pub async fn test_service_with(policy: BoundPolicy) -> Result<(WalletService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = WalletService::init(&test_db_path(&temp_dir))
        .await?
        .with_policy(policy);

    service
        .repository()
        .save_limit(&Limit::new(TEST_TIER, "test", 0, 10000))
        .await?;

    Ok((service, temp_dir))
}

/// Path of the database created by [`test_service`] inside `temp_dir`
pub fn test_db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

/// Notifier that keeps every published event for inspection
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<WalletEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<WalletEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(|e| e.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, event: &WalletEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Notifier whose bus is always down
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn publish(&self, _event: &WalletEvent) -> Result<(), NotifyError> {
        Err(NotifyError::NoSubscribers)
    }
}
