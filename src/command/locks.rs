//! Exclusive per-pin lock table with bounded-retry acquisition
//!
//! Entries are created lazily on first lock attempt; an unseen pin is free.
//! The table is an injected shared component, so mutation goes through an
//! interior lock even though the instruction queue touches it one
//! instruction at a time.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use controlify_shared::limits::{LOCK_RETRY_WAIT_MS, MAX_LOCK_ATTEMPTS};
use tokio::sync::RwLock;
use tracing::debug;

/// A pin stayed busy through every acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTimeout {
    pub pin: u32,
    pub attempts: u32,
}

impl fmt::Display for LockTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to lock pin {} after {} attempts",
            self.pin, self.attempts
        )
    }
}

impl std::error::Error for LockTimeout {}

/// Tracks exclusive-acquisition state per pin
#[derive(Debug, Default)]
pub struct ResourceLockTable {
    held: RwLock<HashMap<u32, bool>>,
}

impl ResourceLockTable {
    /// Create an empty table; every pin starts free
    pub fn new() -> Self {
        Self::default()
    }

    /// One acquisition attempt. Returns true if the pin was free and is now
    /// held by the caller.
    pub async fn try_acquire(&self, pin: u32) -> bool {
        let mut held = self.held.write().await;
        let entry = held.entry(pin).or_insert(false);
        if *entry {
            false
        } else {
            *entry = true;
            true
        }
    }

    /// Acquire a pin, retrying while it is busy. Attempts are spaced
    /// [`LOCK_RETRY_WAIT_MS`] apart, up to [`MAX_LOCK_ATTEMPTS`] checks.
    pub async fn acquire(&self, pin: u32) -> Result<(), LockTimeout> {
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            if self.try_acquire(pin).await {
                debug!("got lock for pin {pin} (attempt {attempt})");
                return Ok(());
            }
            debug!(
                "pin {pin} busy ({} tries left)",
                MAX_LOCK_ATTEMPTS - attempt
            );
            tokio::time::sleep(Duration::from_millis(LOCK_RETRY_WAIT_MS)).await;
        }

        Err(LockTimeout {
            pin,
            attempts: MAX_LOCK_ATTEMPTS,
        })
    }

    /// Mark a pin free. Unknown pins are a no-op.
    pub async fn release(&self, pin: u32) {
        if let Some(entry) = self.held.write().await.get_mut(&pin) {
            *entry = false;
        }
    }

    /// Mark a batch of pins free
    pub async fn release_all(&self, pins: &[u32]) {
        let mut held = self.held.write().await;
        for pin in pins {
            if let Some(entry) = held.get_mut(pin) {
                *entry = false;
            }
        }
    }

    /// Whether a pin is currently held
    pub async fn is_held(&self, pin: u32) -> bool {
        self.held.read().await.get(&pin).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_unseen_pin_is_free() {
        let table = ResourceLockTable::new();
        assert!(!table.is_held(3).await);
        assert!(table.try_acquire(3).await);
        assert!(table.is_held(3).await);
    }

    #[tokio::test]
    async fn test_held_pin_rejects_second_acquire() {
        let table = ResourceLockTable::new();
        assert!(table.try_acquire(3).await);
        assert!(!table.try_acquire(3).await);

        table.release(3).await;
        assert!(table.try_acquire(3).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_free_pin_is_immediate() {
        let table = ResourceLockTable::new();
        let start = Instant::now();
        table.acquire(5).await.expect("free pin");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_exhausts_after_bounded_retries() {
        let table = ResourceLockTable::new();
        assert!(table.try_acquire(5).await);

        let start = Instant::now();
        let err = table.acquire(5).await.expect_err("pin stays busy");

        assert_eq!(
            err,
            LockTimeout {
                pin: 5,
                attempts: MAX_LOCK_ATTEMPTS
            }
        );
        // 20 checks spaced 500 ms apart
        assert_eq!(
            start.elapsed(),
            Duration::from_millis(u64::from(MAX_LOCK_ATTEMPTS) * LOCK_RETRY_WAIT_MS)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_before_exhaustion_lets_acquire_succeed() {
        let table = Arc::new(ResourceLockTable::new());
        assert!(table.try_acquire(5).await);

        let releaser = table.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1600)).await;
            releaser.release(5).await;
        });

        table.acquire(5).await.expect("acquire after release");
        assert!(table.is_held(5).await);
    }

    #[tokio::test]
    async fn test_release_all() {
        let table = ResourceLockTable::new();
        assert!(table.try_acquire(1).await);
        assert!(table.try_acquire(2).await);

        table.release_all(&[1, 2, 9]).await;
        assert!(!table.is_held(1).await);
        assert!(!table.is_held(2).await);
        assert!(!table.is_held(9).await);
    }
}
