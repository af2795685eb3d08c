//! Deduplicated user notifications.

use crate::domain::{TimeMs, B256};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use tracing::{info, warn};

/// Default number of dedup keys retained before the oldest is forgotten.
pub const DEFAULT_NOTIFICATION_RETENTION: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub tx_hash: Option<B256>,
    pub created_at: TimeMs,
}

/// Dedup key: sha256 over the message text followed by the transaction hash.
pub fn notification_key(message: &str, tx_hash: Option<&B256>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    if let Some(tx_hash) = tx_hash {
        hasher.update(tx_hash.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Emitted notifications plus the set of keys already seen.
///
/// Retention is bounded: once `capacity` keys are held, the oldest key and
/// its notification are evicted, so a very old duplicate could be shown again.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    seen: HashSet<String>,
    order: VecDeque<(String, Notification)>,
    capacity: usize,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a notification; returns it if it was not a duplicate.
    pub fn push(
        &mut self,
        level: NotificationLevel,
        message: String,
        tx_hash: Option<B256>,
        now: TimeMs,
    ) -> Option<Notification> {
        let key = notification_key(&message, tx_hash.as_ref());
        if self.seen.contains(&key) {
            return None;
        }

        if self.order.len() >= self.capacity {
            if let Some((oldest, _)) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        let notification = Notification {
            level,
            message,
            tx_hash,
            created_at: now,
        };
        match level {
            NotificationLevel::Success => {
                info!(text = %notification.message, "Position notification")
            }
            NotificationLevel::Error => {
                warn!(text = %notification.message, "Position notification")
            }
        }

        self.seen.insert(key.clone());
        self.order.push_back((key, notification.clone()));
        Some(notification)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Retained notifications, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.order.iter().map(|(_, n)| n.clone()).collect()
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_RETENTION)
    }
}
