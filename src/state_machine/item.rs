use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FailureClass, ItemError};

/// Lifecycle of one work item.
///
/// PENDING → (SKIPPED | RUNNING) → (SUCCEEDED | FAILED)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemState {
    Pending,
    Skipped,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::Pending => write!(f, "PENDING"),
            ItemState::Skipped => write!(f, "SKIPPED"),
            ItemState::Running => write!(f, "RUNNING"),
            ItemState::Succeeded => write!(f, "SUCCEEDED"),
            ItemState::Failed => write!(f, "FAILED"),
        }
    }
}

/// The result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success,
    Failure { class: FailureClass, message: String },
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt before marking an item as failed.
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 5 }
    }
}

/// Mutable retry bookkeeping, alive only while an item is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptState {
    /// Failed attempts so far.
    pub attempt: u32,
    /// Rate-limit failures seen for this item.
    pub consecutive_penalty: u32,
    pub last_error: String,
}

/// One item moving through the state machine.
#[derive(Debug, Clone)]
pub struct ItemRun {
    pub index: usize,
    pub state: ItemState,
    pub state_history: Vec<ItemState>,
    pub attempts: AttemptState,
    pub retry_config: RetryConfig,
    /// Set when the item ends in `Failed`.
    pub error: Option<ItemError>,
    pub created_at: DateTime<Utc>,
}

impl ItemRun {
    pub fn new(index: usize, retry_config: RetryConfig) -> Self {
        Self {
            index,
            state: ItemState::Pending,
            state_history: Vec::new(),
            attempts: AttemptState::default(),
            retry_config,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.created_at).num_milliseconds()
    }
}
