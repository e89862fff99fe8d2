//! FIFO command queue with a settle delay between dispatches.
//!
//! A command dispatched while the queue is idle executes immediately. Every
//! dispatch starts a settle window; commands that arrive during the window
//! wait their turn. Time is supplied by the caller so the queue behaves the
//! same under a real clock and in tests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

use crate::models::Command;

/// Pause after each dispatch before the next queued command may run.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedCommand {
    pub id: Uuid,
    pub command: Command,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedCommand {
    pub fn new(command: Command) -> Self {
        Self {
            id: Uuid::new_v4(),
            command,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub struct CommandQueue {
    pending: VecDeque<QueuedCommand>,
    settle_delay: Duration,
    settle_remaining: Option<Duration>,
    dispatched: u64,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl CommandQueue {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            settle_delay,
            settle_remaining: None,
            dispatched: 0,
        }
    }

    /// Add a command. Returns it straight back for immediate execution when
    /// nothing is pending and no settle window is open.
    pub fn enqueue(&mut self, command: Command) -> Option<QueuedCommand> {
        let queued = QueuedCommand::new(command);
        if self.settle_remaining.is_none() && self.pending.is_empty() {
            return Some(self.dispatch(queued));
        }
        tracing::debug!(
            id = %queued.id,
            action = %queued.command.action,
            pending = self.pending.len() + 1,
            "Command queued"
        );
        self.pending.push_back(queued);
        None
    }

    /// Advance the settle timer and return the next command once it expires.
    pub fn poll(&mut self, elapsed: Duration) -> Option<QueuedCommand> {
        if let Some(remaining) = self.settle_remaining {
            let remaining = remaining.saturating_sub(elapsed);
            if remaining.is_zero() {
                self.settle_remaining = None;
            } else {
                self.settle_remaining = Some(remaining);
                return None;
            }
        }
        let next = self.pending.pop_front()?;
        Some(self.dispatch(next))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_settling(&self) -> bool {
        self.settle_remaining.is_some()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.settle_remaining.is_none()
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Drop every pending command. An open settle window is kept.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    fn dispatch(&mut self, queued: QueuedCommand) -> QueuedCommand {
        self.settle_remaining = Some(self.settle_delay);
        self.dispatched += 1;
        queued
    }
}
