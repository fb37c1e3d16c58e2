//! Out-of-band reporting of store failures.
//!
//! Mutations return before their outcome matters to the caller, so access
//! denials are published here for whoever listens (an error toast, a log
//! sink). Other failures are only logged.

use std::fmt;

use serde_json::Value;
use tokio::sync::broadcast;

use storage::repository::StorageError;

const CHANNEL_CAPACITY: usize = 64;

/// Kind of store operation that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    Delete,
    Write,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Write => "write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected store access.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionErrorEvent {
    pub path: String,
    pub operation: Operation,
    pub payload: Option<Value>,
}

impl fmt::Display for PermissionErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing or insufficient permissions: {} {}", self.operation, self.path)
    }
}

#[derive(Debug, Clone)]
pub struct PermissionErrorEmitter {
    events: broadcast::Sender<PermissionErrorEvent>,
}

impl Default for PermissionErrorEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionErrorEmitter {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { events }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PermissionErrorEvent> {
        self.events.subscribe()
    }

    pub fn emit(&self, event: PermissionErrorEvent) {
        tracing::warn!(path = %event.path, operation = %event.operation, "permission denied");
        // Nobody listening is not a failure.
        let _ = self.events.send(event);
    }

    /// Route a failed store call: denials go to listeners, everything else
    /// is logged.
    pub fn report(
        &self,
        error: &StorageError,
        operation: Operation,
        path: impl Into<String>,
        payload: Option<Value>,
    ) {
        match error {
            StorageError::PermissionDenied { .. } => self.emit(PermissionErrorEvent {
                path: path.into(),
                operation,
                payload,
            }),
            other => {
                let path = path.into();
                tracing::warn!(%path, %operation, error = %other, "store operation failed");
            }
        }
    }
}
