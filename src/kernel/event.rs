//! Events published on a kernel's stream

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;

use super::command::{CommandId, CommandKind};
use crate::domain::ResolvedPackageReference;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A notification about command progress or outcome
///
/// `key` on displayed values is the correlation field consumers use to
/// replace a previously rendered line in place.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum KernelEvent {
    DisplayedValueProduced {
        command: CommandId,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    DisplayedValueUpdated {
        command: CommandId,
        message: String,
        key: String,
    },
    ErrorProduced {
        command: CommandId,
        message: String,
    },
    PackageAdded {
        command: CommandId,
        reference: ResolvedPackageReference,
    },
    CommandSucceeded {
        command: CommandId,
        kind: CommandKind,
    },
    CommandFailed {
        command: CommandId,
        kind: CommandKind,
        message: String,
    },
}

impl KernelEvent {
    pub fn command(&self) -> CommandId {
        match self {
            KernelEvent::DisplayedValueProduced { command, .. }
            | KernelEvent::DisplayedValueUpdated { command, .. }
            | KernelEvent::ErrorProduced { command, .. }
            | KernelEvent::PackageAdded { command, .. }
            | KernelEvent::CommandSucceeded { command, .. }
            | KernelEvent::CommandFailed { command, .. } => *command,
        }
    }

    /// Display key for displayed values
    pub fn key(&self) -> Option<&str> {
        match self {
            KernelEvent::DisplayedValueProduced { key, .. } => key.as_deref(),
            KernelEvent::DisplayedValueUpdated { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            KernelEvent::CommandSucceeded { .. } | KernelEvent::CommandFailed { .. }
        )
    }
}

/// Append-only event log with live fan-out to subscribers
pub struct EventStream {
    log: Mutex<Vec<KernelEvent>>,
    sender: broadcast::Sender<KernelEvent>,
}

impl EventStream {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            log: Mutex::new(Vec::new()),
            sender,
        }
    }

    pub fn publish(&self, event: KernelEvent) {
        // Hold the log lock while sending so subscribers see log order
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.push(event.clone());
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KernelEvent> {
        self.sender.subscribe()
    }

    /// Every event published so far
    pub fn history(&self) -> Vec<KernelEvent> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}
