//! Invocation context handed to command handlers

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::Kernel;
use super::command::{Command, CommandStatus};
use super::event::KernelEvent;
use crate::domain::ResolvedPackageReference;
use crate::error::{Result, command_failed};

/// Events gathered for one top-level command, children included
pub(crate) type EventCollector = Arc<Mutex<Vec<KernelEvent>>>;

struct Lifecycle {
    status: CommandStatus,
    failure: Option<String>,
}

struct ContextInner {
    command: Command,
    kernel: Arc<Kernel>,
    collector: EventCollector,
    lifecycle: Mutex<Lifecycle>,
}

/// Handle a command handler uses to report progress and finish its command
///
/// Cheap to clone; clones share the same command state.
#[derive(Clone)]
pub struct InvocationContext {
    inner: Arc<ContextInner>,
}

impl InvocationContext {
    pub(crate) fn new(kernel: Arc<Kernel>, command: Command, collector: EventCollector) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                command,
                kernel,
                collector,
                lifecycle: Mutex::new(Lifecycle {
                    status: CommandStatus::Pending,
                    failure: None,
                }),
            }),
        }
    }

    pub(crate) fn start(&self) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.status == CommandStatus::Pending {
            lifecycle.status = CommandStatus::Running;
        }
    }

    /// The command being handled
    pub fn command(&self) -> &Command {
        &self.inner.command
    }

    /// The kernel handling the command
    pub fn handling_kernel(&self) -> &Arc<Kernel> {
        &self.inner.kernel
    }

    pub fn status(&self) -> CommandStatus {
        self.lifecycle().status
    }

    /// Message the command failed with, if it failed
    pub fn failure(&self) -> Option<String> {
        self.lifecycle().failure.clone()
    }

    pub fn publish(&self, event: KernelEvent) {
        self.inner
            .collector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        self.inner.kernel.event_stream().publish(event);
    }

    pub fn display_value(&self, message: impl Into<String>, key: Option<String>) {
        self.publish(KernelEvent::DisplayedValueProduced {
            command: self.command().id(),
            message: message.into(),
            key,
        });
    }

    pub fn update_display(&self, message: impl Into<String>, key: impl Into<String>) {
        self.publish(KernelEvent::DisplayedValueUpdated {
            command: self.command().id(),
            message: message.into(),
            key: key.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(KernelEvent::ErrorProduced {
            command: self.command().id(),
            message: message.into(),
        });
    }

    pub fn package_added(&self, reference: ResolvedPackageReference) {
        self.publish(KernelEvent::PackageAdded {
            command: self.command().id(),
            reference,
        });
    }

    /// End the command successfully; no-op once terminal
    pub fn complete(&self) {
        if self.finish(CommandStatus::Completed, None) {
            self.publish(KernelEvent::CommandSucceeded {
                command: self.command().id(),
                kind: self.command().kind(),
            });
        }
    }

    /// End the command with a failure; no-op once terminal
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        if self.finish(CommandStatus::Failed, Some(message.clone())) {
            self.publish(KernelEvent::CommandFailed {
                command: self.command().id(),
                kind: self.command().kind(),
                message,
            });
        }
    }

    /// Run a child command on the handling kernel
    ///
    /// The child runs inline on this command's turn. Its events are collected
    /// with the parent's; a failed child becomes an error here.
    pub async fn send(&self, command: Command) -> Result<()> {
        debug!(
            parent = %self.command().id(),
            child = %command.id(),
            kind = ?command.kind(),
            "sending child command"
        );
        let child = Kernel::invoke(
            Arc::clone(&self.inner.kernel),
            command,
            Arc::clone(&self.inner.collector),
        )
        .await;

        match child.status() {
            CommandStatus::Failed => Err(command_failed(child.failure().unwrap_or_default())),
            _ => Ok(()),
        }
    }

    fn finish(&self, status: CommandStatus, failure: Option<String>) -> bool {
        let mut lifecycle = self.lifecycle();
        if lifecycle.status.is_terminal() {
            return false;
        }
        lifecycle.status = status;
        lifecycle.failure = failure;
        true
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
