//! Commands submitted to a kernel

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use serde::Serialize;

use super::InvocationContext;
use super::event::KernelEvent;
use crate::domain::PackageReference;
use crate::error::Result;

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Per-command handler supplied by the directive that created the command
pub type CommandHandler = Arc<dyn Fn(InvocationContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a [`Command`]
#[derive(Debug, Clone)]
pub enum KernelCommand {
    SubmitCode {
        code: String,
    },
    AddPackage(PackageReference),
    RestoreDirective,
    LoadExtensionsInDirectory {
        directory: PathBuf,
        assembly_paths: Vec<PathBuf>,
    },
}

/// Discriminant of [`KernelCommand`], carried on terminal events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommandKind {
    SubmitCode,
    AddPackage,
    RestoreDirective,
    LoadExtensionsInDirectory,
}

impl KernelCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            KernelCommand::SubmitCode { .. } => CommandKind::SubmitCode,
            KernelCommand::AddPackage(_) => CommandKind::AddPackage,
            KernelCommand::RestoreDirective => CommandKind::RestoreDirective,
            KernelCommand::LoadExtensionsInDirectory { .. } => {
                CommandKind::LoadExtensionsInDirectory
            }
        }
    }
}

/// A request to a kernel, with an optional directive-supplied handler
#[derive(Clone)]
pub struct Command {
    id: CommandId,
    payload: KernelCommand,
    handler: Option<CommandHandler>,
}

impl Command {
    pub fn new(payload: KernelCommand) -> Self {
        Self {
            id: CommandId::next(),
            payload,
            handler: None,
        }
    }

    pub fn submit_code(code: impl Into<String>) -> Self {
        Self::new(KernelCommand::SubmitCode { code: code.into() })
    }

    pub fn add_package(reference: PackageReference) -> Self {
        Self::new(KernelCommand::AddPackage(reference))
    }

    pub fn restore_directive() -> Self {
        Self::new(KernelCommand::RestoreDirective)
    }

    pub fn load_extensions_in_directory(directory: PathBuf, assembly_paths: Vec<PathBuf>) -> Self {
        Self::new(KernelCommand::LoadExtensionsInDirectory {
            directory,
            assembly_paths,
        })
    }

    /// Attach the handler that runs instead of the kernel's default handling
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(InvocationContext) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn payload(&self) -> &KernelCommand {
        &self.payload
    }

    pub fn kind(&self) -> CommandKind {
        self.payload.kind()
    }

    pub fn handler(&self) -> Option<&CommandHandler> {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Lifecycle of a command: `Pending -> Running -> Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommandStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl CommandStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandStatus::Completed | CommandStatus::Failed)
    }
}

/// Everything observed while a top-level command ran
#[derive(Debug, Clone)]
pub struct KernelCommandResult {
    pub command: CommandId,
    pub status: CommandStatus,
    /// Events published by the command and its children, in order
    pub events: Vec<KernelEvent>,
}

impl KernelCommandResult {
    pub fn succeeded(&self) -> bool {
        self.status == CommandStatus::Completed
    }
}
