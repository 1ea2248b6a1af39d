//! Command/event kernel
//!
//! A [`Kernel`] accepts [`Command`]s one at a time and publishes a single
//! ordered stream of [`KernelEvent`]s. Behaviour is extended by registering
//! directives; see [`nuget::use_nuget_directives`] for the package directives.
//!
//! Commands sent with [`Kernel::send`] queue behind each other. Handlers that
//! need another command run it with [`InvocationContext::send`], which runs
//! inline on the current turn; calling [`Kernel::send`] from a handler of the
//! same kernel would wait on itself.

pub mod command;
pub mod context;
pub mod directive;
pub mod event;
pub mod extensions;
pub mod nuget;

pub use command::{Command, CommandId, CommandKind, CommandStatus, KernelCommand, KernelCommandResult};
pub use context::InvocationContext;
pub use directive::{DirectiveHandler, DirectiveRegistry};
pub use event::{EventStream, KernelEvent};
pub use extensions::{ExtensionActivator, LanguageEngine};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{Result, command_failed, no_language_engine, unknown_directive};
use crate::native::NativeModuleResolver;
use context::EventCollector;

/// Default interval between restore progress updates
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct Kernel {
    name: String,
    turn: tokio::sync::Mutex<()>,
    events: EventStream,
    directives: DirectiveRegistry,
    language_engine: Option<Arc<dyn LanguageEngine>>,
    extension_activator: Option<Arc<dyn ExtensionActivator>>,
    native_resolver: Option<Arc<NativeModuleResolver>>,
    poll_interval: Duration,
}

/// Builder for [`Kernel`]
pub struct KernelBuilder {
    name: String,
    language_engine: Option<Arc<dyn LanguageEngine>>,
    extension_activator: Option<Arc<dyn ExtensionActivator>>,
    native_resolver: Option<Arc<NativeModuleResolver>>,
    poll_interval: Duration,
}

impl KernelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language_engine: None,
            extension_activator: None,
            native_resolver: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn language_engine(mut self, engine: Arc<dyn LanguageEngine>) -> Self {
        self.language_engine = Some(engine);
        self
    }

    #[must_use]
    pub fn extension_activator(mut self, activator: Arc<dyn ExtensionActivator>) -> Self {
        self.extension_activator = Some(activator);
        self
    }

    #[must_use]
    pub fn native_resolver(mut self, resolver: Arc<NativeModuleResolver>) -> Self {
        self.native_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> Arc<Kernel> {
        Arc::new(Kernel {
            name: self.name,
            turn: tokio::sync::Mutex::new(()),
            events: EventStream::new(),
            directives: DirectiveRegistry::new(),
            language_engine: self.language_engine,
            extension_activator: self.extension_activator,
            native_resolver: self.native_resolver,
            poll_interval: self.poll_interval,
        })
    }
}

impl Kernel {
    pub fn builder(name: impl Into<String>) -> KernelBuilder {
        KernelBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn language_engine(&self) -> Option<&Arc<dyn LanguageEngine>> {
        self.language_engine.as_ref()
    }

    pub fn native_resolver(&self) -> Option<&Arc<NativeModuleResolver>> {
        self.native_resolver.as_ref()
    }

    pub fn event_stream(&self) -> &EventStream {
        &self.events
    }

    /// Live events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<KernelEvent> {
        self.events.subscribe()
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    /// Register a directive handler under `name` (e.g. `#r`)
    pub fn add_directive<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(InvocationContext, String) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(kernel = %self.name, directive = %name, "registered directive");
        self.directives.register(name, Arc::new(handler));
    }

    /// Submit a command and wait for it to reach a terminal state
    pub async fn send(self: &Arc<Self>, command: Command) -> KernelCommandResult {
        let _turn = self.turn.lock().await;
        let id = command.id();
        let collector: EventCollector = Arc::new(Mutex::new(Vec::new()));

        let context = Self::invoke(Arc::clone(self), command, Arc::clone(&collector)).await;

        let events = collector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        KernelCommandResult {
            command: id,
            status: context.status(),
            events,
        }
    }

    pub async fn submit_code(self: &Arc<Self>, code: impl Into<String>) -> KernelCommandResult {
        self.send(Command::submit_code(code)).await
    }

    /// Detach native resolution hooks owned by this kernel
    pub fn dispose(&self) {
        if let Some(resolver) = &self.native_resolver {
            resolver.dispose();
        }
    }

    pub(crate) fn invoke(
        kernel: Arc<Kernel>,
        command: Command,
        collector: EventCollector,
    ) -> BoxFuture<'static, InvocationContext> {
        Box::pin(async move {
            let context = InvocationContext::new(Arc::clone(&kernel), command, collector);
            context.start();
            debug!(
                kernel = %kernel.name,
                command = %context.command().id(),
                kind = ?context.command().kind(),
                "handling command"
            );

            let outcome = match context.command().handler().cloned() {
                Some(handler) => handler(context.clone()).await,
                None => kernel.handle(&context).await,
            };

            match outcome {
                Ok(()) => context.complete(),
                Err(e) => {
                    warn!(command = %context.command().id(), error = %e, "command failed");
                    context.fail(e.to_string());
                }
            }
            context
        })
    }

    async fn handle(&self, context: &InvocationContext) -> Result<()> {
        match context.command().payload() {
            KernelCommand::SubmitCode { code } => self.submit(context, code).await,
            KernelCommand::AddPackage(reference) => Err(command_failed(format!(
                "no handler for package reference '{reference}'; package directives are not enabled"
            ))),
            KernelCommand::RestoreDirective => Err(command_failed(
                "no restore handler; package directives are not enabled",
            )),
            KernelCommand::LoadExtensionsInDirectory {
                directory,
                assembly_paths,
            } => match &self.extension_activator {
                Some(activator) => activator.activate(directory, assembly_paths, context).await,
                None => {
                    debug!(directory = %directory.display(), "no extension activator; skipping");
                    Ok(())
                }
            },
        }
    }

    /// Route directive lines to their handlers and the rest to the engine
    async fn submit(&self, context: &InvocationContext, code: &str) -> Result<()> {
        let mut remaining: Vec<&str> = Vec::new();

        for line in code.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                let (name, args) = directive::split_directive(trimmed);
                if let Some(handler) = self.directives.get(name) {
                    debug!(directive = name, "dispatching directive");
                    handler(context.clone(), args.to_string()).await?;
                    continue;
                }
                if name.starts_with("#!") {
                    return Err(unknown_directive(name));
                }
            }
            remaining.push(line);
        }

        let remaining = remaining.join("\n");
        if remaining.trim().is_empty() {
            return Ok(());
        }

        match &self.language_engine {
            Some(engine) => engine.execute(&remaining, context).await,
            None => Err(no_language_engine(self.name.clone())),
        }
    }
}
