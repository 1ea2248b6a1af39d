//! Directive registry
//!
//! A directive is a line of submitted code starting with a registered token
//! (`#r`, `#!nuget-restore`). The rest of the line is handed to the handler
//! unparsed.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;

use super::InvocationContext;
use crate::error::Result;

pub type DirectiveHandler =
    Arc<dyn Fn(InvocationContext, String) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Default)]
pub struct DirectiveRegistry {
    handlers: RwLock<HashMap<String, DirectiveHandler>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`, replacing any previous registration
    pub fn register(&self, name: impl Into<String>, handler: DirectiveHandler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<DirectiveHandler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered directive names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Split a directive line into its token and the remaining arguments
pub fn split_directive(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (line, ""),
    }
}
