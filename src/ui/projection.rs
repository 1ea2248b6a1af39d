//! Keyed display projection
//!
//! Folds the event stream into what a front-end would show: one line per
//! display key holding its latest message, plus unkeyed values and errors in
//! the order they arrived.

use std::collections::HashMap;

use crate::kernel::KernelEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayLine {
    Value(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct DisplayProjection {
    lines: Vec<DisplayLine>,
    keyed: HashMap<String, usize>,
}

impl DisplayProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event; returns true if the visible output changed
    pub fn apply(&mut self, event: &KernelEvent) -> bool {
        match event {
            KernelEvent::DisplayedValueProduced { message, key, .. } => {
                match key {
                    Some(key) => self.upsert(key, message),
                    None => self.lines.push(DisplayLine::Value(message.clone())),
                }
                true
            }
            KernelEvent::DisplayedValueUpdated { message, key, .. } => {
                self.upsert(key, message);
                true
            }
            KernelEvent::ErrorProduced { message, .. }
            | KernelEvent::CommandFailed { message, .. } => {
                self.lines.push(DisplayLine::Error(message.clone()));
                true
            }
            KernelEvent::PackageAdded { .. } | KernelEvent::CommandSucceeded { .. } => false,
        }
    }

    /// Latest message shown for `key`
    pub fn current(&self, key: &str) -> Option<&str> {
        self.keyed
            .get(key)
            .and_then(|&index| match &self.lines[index] {
                DisplayLine::Value(message) => Some(message.as_str()),
                DisplayLine::Error(_) => None,
            })
    }

    pub fn lines(&self) -> &[DisplayLine] {
        &self.lines
    }

    fn upsert(&mut self, key: &str, message: &str) {
        match self.keyed.get(key) {
            Some(&index) => self.lines[index] = DisplayLine::Value(message.to_string()),
            None => {
                self.keyed.insert(key.to_string(), self.lines.len());
                self.lines.push(DisplayLine::Value(message.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Command, CommandKind};

    #[test]
    fn test_updates_replace_keyed_line() {
        let command = Command::restore_directive().id();
        let mut projection = DisplayProjection::new();
        let key = "Installing package a".to_string();

        projection.apply(&KernelEvent::DisplayedValueProduced {
            command,
            message: "Installing package a...".into(),
            key: Some(key.clone()),
        });
        projection.apply(&KernelEvent::DisplayedValueProduced {
            command,
            message: "hello".into(),
            key: None,
        });
        projection.apply(&KernelEvent::DisplayedValueUpdated {
            command,
            message: "Installing package a.... done!".into(),
            key: key.clone(),
        });

        assert_eq!(projection.current(&key), Some("Installing package a.... done!"));
        assert_eq!(
            projection.lines(),
            [
                DisplayLine::Value("Installing package a.... done!".into()),
                DisplayLine::Value("hello".into()),
            ]
        );
    }

    #[test]
    fn test_update_without_produce_creates_line() {
        let command = Command::restore_directive().id();
        let mut projection = DisplayProjection::new();
        projection.apply(&KernelEvent::DisplayedValueUpdated {
            command,
            message: "late".into(),
            key: "k".into(),
        });
        assert_eq!(projection.current("k"), Some("late"));
    }

    #[test]
    fn test_errors_are_appended() {
        let command = Command::restore_directive().id();
        let mut projection = DisplayProjection::new();
        assert!(projection.apply(&KernelEvent::ErrorProduced {
            command,
            message: "Failed to add reference to package badpkg".into(),
        }));
        assert!(!projection.apply(&KernelEvent::CommandSucceeded {
            command,
            kind: CommandKind::RestoreDirective,
        }));
        assert_eq!(projection.lines().len(), 1);
    }
}
