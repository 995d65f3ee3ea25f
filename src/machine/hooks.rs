//! Caller-supplied entry and exit callbacks around main-state changes.
//!
//! Hooks cannot come from a config document, so they live on the engine,
//! keyed by state name, next to (not inside) the shared graph.

use crate::machine::error::MachineError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error type a hook may fail with.
pub type HookFailure = Box<dyn std::error::Error + Send + Sync>;

/// Zero-argument fallible callback.
pub type Hook = Arc<dyn Fn() -> Result<(), HookFailure> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Entry,
    Exit,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => f.write_str("entry"),
            Self::Exit => f.write_str("exit"),
        }
    }
}

/// Entry and exit hooks registered per state name.
#[derive(Clone, Default)]
pub struct Hooks {
    entry: HashMap<String, Hook>,
    exit: HashMap<String, Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<F>(&mut self, phase: HookPhase, state: impl Into<String>, hook: F)
    where
        F: Fn() -> Result<(), HookFailure> + Send + Sync + 'static,
    {
        let hook: Hook = Arc::new(hook);
        let table = match phase {
            HookPhase::Entry => &mut self.entry,
            HookPhase::Exit => &mut self.exit,
        };
        table.insert(state.into(), hook);
    }

    pub fn get(&self, phase: HookPhase, state: &str) -> Option<&Hook> {
        match phase {
            HookPhase::Entry => self.entry.get(state),
            HookPhase::Exit => self.exit.get(state),
        }
    }

    /// Run the `phase` hook of `state` if one is registered.
    pub(crate) fn run(
        &self,
        phase: HookPhase,
        instance_id: &str,
        state: &str,
    ) -> Result<(), MachineError> {
        let Some(hook) = self.get(phase, state) else {
            return Ok(());
        };
        hook().map_err(|error| MachineError::Hook {
            instance_id: instance_id.to_string(),
            state: state.to_string(),
            phase,
            error,
        })
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entry: Vec<_> = self.entry.keys().collect();
        let mut exit: Vec<_> = self.exit.keys().collect();
        entry.sort();
        exit.sort();
        f.debug_struct("Hooks")
            .field("entry", &entry)
            .field("exit", &exit)
            .finish()
    }
}
