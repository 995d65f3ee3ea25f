//! Validated state graph shared by every instance of an entity type.
//!
//! A `StateGraph` is built once from a config document, validated, and
//! then only ever read. Transition tables are keyed by trigger so that a
//! lookup during `Instance::transition` is a single map access. Graphs
//! serialize for inspection, but there is no way back: the only way in is
//! a config document through `ConfigCache::load`, which validates it.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Reserved trigger that does not need to be declared in `events`.
pub const ENTER_TRIGGER: &str = "enter";

/// A single edge of the graph, reachable through any of its `triggers`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transition {
    /// Name of the target state.
    pub to_state: String,
    /// Every trigger that resolves to this transition.
    pub triggers: Vec<String>,
    /// Ordered gate that must be walked before follow-up triggers are accepted.
    pub expected_events: Vec<String>,
    /// Declared timeout in seconds. Metadata only; never enforced.
    pub timeout: Option<u64>,
}

impl Transition {
    /// Timeout declared in the config, as a `Duration`.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Whether this transition carries an expected-event gate.
    pub fn is_gated(&self) -> bool {
        !self.expected_events.is_empty()
    }
}

/// Orthogonal sub-state table nested inside a main state.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SubState {
    pub events: Vec<String>,
    pub transitions: BTreeMap<String, Transition>,
}

impl SubState {
    pub fn transition_for(&self, trigger: &str) -> Option<&Transition> {
        self.transitions.get(trigger)
    }

    pub fn declares(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

/// A main lifecycle state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct State {
    pub name: String,
    pub description: String,
    pub events: Vec<String>,
    pub transitions: BTreeMap<String, Transition>,
    pub substate: Option<SubState>,
}

impl State {
    /// Look up the main-level transition selected by `trigger`.
    pub fn transition_for(&self, trigger: &str) -> Option<&Transition> {
        self.transitions.get(trigger)
    }

    /// Look up the sub-state transition selected by `trigger`, if this
    /// state has a sub-state table at all.
    pub fn substate_transition_for(&self, trigger: &str) -> Option<&Transition> {
        self.substate.as_ref().and_then(|s| s.transition_for(trigger))
    }

    pub fn declares(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

/// Immutable, validated lifecycle graph for one entity type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateGraph {
    pub version: String,
    pub entity: String,
    /// File name declared inside the document.
    pub file: String,
    /// Identifier the graph was loaded from; also its cache key.
    pub source: String,
    pub states: BTreeMap<String, State>,
}

impl StateGraph {
    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    pub fn contains_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// State names in lexical order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }
}
