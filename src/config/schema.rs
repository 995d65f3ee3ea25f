//! On-disk document shape and its normalization into a `StateGraph`.
//!
//! Documents list transitions as `{to_state, trigger: [..]}` entries. The
//! graph wants one lookup per trigger, so each entry is fanned out under
//! every trigger it names. When two entries share a trigger the later one
//! replaces the earlier; this is logged, not rejected.

use crate::config::error::ConfigError;
use crate::core::{State, StateGraph, SubState, Transition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub file: String,
    pub states: Vec<StateDocument>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub transition: Vec<TransitionDocument>,
    #[serde(default)]
    pub substate: Option<SubStateDocument>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubStateDocument {
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub transition: Vec<TransitionDocument>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionDocument {
    pub to_state: String,
    #[serde(rename = "trigger", default)]
    pub triggers: Vec<String>,
    #[serde(rename = "expectedEvents", default)]
    pub expected_events: Vec<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Parse `text` and normalize it into an unvalidated graph keyed by `source_id`.
pub fn parse_graph(source_id: &str, text: &str) -> Result<StateGraph, ConfigError> {
    let document: GraphDocument =
        serde_json::from_str(text).map_err(|error| ConfigError::Parse {
            source_id: source_id.to_string(),
            error,
        })?;
    Ok(document.into_graph(source_id))
}

impl GraphDocument {
    pub fn into_graph(self, source_id: &str) -> StateGraph {
        let mut states = BTreeMap::new();
        for doc in self.states {
            let state = doc.into_state(source_id);
            if states.contains_key(&state.name) {
                warn!(source = source_id, state = %state.name, "duplicate state definition replaces earlier one");
            }
            states.insert(state.name.clone(), state);
        }

        StateGraph {
            version: self.version,
            entity: self.entity,
            file: self.file,
            source: source_id.to_string(),
            states,
        }
    }
}

impl StateDocument {
    fn into_state(self, source_id: &str) -> State {
        let transitions = index_by_trigger(source_id, &self.name, self.transition);
        let substate = self.substate.map(|sub| SubState {
            transitions: index_by_trigger(source_id, &self.name, sub.transition),
            events: sub.events,
        });

        State {
            name: self.name,
            description: self.description,
            events: self.events,
            transitions,
            substate,
        }
    }
}

fn index_by_trigger(
    source_id: &str,
    state: &str,
    entries: Vec<TransitionDocument>,
) -> BTreeMap<String, Transition> {
    let mut table = BTreeMap::new();
    for entry in entries {
        let transition = Transition {
            to_state: entry.to_state,
            triggers: entry.triggers,
            expected_events: entry.expected_events,
            timeout: entry.timeout,
        };
        for trigger in &transition.triggers {
            if let Some(previous) = table.insert(trigger.clone(), transition.clone()) {
                warn!(
                    source = source_id,
                    state,
                    trigger = %trigger,
                    replaced = %previous.to_state,
                    with = %transition.to_state,
                    "trigger declared by more than one transition; last one wins"
                );
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "version": "1.0", "entity": "node", "file": "node.json",
        "states": [
            { "name": "Configured", "description": "configured",
              "events": ["fault", "ready", "retry"],
              "transition": [
                { "to_state": "Faulty", "trigger": ["fault", "retry"], "timeout": 30 },
                { "to_state": "Operational", "trigger": ["ready"] }
              ],
              "substate": {
                "events": ["update"],
                "transition": [
                  { "to_state": "update", "trigger": ["update"],
                    "expectedEvents": ["offline", "online", "ready"] }
                ]
              }
            },
            { "name": "Faulty", "events": [] }
        ]
    }"#;

    #[test]
    fn transitions_are_indexed_by_each_trigger() {
        let graph = parse_graph("node.json", DOC).unwrap();
        let configured = graph.state("Configured").unwrap();

        assert_eq!(configured.transitions.len(), 3);
        assert_eq!(configured.transition_for("fault").unwrap().to_state, "Faulty");
        assert_eq!(configured.transition_for("retry").unwrap().to_state, "Faulty");
        assert_eq!(configured.transition_for("fault").unwrap().timeout, Some(30));
        assert_eq!(
            configured.substate_transition_for("update").unwrap().expected_events,
            vec!["offline", "online", "ready"]
        );
    }

    #[test]
    fn optional_fields_default() {
        let graph = parse_graph("node.json", DOC).unwrap();
        let faulty = graph.state("Faulty").unwrap();

        assert!(faulty.description.is_empty());
        assert!(faulty.transitions.is_empty());
        assert!(faulty.substate.is_none());
        assert_eq!(graph.source, "node.json");
        assert_eq!(graph.file, "node.json");
        assert_eq!(graph.entity, "node");
    }

    #[test]
    fn later_entry_wins_on_trigger_collision() {
        let doc = r#"{ "states": [ { "name": "A", "events": ["go"], "transition": [
            { "to_state": "B", "trigger": ["go"] },
            { "to_state": "C", "trigger": ["go"] }
        ] } ] }"#;
        let graph = parse_graph("collide", doc).unwrap();

        assert_eq!(graph.state("A").unwrap().transition_for("go").unwrap().to_state, "C");
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = parse_graph("bad", r#"{ "states": [ { "events": [] } ] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse_graph("bad", "not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
