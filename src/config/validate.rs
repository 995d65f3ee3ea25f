//! Load-time validation passes for state graphs.
//!
//! Three independent passes run in order:
//! 1. every transition target names a declared state
//! 2. every trigger (except `enter`) is a declared event of its table
//! 3. no table declares the same event twice
//!
//! Each pass accumulates every violation it finds using `Validation`; the
//! first pass that fails stops the load.

use crate::config::error::{GraphViolation, Level};
use crate::core::{StateGraph, Transition, ENTER_TRIGGER};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Result of a single validation pass.
pub type Checked = Validation<(), NonEmptyVec<GraphViolation>>;

type Pass = fn(&StateGraph) -> Checked;

/// A transition table together with the events it is allowed to use.
struct Table<'a> {
    state: &'a str,
    level: Level,
    events: &'a [String],
    transitions: &'a BTreeMap<String, Transition>,
}

fn tables(graph: &StateGraph) -> impl Iterator<Item = Table<'_>> {
    graph.states.values().flat_map(|state| {
        let main = Table {
            state: &state.name,
            level: Level::State,
            events: &state.events,
            transitions: &state.transitions,
        };
        let sub = state.substate.as_ref().map(|sub| Table {
            state: &state.name,
            level: Level::Substate,
            events: &sub.events,
            transitions: &sub.transitions,
        });
        std::iter::once(main).chain(sub)
    })
}

/// Run every pass in order, returning the violations of the first failing one.
pub fn validate(graph: &StateGraph) -> Result<(), Vec<GraphViolation>> {
    let passes: [Pass; 3] = [transition_targets, event_consistency, event_uniqueness];
    for pass in passes {
        if let Validation::Failure(violations) = pass(graph) {
            return Err(violations.iter().cloned().collect());
        }
    }
    Ok(())
}

/// Every `to_state` must be a key of the graph.
pub fn transition_targets(graph: &StateGraph) -> Checked {
    let checks: Vec<Checked> = tables(graph)
        .flat_map(|table| {
            table.transitions.iter().map(move |(trigger, transition)| {
                if graph.contains_state(&transition.to_state) {
                    Validation::success(())
                } else {
                    Validation::fail(GraphViolation::UnknownTarget {
                        state: table.state.to_string(),
                        trigger: trigger.clone(),
                        to_state: transition.to_state.clone(),
                        level: table.level,
                    })
                }
            })
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

/// Every trigger must be declared in the same table's events, `enter` excepted.
pub fn event_consistency(graph: &StateGraph) -> Checked {
    let checks: Vec<Checked> = tables(graph)
        .flat_map(|table| {
            let declared: HashSet<&str> = table.events.iter().map(String::as_str).collect();
            table
                .transitions
                .keys()
                .filter(move |trigger| {
                    trigger.as_str() != ENTER_TRIGGER && !declared.contains(trigger.as_str())
                })
                .map(move |trigger| {
                    Validation::fail(GraphViolation::UndeclaredTrigger {
                        state: table.state.to_string(),
                        trigger: trigger.clone(),
                        level: table.level,
                    })
                })
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

/// No table may list an event twice. Main and sub tables are checked separately.
pub fn event_uniqueness(graph: &StateGraph) -> Checked {
    let checks: Vec<Checked> = tables(graph)
        .flat_map(|table| {
            let mut seen = HashSet::new();
            let duplicates: BTreeSet<&str> = table
                .events
                .iter()
                .map(String::as_str)
                .filter(|event| !seen.insert(*event))
                .collect();
            duplicates.into_iter().map(move |event| {
                Validation::fail(GraphViolation::DuplicateEvent {
                    state: table.state.to_string(),
                    event: event.to_string(),
                    level: table.level,
                })
            })
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::parse_graph;

    fn graph(doc: &str) -> StateGraph {
        parse_graph("test", doc).unwrap()
    }

    #[test]
    fn valid_graph_passes_all_checks() {
        let g = graph(
            r#"{ "states": [
                { "name": "Unknown", "events": ["config"],
                  "transition": [ { "to_state": "Configured", "trigger": ["config", "enter"] } ] },
                { "name": "Configured", "events": ["config"],
                  "transition": [ { "to_state": "Configured", "trigger": ["config"] } ],
                  "substate": { "events": ["on"],
                                "transition": [ { "to_state": "Unknown", "trigger": ["on"] } ] } }
            ] }"#,
        );

        assert!(validate(&g).is_ok());
        assert!(transition_targets(&g).is_success());
        assert!(event_consistency(&g).is_success());
        assert!(event_uniqueness(&g).is_success());
    }

    #[test]
    fn unknown_target_is_reported_for_both_levels() {
        let g = graph(
            r#"{ "states": [
                { "name": "A", "events": ["go"],
                  "transition": [ { "to_state": "Nowhere", "trigger": ["go"] } ],
                  "substate": { "events": ["up"],
                                "transition": [ { "to_state": "Elsewhere", "trigger": ["up"] } ] } }
            ] }"#,
        );

        let violations = validate(&g).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&GraphViolation::UnknownTarget {
            state: "A".to_string(),
            trigger: "go".to_string(),
            to_state: "Nowhere".to_string(),
            level: Level::State,
        }));
        assert!(violations.contains(&GraphViolation::UnknownTarget {
            state: "A".to_string(),
            trigger: "up".to_string(),
            to_state: "Elsewhere".to_string(),
            level: Level::Substate,
        }));
    }

    #[test]
    fn undeclared_trigger_is_rejected_but_enter_is_exempt() {
        let g = graph(
            r#"{ "states": [
                { "name": "A", "events": [],
                  "transition": [ { "to_state": "A", "trigger": ["enter", "sneaky"] } ] }
            ] }"#,
        );

        let violations = validate(&g).unwrap_err();
        assert_eq!(
            violations,
            vec![GraphViolation::UndeclaredTrigger {
                state: "A".to_string(),
                trigger: "sneaky".to_string(),
                level: Level::State,
            }]
        );
    }

    #[test]
    fn substate_triggers_check_substate_events_only() {
        let g = graph(
            r#"{ "states": [
                { "name": "A", "events": ["up"],
                  "substate": { "events": [],
                                "transition": [ { "to_state": "A", "trigger": ["up"] } ] } }
            ] }"#,
        );

        let violations = validate(&g).unwrap_err();
        assert!(matches!(
            violations.as_slice(),
            [GraphViolation::UndeclaredTrigger { level: Level::Substate, .. }]
        ));
    }

    #[test]
    fn duplicate_events_are_checked_per_table() {
        let g = graph(
            r#"{ "states": [
                { "name": "A", "events": ["go", "go", "stop"],
                  "substate": { "events": ["go"] } }
            ] }"#,
        );

        let violations = validate(&g).unwrap_err();
        assert_eq!(
            violations,
            vec![GraphViolation::DuplicateEvent {
                state: "A".to_string(),
                event: "go".to_string(),
                level: Level::State,
            }]
        );
    }

    #[test]
    fn passes_run_in_order() {
        // Dangling target and duplicate event: only the first pass is reported.
        let g = graph(
            r#"{ "states": [
                { "name": "A", "events": ["go", "go"],
                  "transition": [ { "to_state": "Nowhere", "trigger": ["go"] } ] }
            ] }"#,
        );

        let violations = validate(&g).unwrap_err();
        assert!(violations
            .iter()
            .all(|v| matches!(v, GraphViolation::UnknownTarget { .. })));
    }
}
