//! Property-based tests for expected-event gating and trigger normalization.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use fleetfsm::config::schema::{GraphDocument, StateDocument, TransitionDocument};
use fleetfsm::core::sequence::{check, Gate};
use fleetfsm::Transition;
use proptest::prelude::*;

prop_compose! {
    fn arbitrary_event()(variant in 0..5u8) -> String {
        ["offline", "online", "ready", "update", "fault"][variant as usize].to_string()
    }
}

prop_compose! {
    fn gated_transition()(sequence in prop::collection::vec(arbitrary_event(), 1..6)) -> Transition {
        Transition {
            to_state: "update".to_string(),
            triggers: vec!["update".to_string()],
            expected_events: sequence,
            timeout: None,
        }
    }
}

prop_compose! {
    fn transition_entry()(
        to in 0..3u8,
        triggers in prop::collection::vec(arbitrary_event(), 1..3),
    ) -> TransitionDocument {
        TransitionDocument {
            to_state: format!("S{to}"),
            triggers,
            expected_events: Vec::new(),
            timeout: None,
        }
    }
}

proptest! {
    #[test]
    fn empty_queue_always_opens_with_tail(transition in gated_transition(), event in arbitrary_event()) {
        let gate = check(&transition, &event, &[]);
        prop_assert_eq!(gate, Gate::Open { pending: transition.expected_events[1..].to_vec() });
    }

    #[test]
    fn walking_the_sequence_drains_the_queue(transition in gated_transition(), first in arbitrary_event()) {
        let mut pending = match check(&transition, &first, &[]) {
            Gate::Open { pending } => pending,
            Gate::Closed { .. } => return Err(TestCaseError::fail("first event must open the gate")),
        };

        for event in transition.expected_events[1..].iter() {
            pending = match check(&transition, event, &pending) {
                Gate::Open { pending } => pending,
                Gate::Closed { expected } => {
                    return Err(TestCaseError::fail(format!("closed waiting for {expected}")))
                }
            };
        }
        prop_assert!(pending.is_empty());
    }

    #[test]
    fn wrong_head_closes_gate(
        transition in gated_transition(),
        pending in prop::collection::vec(arbitrary_event(), 1..4),
        event in arbitrary_event(),
    ) {
        prop_assume!(pending[0] != event);
        let gate = check(&transition, &event, &pending);
        prop_assert_eq!(gate, Gate::Closed { expected: pending[0].clone() });
    }

    #[test]
    fn ungated_transition_always_clears_queue(
        pending in prop::collection::vec(arbitrary_event(), 0..4),
        event in arbitrary_event(),
    ) {
        let transition = Transition {
            to_state: "Operational".to_string(),
            triggers: vec![event.clone()],
            expected_events: Vec::new(),
            timeout: None,
        };
        prop_assert_eq!(check(&transition, &event, &pending), Gate::Open { pending: vec![] });
    }

    #[test]
    fn last_entry_naming_a_trigger_wins(entries in prop::collection::vec(transition_entry(), 1..6)) {
        let document = GraphDocument {
            version: "1".to_string(),
            entity: "node".to_string(),
            file: String::new(),
            states: vec![StateDocument {
                name: "S0".to_string(),
                description: String::new(),
                events: Vec::new(),
                transition: entries.clone(),
                substate: None,
            }],
        };
        let graph = document.into_graph("prop");
        let state = graph.state("S0").unwrap();

        for entry in &entries {
            for trigger in &entry.triggers {
                let winner = entries
                    .iter()
                    .rev()
                    .find(|e| e.triggers.contains(trigger))
                    .unwrap();
                prop_assert_eq!(&state.transition_for(trigger).unwrap().to_state, &winner.to_state);
            }
        }

        let distinct: std::collections::BTreeSet<_> =
            entries.iter().flat_map(|e| e.triggers.iter()).collect();
        prop_assert_eq!(state.transitions.len(), distinct.len());
    }
}
