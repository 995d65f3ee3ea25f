//! Expected-event gating for multi-step workflows.
//!
//! A transition may declare an ordered sequence of events (for example an
//! `offline`, `online`, `ready` handshake before an `update` is accepted).
//! The instance keeps the not-yet-seen tail of that sequence as its pending
//! queue. Everything in here is pure: the caller decides whether to commit.

use super::graph::Transition;

/// Outcome of checking a transition against the pending queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Gate {
    /// The transition may fire; `pending` is the queue to store afterwards.
    Open { pending: Vec<String> },
    /// The pending queue is waiting for `expected`.
    Closed { expected: String },
}

impl Gate {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Check `event` firing `transition` against the instance's `pending` queue.
///
/// When the queue is empty the firing event is taken as satisfying the first
/// declared slot without comparing it; the queue is seeded from the rest of
/// the declared sequence.
pub fn check(transition: &Transition, event: &str, pending: &[String]) -> Gate {
    let declared = &transition.expected_events;
    if declared.is_empty() {
        return Gate::Open {
            pending: Vec::new(),
        };
    }

    match pending.split_first() {
        None => Gate::Open {
            pending: declared[1..].to_vec(),
        },
        Some((head, rest)) if head == event => Gate::Open {
            pending: rest.to_vec(),
        },
        Some((head, _)) => Gate::Closed {
            expected: head.clone(),
        },
    }
}
