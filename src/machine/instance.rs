//! Per-entity runtime record and the transition algorithm.

use crate::checkpoint::{InstanceSnapshot, SNAPSHOT_VERSION};
use crate::config::Level;
use crate::core::sequence::{self, Gate};
use crate::core::{Event, EventHistory, StateGraph, Transition, MANUAL_TRANSITION};
use crate::machine::engine::StateMachine;
use crate::machine::error::MachineError;
use crate::machine::hooks::HookPhase;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Mutable part of an instance.
#[derive(Clone, Debug)]
pub(crate) struct InstanceData {
    pub(crate) state: String,
    pub(crate) substate: String,
    pub(crate) expected_events: Vec<String>,
    pub(crate) pending_timeout: Option<Duration>,
    pub(crate) entered_at: DateTime<Utc>,
    pub(crate) history: EventHistory,
}

/// One fleet entity's position in its lifecycle graph.
///
/// Instances are `Send + Sync`; wrap one in an `Arc` to drive it from
/// several threads. Every mutating call first takes the engine's
/// transition lock (see `LockingStrategy`). Readers never wait on that
/// lock, so hooks may inspect the instance they run for.
pub struct Instance {
    id: String,
    graph: Arc<StateGraph>,
    machine: StateMachine,
    serial: Arc<Mutex<()>>,
    data: Mutex<InstanceData>,
}

impl Instance {
    pub(crate) fn new(
        machine: StateMachine,
        graph: Arc<StateGraph>,
        id: String,
        data: InstanceData,
    ) -> Self {
        let serial = machine.serial_lock(&id);
        Self {
            id,
            graph,
            machine,
            serial,
            data: Mutex::new(data),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.id
    }

    pub fn graph(&self) -> &Arc<StateGraph> {
        &self.graph
    }

    pub fn current_state(&self) -> String {
        self.data().state.clone()
    }

    /// Current sub-state; empty when none has been entered.
    pub fn current_substate(&self) -> String {
        self.data().substate.clone()
    }

    /// Events the instance is still waiting for, in order.
    pub fn expected_events(&self) -> Vec<String> {
        self.data().expected_events.clone()
    }

    /// When the last matched transition (or override) was committed.
    pub fn entered_at(&self) -> DateTime<Utc> {
        self.data().entered_at
    }

    /// Timeout declared by the last transition that fired.
    ///
    /// The engine never acts on it; pollers compare it with `entered_at`
    /// and call `enforce_state_transition` on instances that overstay.
    pub fn pending_timeout(&self) -> Option<Duration> {
        self.data().pending_timeout
    }

    /// Whether the declared timeout has elapsed as of `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        let data = self.data();
        let Some(timeout) = data.pending_timeout else {
            return false;
        };
        now.signed_duration_since(data.entered_at)
            .to_std()
            .map_or(false, |elapsed| elapsed > timeout)
    }

    pub fn history(&self) -> EventHistory {
        self.data().history.clone()
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        let data = self.data();
        InstanceSnapshot {
            version: SNAPSHOT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            source: self.graph.source.clone(),
            instance_id: self.id.clone(),
            state: data.state.clone(),
            substate: data.substate.clone(),
            expected_events: data.expected_events.clone(),
            pending_timeout: data.pending_timeout.map(|t| t.as_secs()),
            entered_at: data.entered_at,
            history: data.history.clone(),
        }
    }

    /// Apply `event` to the instance.
    ///
    /// The main-state and sub-state tables are both consulted. A sub-state
    /// match moves the sub-state; a main-state match runs the exit hook of
    /// the current state, moves the main state and runs the entry hook of
    /// the new one. When both match, the main transition's pending queue
    /// wins. An event that matches nothing still notifies the observer.
    ///
    /// A rejected gate or a failing exit hook leaves the instance untouched.
    /// A failing entry hook is reported after the new state is committed,
    /// and the observer is not notified.
    pub fn transition(&self, event: &str) -> Result<(), MachineError> {
        let _serial = self.serial.lock().unwrap_or_else(PoisonError::into_inner);
        // Hooks may read this instance, so the data lock is only held to
        // copy the current position and, later, to commit.
        let current = self.position();

        let state = self
            .graph
            .state(&current.state)
            .ok_or_else(|| MachineError::UnknownState {
                instance_id: self.id.clone(),
                state: current.state.clone(),
            })?;

        let main = match state.transition_for(event) {
            Some(t) => Some((t, self.gate(t, event, &current.expected_events, Level::State)?)),
            None => None,
        };
        let sub = match state.substate_transition_for(event) {
            Some(t) => Some((t, self.gate(t, event, &current.expected_events, Level::Substate)?)),
            None => None,
        };

        if main.is_none() && sub.is_none() {
            debug!(instance_id = %self.id, event, state = %current.state, "no transition matched");
            let record = Event {
                name: event.to_string(),
                timestamp: Utc::now(),
                instance_id: self.id.clone(),
                old_state: current.state.clone(),
                new_state: current.state,
                old_substate: current.substate.clone(),
                new_substate: current.substate,
            };
            self.machine.notify(&record);
            return Ok(());
        }

        let mut next = current.clone();
        if let Some((t, pending)) = sub {
            next.substate = t.to_state.clone();
            next.expected_events = pending;
            next.pending_timeout = t.timeout();
        }

        let mut entered = Ok(());
        if let Some((t, pending)) = main {
            if let Err(e) = self.machine.hooks().run(HookPhase::Exit, &self.id, &current.state) {
                warn!(instance_id = %self.id, event, error = %e, "exit hook failed");
                return Err(e);
            }
            next.state = t.to_state.clone();
            next.expected_events = pending;
            next.pending_timeout = t.timeout();
            entered = self.machine.hooks().run(HookPhase::Entry, &self.id, &next.state);
        }

        let record = Event {
            name: event.to_string(),
            timestamp: Utc::now(),
            instance_id: self.id.clone(),
            old_state: current.state,
            new_state: next.state.clone(),
            old_substate: current.substate,
            new_substate: next.substate.clone(),
        };
        let mut data = self.data();
        next.commit(&mut data);

        if let Err(e) = entered {
            warn!(instance_id = %self.id, event, state = %record.new_state, error = %e, "entry hook failed after state change");
            return Err(e);
        }

        debug!(
            instance_id = %self.id,
            event,
            from = %record.old_state,
            to = %record.new_state,
            from_substate = %record.old_substate,
            to_substate = %record.new_substate,
            "transition committed"
        );
        data.history.record(record.clone());
        drop(data);
        self.machine.notify(&record);
        Ok(())
    }

    /// Force the instance into `state` / `substate`, bypassing the
    /// transition tables. Only `state` is checked against the graph.
    ///
    /// Used to recover instances stuck behind a gate or a timeout. Runs the
    /// current state's exit hook and the target's entry hook, clears the
    /// pending queue and emits a `manual_transition` event.
    pub fn enforce_state_transition(&self, state: &str, substate: &str) -> Result<(), MachineError> {
        let _serial = self.serial.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.graph.contains_state(state) {
            return Err(MachineError::UnknownState {
                instance_id: self.id.clone(),
                state: state.to_string(),
            });
        }

        let current = self.position();
        let hooks = self.machine.hooks();
        if let Err(e) = hooks.run(HookPhase::Exit, &self.id, &current.state) {
            warn!(instance_id = %self.id, to = state, error = %e, "exit hook failed during override");
            return Err(e);
        }
        let entered = hooks.run(HookPhase::Entry, &self.id, state);

        let next = Position {
            state: state.to_string(),
            substate: substate.to_string(),
            expected_events: Vec::new(),
            pending_timeout: None,
        };
        let mut data = self.data();
        next.commit(&mut data);

        if let Err(e) = entered {
            warn!(instance_id = %self.id, state, error = %e, "entry hook failed after override");
            return Err(e);
        }

        info!(
            instance_id = %self.id,
            from = %current.state,
            to = state,
            substate,
            "manual state transition"
        );
        let record = Event {
            name: MANUAL_TRANSITION.to_string(),
            timestamp: Utc::now(),
            instance_id: self.id.clone(),
            old_state: current.state,
            new_state: next.state,
            old_substate: current.substate,
            new_substate: next.substate,
        };
        data.history.record(record.clone());
        drop(data);
        self.machine.notify(&record);
        Ok(())
    }

    fn gate(
        &self,
        transition: &Transition,
        event: &str,
        pending: &[String],
        level: Level,
    ) -> Result<Vec<String>, MachineError> {
        match sequence::check(transition, event, pending) {
            Gate::Open { pending } => Ok(pending),
            Gate::Closed { expected } => {
                warn!(instance_id = %self.id, event, %expected, %level, "transition rejected");
                Err(MachineError::TransitionRejected {
                    instance_id: self.id.clone(),
                    event: event.to_string(),
                    expected,
                    level,
                })
            }
        }
    }

    fn position(&self) -> Position {
        let data = self.data();
        Position {
            state: data.state.clone(),
            substate: data.substate.clone(),
            expected_events: data.expected_events.clone(),
            pending_timeout: data.pending_timeout,
        }
    }

    fn data(&self) -> MutexGuard<'_, InstanceData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Copy of the fields a transition reads and replaces.
#[derive(Clone)]
struct Position {
    state: String,
    substate: String,
    expected_events: Vec<String>,
    pending_timeout: Option<Duration>,
}

impl Position {
    fn commit(&self, data: &mut InstanceData) {
        data.state.clone_from(&self.state);
        data.substate.clone_from(&self.substate);
        data.expected_events.clone_from(&self.expected_events);
        data.pending_timeout = self.pending_timeout;
        data.entered_at = Utc::now();
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("source", &self.graph.source)
            .field("state", &data.state)
            .field("substate", &data.substate)
            .field("expected_events", &data.expected_events)
            .finish()
    }
}
