//! Core lifecycle types.
//!
//! This module contains the data side of the engine:
//! - The validated `StateGraph` and its states, sub-states and transitions
//! - The `Event` audit record handed to observers
//! - Expected-event gating, kept pure so it can be tested in isolation
//! - Bounded per-instance history

mod event;
mod graph;
mod history;
pub mod sequence;

pub use event::{Event, MANUAL_TRANSITION};
pub use graph::{State, StateGraph, SubState, Transition, ENTER_TRIGGER};
pub use history::{EventHistory, DEFAULT_HISTORY_CAPACITY};
pub use sequence::Gate;
