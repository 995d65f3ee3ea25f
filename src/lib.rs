//! Fleetfsm: config-driven lifecycle state machines for fleet entities
//!
//! Each fleet entity (a physical or virtual node) is tracked by an
//! `Instance` holding a main lifecycle state, an orthogonal sub-state and a
//! queue of expected follow-up events. The legal moves come from a JSON
//! state graph that is validated once and then shared read-only.
//!
//! # Core Concepts
//!
//! - **StateGraph**: validated states, sub-states and trigger-keyed transitions
//! - **StateMachine**: engine holding the observer, hooks and transition lock
//! - **Instance**: one entity's runtime position in a graph
//! - **Event**: audit record handed to the observer after every call
//!
//! # Example
//!
//! ```rust
//! use fleetfsm::config::{ConfigCache, MemoryReader};
//! use fleetfsm::StateMachine;
//! use std::sync::Arc;
//!
//! let doc = r#"{ "version": "1", "entity": "node", "states": [
//!     { "name": "Configured", "events": ["ready"],
//!       "transition": [ { "to_state": "Operational", "trigger": ["ready"] } ] },
//!     { "name": "Operational", "events": [] }
//! ] }"#;
//! let cache = ConfigCache::with_reader(MemoryReader::new().with_document("node", doc));
//!
//! let machine = StateMachine::builder()
//!     .cache(Arc::new(cache))
//!     .observer(|event| println!("{} -> {}", event.old_state, event.new_state))
//!     .build();
//!
//! let node = machine.new_instance("node", "node-1", "Configured").unwrap();
//! node.transition("ready").unwrap();
//! assert_eq!(node.current_state(), "Operational");
//! ```

pub mod checkpoint;
pub mod config;
pub mod core;
pub mod machine;

// Re-export commonly used types
pub use checkpoint::{CheckpointError, InstanceSnapshot};
pub use config::{load_config, ConfigCache, ConfigError, GraphViolation};
pub use crate::core::{Event, EventHistory, State, StateGraph, SubState, Transition};
pub use machine::{Instance, LockingStrategy, MachineError, Observer, StateMachine};
