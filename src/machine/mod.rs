//! Engines and the instances they drive.
//!
//! A `StateMachine` is created once per entity type and holds the observer,
//! the entry/exit hooks and the transition lock. Instances are created from
//! it and apply triggers against their validated graph:
//!
//! ```text
//! trigger -> Instance::transition -> gate check -> hooks -> commit -> observer
//! ```

mod engine;
mod error;
mod hooks;
mod instance;

pub use engine::{LockingStrategy, Observer, StateMachine, StateMachineBuilder};
pub use error::MachineError;
pub use hooks::{Hook, HookFailure, HookPhase, Hooks};
pub use instance::Instance;
