//! The engine shared by every instance of one entity type.

use crate::checkpoint::InstanceSnapshot;
use crate::config::ConfigCache;
use crate::core::{Event, EventHistory, DEFAULT_HISTORY_CAPACITY};
use crate::machine::error::MachineError;
use crate::machine::hooks::{HookFailure, HookPhase, Hooks};
use crate::machine::instance::{Instance, InstanceData};
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tracing::debug;

/// Callback invoked synchronously after every committed transition.
///
/// Runs while the engine's transition lock is held, so it must not call
/// `transition` or `enforce_state_transition` on an instance of the same
/// engine.
pub type Observer = Arc<dyn Fn(&Event) + Send + Sync>;

/// How transitions are serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockingStrategy {
    /// One lock for the whole engine: at most one transition is in flight
    /// across all of its instances, and a slow hook delays every entity.
    #[default]
    Engine,
    /// One lock per instance id: transitions of different entities run
    /// concurrently; instances sharing an id still serialize.
    PerInstance,
}

struct Shared {
    observer: Option<Observer>,
    cache: Option<Arc<ConfigCache>>,
    locking: LockingStrategy,
    engine_lock: Arc<Mutex<()>>,
    instance_locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
    hooks: Hooks,
    history_capacity: usize,
}

/// Lifecycle engine: owns the observer, hooks and transition lock, and
/// creates instances bound to validated graphs.
///
/// Cloning is cheap and yields a handle to the same engine.
#[derive(Clone)]
pub struct StateMachine {
    shared: Arc<Shared>,
}

impl StateMachine {
    /// Engine with `observer`, the process-wide config cache and engine-wide locking.
    pub fn new<F>(observer: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self::builder().observer(observer).build()
    }

    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::new()
    }

    pub fn locking(&self) -> LockingStrategy {
        self.shared.locking
    }

    pub fn cache(&self) -> &ConfigCache {
        self.shared
            .cache
            .as_deref()
            .unwrap_or_else(|| ConfigCache::global())
    }

    /// Create an instance of the graph at `source`, starting in `initial_state`
    /// with no sub-state and nothing pending.
    pub fn new_instance(
        &self,
        source: &str,
        instance_id: &str,
        initial_state: &str,
    ) -> Result<Instance, MachineError> {
        let graph = self.cache().load(source)?;
        if !graph.contains_state(initial_state) {
            return Err(MachineError::InstanceCreation {
                instance_id: instance_id.to_string(),
                state: initial_state.to_string(),
                source_id: source.to_string(),
            });
        }

        debug!(source, instance_id, state = initial_state, "created instance");
        let data = InstanceData {
            state: initial_state.to_string(),
            substate: String::new(),
            expected_events: Vec::new(),
            pending_timeout: None,
            entered_at: Utc::now(),
            history: EventHistory::with_capacity(self.shared.history_capacity),
        };
        Ok(Instance::new(self.clone(), graph, instance_id.to_string(), data))
    }

    /// Rebuild an instance from a snapshot, reloading its graph through this
    /// engine's cache.
    pub fn restore_instance(&self, snapshot: &InstanceSnapshot) -> Result<Instance, MachineError> {
        snapshot.check_version()?;
        let graph = self.cache().load(&snapshot.source)?;
        if !graph.contains_state(&snapshot.state) {
            return Err(MachineError::InstanceCreation {
                instance_id: snapshot.instance_id.clone(),
                state: snapshot.state.clone(),
                source_id: snapshot.source.clone(),
            });
        }

        let mut history = EventHistory::with_capacity(self.shared.history_capacity);
        for event in snapshot.history.events() {
            history.record(event.clone());
        }

        debug!(
            source = %snapshot.source,
            instance_id = %snapshot.instance_id,
            state = %snapshot.state,
            "restored instance"
        );
        let data = InstanceData {
            state: snapshot.state.clone(),
            substate: snapshot.substate.clone(),
            expected_events: snapshot.expected_events.clone(),
            pending_timeout: snapshot.pending_timeout.map(Duration::from_secs),
            entered_at: snapshot.entered_at,
            history,
        };
        Ok(Instance::new(self.clone(), graph, snapshot.instance_id.clone(), data))
    }

    pub(crate) fn hooks(&self) -> &Hooks {
        &self.shared.hooks
    }

    pub(crate) fn notify(&self, event: &Event) {
        if let Some(observer) = &self.shared.observer {
            observer(event);
        }
    }

    /// The lock an instance with `instance_id` must hold while mutating.
    pub(crate) fn serial_lock(&self, instance_id: &str) -> Arc<Mutex<()>> {
        match self.shared.locking {
            LockingStrategy::Engine => Arc::clone(&self.shared.engine_lock),
            LockingStrategy::PerInstance => {
                let mut locks = self
                    .shared
                    .instance_locks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if let Some(lock) = locks.get(instance_id).and_then(Weak::upgrade) {
                    return lock;
                }
                locks.retain(|_, lock| lock.strong_count() > 0);
                let lock = Arc::new(Mutex::new(()));
                locks.insert(instance_id.to_string(), Arc::downgrade(&lock));
                lock
            }
        }
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("locking", &self.shared.locking)
            .field("observer", &self.shared.observer.is_some())
            .field("hooks", &self.shared.hooks)
            .field("history_capacity", &self.shared.history_capacity)
            .finish()
    }
}

/// Builder for constructing engines with a fluent API.
pub struct StateMachineBuilder {
    observer: Option<Observer>,
    cache: Option<Arc<ConfigCache>>,
    locking: LockingStrategy,
    hooks: Hooks,
    history_capacity: usize,
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        Self {
            observer: None,
            cache: None,
            locking: LockingStrategy::default(),
            hooks: Hooks::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Set the transition observer.
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Use a dedicated cache instead of the process-wide one.
    pub fn cache(mut self, cache: Arc<ConfigCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn locking(mut self, locking: LockingStrategy) -> Self {
        self.locking = locking;
        self
    }

    /// Register a hook run after an instance enters `state`.
    pub fn on_entry<F>(mut self, state: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Result<(), HookFailure> + Send + Sync + 'static,
    {
        self.hooks.set(HookPhase::Entry, state, hook);
        self
    }

    /// Register a hook run before an instance leaves `state`.
    pub fn on_exit<F>(mut self, state: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Result<(), HookFailure> + Send + Sync + 'static,
    {
        self.hooks.set(HookPhase::Exit, state, hook);
        self
    }

    /// Number of events each instance keeps in its history.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn build(self) -> StateMachine {
        StateMachine {
            shared: Arc::new(Shared {
                observer: self.observer,
                cache: self.cache,
                locking: self.locking,
                engine_lock: Arc::new(Mutex::new(())),
                instance_locks: Mutex::new(HashMap::new()),
                hooks: self.hooks,
                history_capacity: self.history_capacity,
            }),
        }
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
