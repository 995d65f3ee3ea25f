//! Process-wide cache of validated state graphs.
//!
//! Graphs are loaded lazily on first use and shared read-only afterwards.
//! Readers take a shared lock; a miss upgrades to the exclusive lock and
//! re-checks before reading, so a graph is parsed and validated once even
//! when several threads race on the same source.

use crate::config::error::ConfigError;
use crate::config::schema::parse_graph;
use crate::config::validate::validate;
use crate::core::StateGraph;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Resolves a source identifier to the raw text of a config document.
pub trait SourceReader: Send + Sync {
    fn read(&self, source: &str) -> io::Result<String>;
}

/// Treats the source identifier as a filesystem path.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileReader;

impl SourceReader for FileReader {
    fn read(&self, source: &str) -> io::Result<String> {
        std::fs::read_to_string(source)
    }
}

/// In-memory documents keyed by source, counting every read.
#[derive(Debug, Default)]
pub struct MemoryReader {
    documents: RwLock<HashMap<String, String>>,
    reads: AtomicUsize,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, source: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(source, text);
        self
    }

    pub fn insert(&self, source: impl Into<String>, text: impl Into<String>) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.into(), text.into());
    }

    /// Number of times `read` has been called.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SourceReader for MemoryReader {
    fn read(&self, source: &str) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no document for '{source}'"))
            })
    }
}

impl<R: SourceReader + ?Sized> SourceReader for Arc<R> {
    fn read(&self, source: &str) -> io::Result<String> {
        (**self).read(source)
    }
}

/// Validated graphs keyed by source identifier.
pub struct ConfigCache {
    reader: Box<dyn SourceReader>,
    graphs: RwLock<HashMap<String, Arc<StateGraph>>>,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigCache {
    /// Cache backed by the filesystem.
    pub fn new() -> Self {
        Self::with_reader(FileReader)
    }

    pub fn with_reader(reader: impl SourceReader + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            graphs: RwLock::new(HashMap::new()),
        }
    }

    /// The cache shared by every engine that was not given its own.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ConfigCache> = OnceLock::new();
        GLOBAL.get_or_init(ConfigCache::new)
    }

    /// Return the validated graph for `source`, loading it on first use.
    pub fn load(&self, source: &str) -> Result<Arc<StateGraph>, ConfigError> {
        if let Some(graph) = self.cached(source) {
            debug!(source, "config cache hit");
            return Ok(graph);
        }

        let mut graphs = self.graphs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(graph) = graphs.get(source) {
            return Ok(Arc::clone(graph));
        }

        let text = self.reader.read(source).map_err(|error| ConfigError::Read {
            source_id: source.to_string(),
            error,
        })?;
        let graph = parse_graph(source, &text)?;

        if let Err(violations) = validate(&graph) {
            warn!(source, violations = violations.len(), "config failed validation");
            return Err(ConfigError::Validation {
                source_id: source.to_string(),
                violations,
            });
        }

        info!(
            source,
            entity = %graph.entity,
            version = %graph.version,
            states = graph.states.len(),
            "loaded state graph"
        );
        let graph = Arc::new(graph);
        graphs.insert(source.to_string(), Arc::clone(&graph));
        Ok(graph)
    }

    fn cached(&self, source: &str) -> Option<Arc<StateGraph>> {
        self.graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
    }

    pub fn contains(&self, source: &str) -> bool {
        self.cached(source).is_some()
    }

    pub fn len(&self) -> usize {
        self.graphs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop `source` so the next load re-reads it. Existing holders keep their graph.
    pub fn invalidate(&self, source: &str) -> bool {
        self.graphs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source)
            .is_some()
    }
}

/// Load `source` through the process-wide cache.
pub fn load_config(source: &str) -> Result<Arc<StateGraph>, ConfigError> {
    ConfigCache::global().load(source)
}
