//! Loading, normalizing and validating state graph documents.
//!
//! Documents are JSON in the following shape:
//!
//! ```json
//! {
//!   "version": "1.0", "entity": "node", "file": "node.json",
//!   "states": [
//!     { "name": "Configured", "description": "...", "events": ["ready"],
//!       "transition": [ { "to_state": "Operational", "trigger": ["ready"],
//!                         "expectedEvents": [], "timeout": 30 } ],
//!       "substate": { "events": [], "transition": [] } }
//!   ]
//! }
//! ```

pub mod cache;
pub mod error;
pub mod schema;
pub mod validate;

pub use cache::{load_config, ConfigCache, FileReader, MemoryReader, SourceReader};
pub use error::{ConfigError, GraphViolation, Level};
pub use schema::parse_graph;
pub use validate::validate;
