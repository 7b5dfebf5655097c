pub mod compensation;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod schema;
pub mod stats;
pub mod summary;
pub mod table;
pub mod tokenizer;

pub use engine::{EngineConfig, Match, PlacementEngine};
pub use error::{LoadError, Result};
pub use index::*;
pub use schema::{Schema, SENTINEL};
pub use table::{Record, Table, Value};
