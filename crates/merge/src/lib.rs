//! `squadval-merge`: player statistics and market value merge engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the merged
//! per-player, per-season table plus a run report. File access stays behind
//! [`loader::TableSource`]; progress goes out through [`events::EventSink`].

pub mod combine;
pub mod config;
pub mod csv_io;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod events;
pub mod loader;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod similarity;
pub mod table;
pub mod value;

pub use config::PipelineConfig;
pub use engine::{load_input, run};
pub use error::MergeError;
pub use events::{EventCollector, EventSink, LogSink, MergeEvent, NullSink};
pub use loader::{CsvDirSource, MemorySource, TableSource};
pub use model::{PipelineInput, PipelineReport, PipelineResult};
pub use table::Table;
pub use value::Value;
