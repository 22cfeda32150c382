// Workflow directory I/O: output tables, node settings, discovery, engine runs

pub mod csv;
pub mod discovery;
pub mod extractor;
pub mod nodes;
pub mod settings;

pub use extractor::{MaterializedExtractor, ProcessExtractor};
