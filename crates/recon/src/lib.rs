//! `wfgrade-recon` - reference-vs-submission reconciliation and scoring engine.
//!
//! Pure engine crate: receives extracted result tables (through the
//! [`Extractor`] seam), returns scorecards. No CLI dependencies.

pub mod aggregate;
pub mod annotation;
pub mod check;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod report;
pub mod schema;
pub mod values;

pub use aggregate::{Fraction, QuestionResult, QuestionScore, Scorecard};
pub use annotation::{reconcile, resolve, AnnotationDiff, Relabel, Resolution};
pub use check::Check;
pub use config::GradeConfig;
pub use engine::{grade_submission, grade_workflow_set, load_reference, ExtractError, Extractor, GradeReport, Submission};
pub use error::ReconError;
pub use model::{Column, DataType, Extraction, NodeCounts, QuestionKey, ReferenceRun, RunOutput, Table, Value};
pub use values::ValuePolicy;
