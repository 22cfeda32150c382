use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{build_scorecard, check_question, Scorecard, SubmissionOutcome};
use crate::annotation::resolve;
use crate::config::GradeConfig;
use crate::error::ReconError;
use crate::model::{DataType, Extraction, NodeCounts, QuestionKey, ReferenceRun};

// ---------------------------------------------------------------------------
// Extractor boundary
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ExtractError {
    /// Workflow directory does not exist.
    NotFound(String),
    /// Filesystem error while reading outputs or node settings.
    Io(String),
    /// An output table could not be parsed.
    Parse { file: String, message: String },
    /// The engine ran but exited unsuccessfully.
    EngineFailed { status: Option<i32>, stderr: String },
    /// The engine did not finish in time and was killed.
    Timeout { secs: u64 },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "workflow not found: {path}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse { file, message } => write!(f, "cannot parse '{file}': {message}"),
            Self::EngineFailed { status: Some(code), stderr } => {
                write!(f, "engine exited with status {code}: {}", stderr.trim())
            }
            Self::EngineFailed { status: None, stderr } => {
                write!(f, "engine terminated by signal: {}", stderr.trim())
            }
            Self::Timeout { secs } => write!(f, "engine timed out after {secs}s"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Executes a workflow and hands back its labeled result tables.
pub trait Extractor {
    fn extract(&self, workflow: &Path) -> Result<Extraction, ExtractError>;

    /// Node type -> count for the workflow. Absent types count zero.
    fn count_nodes(&self, workflow: &Path) -> Result<NodeCounts, ExtractError>;
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One student's workflow.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeMeta {
    pub engine_version: String,
    pub run_at: String,
}

/// Reference question with its expected schema, for report headers.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceQuestion {
    pub question: QuestionKey,
    pub columns: Vec<(String, DataType)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub workflow_set: String,
    pub meta: GradeMeta,
    pub questions: Vec<ReferenceQuestion>,
    pub node_types: Vec<String>,
    pub scorecards: Vec<Scorecard>,
}

/// Extract the reference run. Failure here is fatal for the whole batch.
pub fn load_reference(extractor: &dyn Extractor, path: &Path) -> Result<ReferenceRun, ReconError> {
    let to_err = |e: ExtractError| ReconError::ReferenceExtraction {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let extraction = extractor.extract(path).map_err(to_err)?;
    let nodes = extractor.count_nodes(path).map_err(to_err)?;

    info!(
        path = %path.display(),
        questions = extraction.output.len(),
        nodes = nodes.total(),
        "loaded reference workflow"
    );
    Ok(ReferenceRun::new(extraction.output, nodes))
}

/// Grade one submission. Extraction failures degrade to an empty output set;
/// they never propagate.
pub fn grade_submission(
    reference: &ReferenceRun,
    submission: &Submission,
    extractor: &dyn Extractor,
    config: &GradeConfig,
) -> Scorecard {
    let (extraction, extraction_failed) = match extractor.extract(&submission.path) {
        Ok(extraction) => (extraction, false),
        Err(e) => {
            warn!(submission = %submission.id, error = %e, "extraction failed; grading as empty");
            (Extraction::default(), true)
        }
    };

    let nodes = extractor.count_nodes(&submission.path).unwrap_or_else(|e| {
        warn!(submission = %submission.id, error = %e, "node count failed; using zero counts");
        NodeCounts::new()
    });

    let questions = reference.questions();
    let resolution = resolve(&questions, &extraction.output);
    if let Some(ref relabel) = resolution.relabel {
        info!(submission = %submission.id, from = %relabel.from, to = %relabel.to, "relabeled foreign question");
    }

    let policy = config.value_policy();
    let results = questions
        .iter()
        .map(|q| {
            let result = check_question(reference, q, &resolution.resolved, policy);
            debug!(submission = %submission.id, question = %q, ungraded = result.schema.is_ungraded(), "checked");
            result
        })
        .collect();

    let outcome = SubmissionOutcome {
        data_path: extraction.data_path,
        extraction_failed,
        nodes,
        resolution,
        questions: results,
    };
    build_scorecard(reference, &submission.id, outcome)
}

/// Grade every submission of one workflow-set, sequentially and in order.
pub fn grade_workflow_set(
    workflow_set: &str,
    reference: &ReferenceRun,
    submissions: &[Submission],
    extractor: &dyn Extractor,
    config: &GradeConfig,
) -> GradeReport {
    info!(workflow_set, submissions = submissions.len(), "grading workflow-set");

    let scorecards = submissions
        .iter()
        .map(|s| grade_submission(reference, s, extractor, config))
        .collect();

    GradeReport {
        workflow_set: workflow_set.to_string(),
        meta: GradeMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        questions: reference
            .output()
            .iter()
            .map(|(q, t)| ReferenceQuestion {
                question: q.clone(),
                columns: t.schema(),
            })
            .collect(),
        node_types: reference.nodes().node_types().map(str::to_string).collect(),
        scorecards,
    }
}
