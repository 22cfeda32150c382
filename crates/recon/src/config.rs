use serde::Deserialize;

use crate::error::ReconError;
use crate::values::ValuePolicy;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Grading configuration. Every section has defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradeConfig {
    #[serde(default)]
    pub values: ValuesConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl GradeConfig {
    pub fn from_toml(s: &str) -> Result<Self, ReconError> {
        let config: Self = toml::from_str(s).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let tol = self.values.float_tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "values.float_tolerance must be a finite number >= 0, got {tol}"
            )));
        }
        if self.discovery.workflow_set_marker.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "discovery.workflow_set_marker must not be empty".into(),
            ));
        }
        if self.discovery.diagram_marker.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "discovery.diagram_marker must not be empty".into(),
            ));
        }
        if self.engine.program.trim().is_empty() {
            return Err(ReconError::ConfigValidation("engine.program must not be empty".into()));
        }
        if self.report.file_name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("report.file_name must not be empty".into()));
        }
        Ok(())
    }

    pub fn value_policy(&self) -> ValuePolicy {
        ValuePolicy {
            float_tolerance: self.values.float_tolerance,
        }
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValuesConfig {
    /// Absolute tolerance for float cells. 0 = exact equality.
    #[serde(default)]
    pub float_tolerance: f64,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// File that marks a directory as a workflow-set.
    #[serde(default = "default_set_marker")]
    pub workflow_set_marker: String,
    /// File whose presence means the directory is a single workflow, not a set.
    #[serde(default = "default_diagram_marker")]
    pub diagram_marker: String,
    /// Only directories whose name starts with a digit are submissions.
    #[serde(default = "default_true")]
    pub submission_prefix_digits: bool,
    /// Directory names never treated as workflow-sets.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            workflow_set_marker: default_set_marker(),
            diagram_marker: default_diagram_marker(),
            submission_prefix_digits: true,
            exclude: default_exclude(),
        }
    }
}

fn default_set_marker() -> String {
    "workflowset.meta".into()
}

fn default_diagram_marker() -> String {
    "workflow.svg".into()
}

fn default_exclude() -> Vec<String> {
    vec!["Example Workflows".into()]
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// External workflow engine invocation. `{workflow}` and `{output}` in `args`
/// are replaced by the workflow directory and a scratch output directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Per-workflow limit. 0 disables the timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Where already-materialized outputs live inside a workflow directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_secs: default_timeout(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_program() -> String {
    "knime".into()
}

fn default_args() -> Vec<String> {
    vec![
        "-nosplash".into(),
        "-reset".into(),
        "-nosave".into(),
        "-workflowDir={workflow}".into(),
        "-outputDir={output}".into(),
    ]
}

fn default_timeout() -> u64 {
    600
}

fn default_output_dir() -> String {
    "output".into()
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// `{workflow_set}` is replaced by the set name.
    #[serde(default = "default_report_name")]
    pub file_name: String,
    /// Also write `<file stem>.json` next to the CSV.
    #[serde(default)]
    pub json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_name: default_report_name(),
            json: false,
        }
    }
}

fn default_report_name() -> String {
    "{workflow_set}_grades.csv".into()
}

impl ReportConfig {
    pub fn file_name_for(&self, workflow_set: &str) -> String {
        self.file_name.replace("{workflow_set}", workflow_set)
    }
}
