//! Concrete [`Extractor`]s.
//!
//! Both read an output directory of CSV files, one per labeled output table:
//! the file stem is the annotation, and stems starting with `_` (e.g.
//! `_1.csv`) are outputs whose annotation was left unset.
//!
//! - [`MaterializedExtractor`] reads outputs already present inside the
//!   workflow directory and never runs anything.
//! - [`ProcessExtractor`] runs the external workflow engine into a scratch
//!   directory first, bounded by a per-workflow timeout.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wfgrade_recon::config::EngineConfig;
use wfgrade_recon::engine::{ExtractError, Extractor};
use wfgrade_recon::{Extraction, NodeCounts, RunOutput};

use crate::nodes::count_nodes;
use crate::settings::find_data_path;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Read every `*.csv` in `dir`, sorted by file name, into a [`RunOutput`].
pub fn read_output_dir(dir: &Path) -> Result<RunOutput, ExtractError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ExtractError::Io(format!("cannot read {}: {e}", dir.display())))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ExtractError::Io(e.to_string()))?.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();

    let mut labeled = Vec::with_capacity(files.len());
    for path in files {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let label = if stem.starts_with('_') { None } else { Some(stem) };
        let table = crate::csv::import(&path).map_err(|message| ExtractError::Parse {
            file: path.display().to_string(),
            message,
        })?;
        debug!(file = %path.display(), rows = table.row_count(), "read output table");
        labeled.push((label, table));
    }

    Ok(RunOutput::from_labeled(labeled))
}

fn ensure_workflow(workflow: &Path) -> Result<(), ExtractError> {
    if workflow.is_dir() {
        Ok(())
    } else {
        Err(ExtractError::NotFound(workflow.display().to_string()))
    }
}

fn nodes_of(workflow: &Path) -> Result<NodeCounts, ExtractError> {
    ensure_workflow(workflow)?;
    count_nodes(workflow).map_err(ExtractError::Io)
}

// ---------------------------------------------------------------------------
// Materialized
// ---------------------------------------------------------------------------

/// Reads `<workflow>/<output_dir>/*.csv` produced by an earlier engine run.
#[derive(Debug, Clone)]
pub struct MaterializedExtractor {
    pub output_dir: String,
}

impl MaterializedExtractor {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self { output_dir: output_dir.into() }
    }
}

impl Extractor for MaterializedExtractor {
    fn extract(&self, workflow: &Path) -> Result<Extraction, ExtractError> {
        ensure_workflow(workflow)?;
        let output = read_output_dir(&workflow.join(&self.output_dir))?;
        Ok(Extraction {
            output,
            data_path: find_data_path(workflow),
        })
    }

    fn count_nodes(&self, workflow: &Path) -> Result<NodeCounts, ExtractError> {
        nodes_of(workflow)
    }
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// Runs the configured engine program for every workflow.
#[derive(Debug, Clone)]
pub struct ProcessExtractor {
    pub engine: EngineConfig,
}

impl ProcessExtractor {
    pub fn new(engine: EngineConfig) -> Self {
        Self { engine }
    }

    fn command(&self, workflow: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.engine.program);
        for arg in &self.engine.args {
            cmd.arg(
                arg.replace("{workflow}", &workflow.display().to_string())
                    .replace("{output}", &output.display().to_string()),
            );
        }
        cmd
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, ExtractError> {
        let io_err = |e: std::io::Error| ExtractError::Io(format!("waiting for engine: {e}"));
        if self.engine.timeout_secs == 0 {
            return child.wait().map_err(io_err);
        }

        let started_at = Instant::now();
        let timeout = Duration::from_secs(self.engine.timeout_secs);
        loop {
            match child.try_wait().map_err(io_err)? {
                Some(status) => return Ok(status),
                None if started_at.elapsed() >= timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExtractError::Timeout { secs: self.engine.timeout_secs });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }
}

impl Extractor for ProcessExtractor {
    fn extract(&self, workflow: &Path) -> Result<Extraction, ExtractError> {
        ensure_workflow(workflow)?;

        let scratch = tempfile::tempdir().map_err(|e| ExtractError::Io(e.to_string()))?;
        let output_dir = scratch.path().join("output");
        std::fs::create_dir_all(&output_dir).map_err(|e| ExtractError::Io(e.to_string()))?;

        // stderr goes to a file so a chatty engine cannot fill the pipe while we poll.
        let stderr_path = scratch.path().join("engine.stderr");
        let stderr_file = File::create(&stderr_path).map_err(|e| ExtractError::Io(e.to_string()))?;

        debug!(program = %self.engine.program, workflow = %workflow.display(), "running engine");
        let mut child = self
            .command(workflow, &output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|e| ExtractError::Io(format!("cannot start '{}': {e}", self.engine.program)))?;

        let status = self.wait(&mut child)?;
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            warn!(workflow = %workflow.display(), status = ?status.code(), "engine failed");
            return Err(ExtractError::EngineFailed {
                status: status.code(),
                stderr,
            });
        }

        let output = read_output_dir(&output_dir)?;
        Ok(Extraction {
            output,
            data_path: find_data_path(workflow),
        })
    }

    fn count_nodes(&self, workflow: &Path) -> Result<NodeCounts, ExtractError> {
        nodes_of(workflow)
    }
}
