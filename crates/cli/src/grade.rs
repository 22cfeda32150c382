//! `wfgrade run` / `wfgrade validate` - grade workflow-sets against a reference.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Subcommand;
use tracing::{info, warn};
use wfgrade_io::discovery::{detect_workflow_sets, list_submissions};
use wfgrade_io::{MaterializedExtractor, ProcessExtractor};
use wfgrade_recon::engine::{grade_workflow_set, load_reference, Extractor, GradeReport};
use wfgrade_recon::{report, GradeConfig, ReferenceRun};

use crate::exit_codes::{EXIT_CONFIG, EXIT_REFERENCE};
use crate::CliError;

#[derive(Subcommand)]
pub enum GradeCommands {
    /// Grade every workflow-set in a workspace against a reference workflow
    #[command(after_help = "\
Examples:
  wfgrade run ~/knime-workspace solution
  wfgrade run ~/knime-workspace solution --exec-path /opt/knime/knime
  wfgrade run ~/knime-workspace solution --save-dir grades --config grading.toml")]
    Run {
        /// Workspace containing the workflow-sets to grade
        workspace: PathBuf,

        /// Name of the reference workflow directory
        ref_workflow: String,

        /// Workflow engine executable; when set, every workflow is executed
        /// instead of reading outputs it already materialized
        #[arg(long, env = "WFGRADE_ENGINE")]
        exec_path: Option<String>,

        /// Directory for reports and the log (default: each workflow-set directory)
        #[arg(long)]
        save_dir: Option<PathBuf>,

        /// Grading config (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also write the report as JSON
        #[arg(long)]
        json: bool,

        /// Log to the log file only
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a grading config without running
    Validate {
        /// Path to the grading config (TOML)
        config: PathBuf,
    },
}

pub fn cmd_grade(cmd: GradeCommands) -> Result<(), CliError> {
    match cmd {
        GradeCommands::Run {
            workspace,
            ref_workflow,
            exec_path,
            save_dir,
            config,
            json,
            quiet,
        } => cmd_run(RunArgs {
            workspace,
            ref_workflow,
            exec_path,
            save_dir,
            config,
            json,
            quiet,
        }),
        GradeCommands::Validate { config } => cmd_validate(config),
    }
}

struct RunArgs {
    workspace: PathBuf,
    ref_workflow: String,
    exec_path: Option<String>,
    save_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
    quiet: bool,
}

fn load_config(path: Option<&Path>) -> Result<GradeConfig, CliError> {
    let Some(path) = path else {
        return Ok(GradeConfig::default());
    };
    let s = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    GradeConfig::from_toml(&s).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: e.to_string(),
        hint: None,
    })
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let start = Instant::now();

    if !args.workspace.is_dir() {
        return Err(CliError::args(format!("workspace not found: {}", args.workspace.display())));
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(ref program) = args.exec_path {
        config.engine.program = program.clone();
    }

    let log_dir = args.save_dir.clone().unwrap_or_else(|| args.workspace.clone());
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", log_dir.display())))?;
    crate::logging::init(&log_dir, &args.workspace, args.quiet)?;

    let extractor: Box<dyn Extractor> = match args.exec_path {
        Some(_) => Box::new(ProcessExtractor::new(config.engine.clone())),
        None => Box::new(MaterializedExtractor::new(config.engine.output_dir.clone())),
    };

    info!(workspace = %args.workspace.display(), "detecting workflow-sets");
    let sets = detect_workflow_sets(&args.workspace, &config.discovery).map_err(CliError::io)?;
    let targets: Vec<(String, PathBuf)> = if sets.is_empty() {
        info!("no workflow-sets detected; grading the workspace itself");
        vec![(dir_name(&args.workspace), args.workspace.clone())]
    } else {
        sets.into_iter()
            .map(|name| {
                let dir = args.workspace.join(&name);
                (name, dir)
            })
            .collect()
    };

    // A reference at the workspace root serves every set.
    let shared_ref_path = args.workspace.join(&args.ref_workflow);
    let shared_reference = if shared_ref_path.is_dir() {
        Some(load_reference(extractor.as_ref(), &shared_ref_path).map_err(reference_err)?)
    } else {
        None
    };

    let mut graded = 0usize;
    let mut references = usize::from(shared_reference.is_some());
    for (name, set_dir) in &targets {
        let local_reference;
        let reference: &ReferenceRun = match shared_reference {
            Some(ref r) => r,
            None => {
                let path = set_dir.join(&args.ref_workflow);
                if !path.is_dir() {
                    warn!(workflow_set = %name, "no reference workflow '{}' found; skipping", args.ref_workflow);
                    continue;
                }
                local_reference = load_reference(extractor.as_ref(), &path).map_err(reference_err)?;
                references += 1;
                &local_reference
            }
        };

        let submissions = list_submissions(set_dir, &args.ref_workflow, &config.discovery).map_err(CliError::io)?;
        let report = grade_workflow_set(name, reference, &submissions, extractor.as_ref(), &config);
        graded += report.scorecards.len();

        let out_dir = args.save_dir.clone().unwrap_or_else(|| set_dir.clone());
        write_reports(&report, &out_dir, &config, args.json || config.report.json)?;
        print_summary(&report);
    }

    if references == 0 {
        return Err(CliError::args(format!("reference workflow '{}' not found", args.ref_workflow))
            .with_hint("pass the directory name of the reference workflow inside the workspace"));
    }

    eprintln!(
        "graded {} workflow(s) in {} seconds",
        graded,
        start.elapsed().as_secs_f64().round()
    );
    Ok(())
}

fn reference_err(e: wfgrade_recon::ReconError) -> CliError {
    CliError {
        code: EXIT_REFERENCE,
        message: e.to_string(),
        hint: Some("check that the reference workflow runs and produces labeled outputs".into()),
    }
}

fn write_reports(report: &GradeReport, out_dir: &Path, config: &GradeConfig, json: bool) -> Result<(), CliError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", out_dir.display())))?;

    let csv_path = out_dir.join(config.report.file_name_for(&report.workflow_set));
    let file = std::fs::File::create(&csv_path)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", csv_path.display())))?;
    report::write_csv(report, file).map_err(|e| CliError::io(e.to_string()))?;
    info!(path = %csv_path.display(), "wrote report");

    if json {
        let json_path = csv_path.with_extension("json");
        let body = report::to_json(report).map_err(|e| CliError::io(e.to_string()))?;
        std::fs::write(&json_path, body)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", json_path.display())))?;
        info!(path = %json_path.display(), "wrote report");
    }
    Ok(())
}

fn print_summary(report: &GradeReport) {
    let n = report.scorecards.len();
    let failed = report.scorecards.iter().filter(|c| c.extraction_failed).count();
    let relabeled = report.scorecards.iter().filter(|c| c.resolution.relabel.is_some()).count();
    let mean = if n == 0 {
        0.0
    } else {
        report.scorecards.iter().map(|c| c.overall()).sum::<f64>() / n as f64
    };
    eprintln!(
        "{}: {} submission(s), mean score {:.1}%, {} relabeled, {} failed to run",
        report.workflow_set,
        n,
        mean * 100.0,
        relabeled,
        failed,
    );
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    eprintln!(
        "valid: engine '{}' (timeout {}s), float tolerance {}, report '{}'",
        config.engine.program,
        config.engine.timeout_secs,
        config.values.float_tolerance,
        config.report.file_name,
    );
    Ok(())
}
