// wfgrade CLI - grade workflow submissions against a reference workflow

mod exit_codes;
mod grade;
mod logging;

use std::process::ExitCode;

use clap::Parser;

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use grade::GradeCommands;

#[derive(Parser)]
#[command(name = "wfgrade")]
#[command(about = "Grade data-workflow submissions against a reference workflow")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: GradeCommands,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nrecon:   wfgrade-recon ",
        env!("CARGO_PKG_VERSION"),
        "\nreport:  csv (one row per submission), json",
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match grade::cmd_grade(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
