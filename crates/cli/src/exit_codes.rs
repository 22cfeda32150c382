//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                         |
//! |------|-----------------------------------------------------|
//! | 0    | Success (every discovered submission got a row)     |
//! | 2    | CLI usage error (bad args, missing workspace)       |
//! | 3    | I/O error (discovery, log or report write)          |
//! | 4    | Invalid grading config                              |
//! | 5    | Reference workflow could not be extracted           |
//!
//! Individual submission failures never change the exit code: they degrade
//! that submission's row instead. Code 1 is not used; every failure maps to
//! a specific code.

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing workspace or reference directory.
pub const EXIT_USAGE: u8 = 2;

/// I/O error - cannot list directories, open the log file or write a report.
pub const EXIT_IO: u8 = 3;

/// Config error - TOML parse or validation failure.
pub const EXIT_CONFIG: u8 = 4;

/// Reference extraction failed; there is nothing to grade against.
pub const EXIT_REFERENCE: u8 = 5;
