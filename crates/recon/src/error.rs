use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad tolerance, empty marker name, etc.).
    ConfigValidation(String),
    /// Two columns of one table share a name.
    DuplicateColumn { column: String },
    /// Columns of one table have different lengths.
    RaggedColumns { column: String, expected: usize, found: usize },
    /// The reference workflow could not be extracted. Fatal: nothing to grade against.
    ReferenceExtraction { path: String, message: String },
    /// IO error (report write, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::DuplicateColumn { column } => write!(f, "duplicate column '{column}'"),
            Self::RaggedColumns { column, expected, found } => {
                write!(f, "column '{column}' has {found} row(s), expected {expected}")
            }
            Self::ReferenceExtraction { path, message } => {
                write!(f, "cannot extract reference workflow '{path}': {message}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<std::io::Error> for ReconError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
