use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Cells + columns
// ---------------------------------------------------------------------------

/// Declared type tag of a column. Comparison is tag equality only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Int64,
    Float64,
    Bool,
    String,
    /// Every cell of the column is empty.
    Null,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64 => write!(f, "int64"),
            Self::Float64 => write!(f, "float64"),
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "object"),
            Self::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    /// Exact cell equality. Same variant and payload; NaN matches NaN in the
    /// same position, `Null` matches `Null`.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    /// Cell equality with an absolute tolerance applied to float pairs only.
    pub fn within(&self, other: &Value, tolerance: f64) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) if tolerance > 0.0 => {
                self.same_as(other) || (a - b).abs() <= tolerance
            }
            _ => self.same_as(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: DataType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: DataType, values: Vec<Value>) -> Self {
        Self { name: name.into(), dtype, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A labeled 2-D result: ordered, uniquely named, equally long columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, ReconError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(ReconError::DuplicateColumn { column: col.name.clone() });
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(ReconError::RaggedColumns {
                    column: bad.name.clone(),
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Look a column up by name. `None` means the column is absent.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn schema(&self) -> Vec<(String, DataType)> {
        self.columns.iter().map(|c| (c.name.clone(), c.dtype)).collect()
    }
}

// ---------------------------------------------------------------------------
// Question keys + run outputs
// ---------------------------------------------------------------------------

/// Label of one expected output table (a node annotation in the workflow).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QuestionKey(String);

impl QuestionKey {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Synthesized key for outputs whose labels are all unset. 1-based.
    pub fn ordinal(n: usize) -> Self {
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QuestionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Insertion-ordered `QuestionKey -> Table` mapping owned by one run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOutput {
    entries: Vec<(QuestionKey, Table)>,
}

impl RunOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from extractor output. When every label is unset the keys are
    /// ordinals in output order; otherwise labels are used verbatim.
    pub fn from_labeled(outputs: Vec<(Option<String>, Table)>) -> Self {
        let all_unset = outputs
            .iter()
            .all(|(label, _)| label.as_deref().map(str::trim).unwrap_or("").is_empty());

        let mut run = Self::new();
        for (i, (label, table)) in outputs.into_iter().enumerate() {
            let key = if all_unset {
                QuestionKey::ordinal(i + 1)
            } else {
                QuestionKey::new(label.unwrap_or_default())
            };
            run.insert(key, table);
        }
        run
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: QuestionKey, table: Table) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = table;
        } else {
            self.entries.push((key, table));
        }
    }

    pub fn remove(&mut self, key: &QuestionKey) -> Option<Table> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &QuestionKey) -> Option<&Table> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn contains(&self, key: &QuestionKey) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &QuestionKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionKey, &Table)> {
        self.entries.iter().map(|(k, t)| (k, t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(QuestionKey, Table)> for RunOutput {
    fn from_iter<I: IntoIterator<Item = (QuestionKey, Table)>>(iter: I) -> Self {
        let mut run = Self::new();
        for (k, t) in iter {
            run.insert(k, t);
        }
        run
    }
}

// ---------------------------------------------------------------------------
// Node usage
// ---------------------------------------------------------------------------

/// Node type -> number of nodes of that type in one workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct NodeCounts(BTreeMap<String, usize>);

impl NodeCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node_type: impl Into<String>, count: usize) {
        *self.0.entry(node_type.into()).or_insert(0) += count;
    }

    /// Count for `node_type`; absent types count zero.
    pub fn get(&self, node_type: &str) -> usize {
        self.0.get(node_type).copied().unwrap_or(0)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, usize)> for NodeCounts {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (t, n) in iter {
            counts.add(t, n);
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Extraction + reference
// ---------------------------------------------------------------------------

/// Everything the extractor produces for one executed workflow.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub output: RunOutput,
    /// Input data file read by the workflow; empty when unknown.
    pub data_path: String,
}

/// The instructor's run. Only ever handed out by shared reference.
#[derive(Debug, Clone)]
pub struct ReferenceRun {
    output: RunOutput,
    nodes: NodeCounts,
}

impl ReferenceRun {
    pub fn new(output: RunOutput, nodes: NodeCounts) -> Self {
        Self { output, nodes }
    }

    pub fn output(&self) -> &RunOutput {
        &self.output
    }

    pub fn nodes(&self) -> &NodeCounts {
        &self.nodes
    }

    /// The question universe, in reference order.
    pub fn questions(&self) -> Vec<QuestionKey> {
        self.output.keys().cloned().collect()
    }

    pub fn table(&self, question: &QuestionKey) -> Option<&Table> {
        self.output.get(question)
    }
}
