use crate::check::Check;
use crate::model::{Column, QuestionKey, RunOutput, Table};

/// How cell values are compared. Exact equality unless a float tolerance is set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValuePolicy {
    /// Absolute tolerance for float-vs-float cells. `0.0` is exact.
    pub float_tolerance: f64,
}

impl ValuePolicy {
    pub fn exact() -> Self {
        Self::default()
    }
}

/// Why two columns could not be compared at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incomparable {
    MissingColumn,
    RowCountMismatch { expected: usize, observed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnComparison {
    Equal,
    Different { first_mismatch_row: usize },
    Incomparable(Incomparable),
}

/// Compare a reference column against the submission's column of the same
/// name, row for row.
pub fn compare_column(reference: &Column, submission: Option<&Column>, policy: ValuePolicy) -> ColumnComparison {
    let Some(submission) = submission else {
        return ColumnComparison::Incomparable(Incomparable::MissingColumn);
    };
    if reference.len() != submission.len() {
        return ColumnComparison::Incomparable(Incomparable::RowCountMismatch {
            expected: reference.len(),
            observed: submission.len(),
        });
    }

    let mismatch = reference
        .values
        .iter()
        .zip(&submission.values)
        .position(|(r, s)| !r.within(s, policy.float_tolerance));

    match mismatch {
        Some(row) => ColumnComparison::Different { first_mismatch_row: row },
        None => ColumnComparison::Equal,
    }
}

/// Names of reference columns whose values differ in the submission.
///
/// Columns that cannot be compared (absent, different row count) are skipped:
/// absence is already reported by the schema check.
pub fn check_values(
    ref_table: &Table,
    sub_output: &RunOutput,
    question: &QuestionKey,
    policy: ValuePolicy,
) -> Check<Vec<String>> {
    let Some(sub_table) = sub_output.get(question) else {
        return Check::Ungraded;
    };

    let incorrect = ref_table
        .columns()
        .iter()
        .filter(|ref_col| {
            matches!(
                compare_column(ref_col, sub_table.column(&ref_col.name), policy),
                ColumnComparison::Different { .. }
            )
        })
        .map(|ref_col| ref_col.name.clone())
        .collect();

    Check::Checked(incorrect)
}
