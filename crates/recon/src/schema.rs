use serde::Serialize;

use crate::check::Check;
use crate::model::{DataType, QuestionKey, RunOutput, Table};

/// A reference column present in the submission with another declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrongType {
    pub column: String,
    pub expected: DataType,
    pub observed: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchemaReport {
    /// Reference columns absent from the submission, reference order.
    pub missing_cols: Vec<String>,
    /// Present columns whose declared type differs. Never overlaps `missing_cols`.
    pub wrong_type: Vec<WrongType>,
}

/// Check column presence and declared types of one question.
pub fn check_schema(ref_table: &Table, sub_output: &RunOutput, question: &QuestionKey) -> Check<SchemaReport> {
    let Some(sub_table) = sub_output.get(question) else {
        return Check::Ungraded;
    };

    let mut report = SchemaReport::default();
    for ref_col in ref_table.columns() {
        match sub_table.column(&ref_col.name) {
            None => report.missing_cols.push(ref_col.name.clone()),
            Some(sub_col) if sub_col.dtype != ref_col.dtype => report.wrong_type.push(WrongType {
                column: ref_col.name.clone(),
                expected: ref_col.dtype,
                observed: sub_col.dtype,
            }),
            Some(_) => {}
        }
    }

    Check::Checked(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Value};

    fn reference() -> Table {
        Table::new(vec![
            Column::new("id", DataType::Int64, vec![Value::Int(1), Value::Int(2)]),
            Column::new("age", DataType::Int64, vec![Value::Int(30), Value::Int(41)]),
            Column::new("score", DataType::Float64, vec![Value::Float(0.5), Value::Float(0.7)]),
        ])
        .unwrap()
    }

    fn submission(table: Table) -> RunOutput {
        std::iter::once((QuestionKey::from("Q1"), table)).collect()
    }

    #[test]
    fn absent_question_is_ungraded() {
        let out = check_schema(&reference(), &RunOutput::new(), &"Q1".into());
        assert!(out.is_ungraded());
    }

    #[test]
    fn missing_column_is_not_type_checked() {
        let sub = Table::new(vec![
            Column::new("id", DataType::Int64, vec![Value::Int(1), Value::Int(2)]),
            Column::new("score", DataType::Float64, vec![Value::Float(0.5), Value::Float(0.7)]),
        ])
        .unwrap();
        let out = check_schema(&reference(), &submission(sub), &"Q1".into());
        let report = out.checked().unwrap();
        assert_eq!(report.missing_cols, vec!["age"]);
        assert!(report.wrong_type.iter().all(|w| w.column != "age"));
    }

    #[test]
    fn int_vs_float_is_a_type_mismatch() {
        let sub = Table::new(vec![
            Column::new("id", DataType::Int64, vec![Value::Int(1), Value::Int(2)]),
            Column::new("age", DataType::Int64, vec![Value::Int(30), Value::Int(41)]),
            Column::new("score", DataType::Int64, vec![Value::Int(0), Value::Int(1)]),
        ])
        .unwrap();
        let out = check_schema(&reference(), &submission(sub), &"Q1".into());
        let report = out.checked().unwrap();
        assert!(report.missing_cols.is_empty());
        assert_eq!(
            report.wrong_type,
            vec![WrongType {
                column: "score".into(),
                expected: DataType::Float64,
                observed: DataType::Int64,
            }]
        );
    }

    #[test]
    fn extra_columns_are_ignored() {
        let mut cols = reference().columns().to_vec();
        cols.push(Column::new("extra", DataType::Bool, vec![Value::Bool(true), Value::Bool(false)]));
        let out = check_schema(&reference(), &submission(Table::new(cols).unwrap()), &"Q1".into());
        assert_eq!(out, Check::Checked(SchemaReport::default()));
    }
}
