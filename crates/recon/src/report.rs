//! Tabular rendering of a [`GradeReport`]: one row per submission.
//!
//! Layout: the `submission` index column, then every column whose name
//! contains `_summary`, then the raw mismatch detail, node counts and the
//! data path.
//! Fractions print with four decimals, ungraded cells print `UNGRADED`, and
//! list cells are `;`-joined.

use std::io::Write;

use crate::aggregate::{Fraction, QuestionScore, Scorecard};
use crate::annotation::AnnotationDiff;
use crate::check::{Check, UNGRADED};
use crate::engine::GradeReport;
use crate::error::ReconError;
use crate::model::QuestionKey;

pub const SUMMARY_MARKER: &str = "_summary";

/// Column names, in output order.
pub fn report_header(report: &GradeReport) -> Vec<String> {
    let raw = raw_header(report);
    let order = summary_first(&raw);
    permute(raw, &order)
}

/// One row per scorecard, aligned with [`report_header`].
pub fn report_rows(report: &GradeReport) -> Vec<Vec<String>> {
    let order = summary_first(&raw_header(report));
    report
        .scorecards
        .iter()
        .map(|card| permute(scorecard_row(report, card), &order))
        .collect()
}

/// Column positions with every `_summary` column moved ahead of the rest.
/// Stable on both sides; the `submission` index column stays first. Question
/// keys and node types are free-form, so detail columns can carry the marker.
fn summary_first(raw: &[String]) -> Vec<usize> {
    let (summary, detail): (Vec<usize>, Vec<usize>) =
        (1..raw.len()).partition(|&i| raw[i].contains(SUMMARY_MARKER));
    std::iter::once(0).chain(summary).chain(detail).collect()
}

fn permute(mut cells: Vec<String>, order: &[usize]) -> Vec<String> {
    order.iter().map(|&i| std::mem::take(&mut cells[i])).collect()
}

fn raw_header(report: &GradeReport) -> Vec<String> {
    let mut header = vec!["submission".to_string(), "question_summary".to_string()];
    for q in &report.questions {
        header.push(format!("{}_column_summary", q.question));
        header.push(format!("{}_dtype_summary", q.question));
        header.push(format!("{}_value_summary", q.question));
    }
    header.push("node_summary".into());

    header.push("missing_questions".into());
    header.push("foreign_questions".into());
    header.push("relabeled".into());
    for q in &report.questions {
        header.push(format!("{}_missing_columns", q.question));
        header.push(format!("{}_wrong_dtypes", q.question));
        header.push(format!("{}_incorrect_values", q.question));
    }
    for t in &report.node_types {
        header.push(format!("node_{t}"));
    }
    header.push("extraction_failed".into());
    header.push("data_path".into());
    header
}

fn scorecard_row(report: &GradeReport, card: &Scorecard) -> Vec<String> {
    let scores: Vec<Option<&QuestionScore>> =
        report.questions.iter().map(|q| card.question(&q.question)).collect();

    let mut row = vec![card.submission.clone(), fmt_fraction(card.question_completion)];
    for score in &scores {
        match score {
            Some(s) => {
                row.push(fmt_check(&s.column_presence));
                row.push(fmt_check(&s.type_correctness));
                row.push(fmt_check(&s.value_correctness));
            }
            None => row.extend(std::iter::repeat(UNGRADED.to_string()).take(3)),
        }
    }
    row.push(fmt_fraction(card.node_completion));

    let AnnotationDiff { missing, foreign } = &card.resolution.final_diff;
    row.push(join_keys(missing));
    row.push(join_keys(foreign));
    row.push(
        card.resolution
            .relabel
            .as_ref()
            .map(|r| format!("{}->{}", r.from, r.to))
            .unwrap_or_default(),
    );

    for score in &scores {
        let Some(s) = score else {
            row.extend(std::iter::repeat(UNGRADED.to_string()).take(3));
            continue;
        };
        match &s.result.schema {
            Check::Ungraded => {
                row.push(UNGRADED.into());
                row.push(UNGRADED.into());
            }
            Check::Checked(schema) => {
                row.push(schema.missing_cols.join(";"));
                row.push(
                    schema
                        .wrong_type
                        .iter()
                        .map(|w| format!("{}:{}", w.column, w.observed))
                        .collect::<Vec<_>>()
                        .join(";"),
                );
            }
        }
        row.push(match &s.result.values {
            Check::Ungraded => UNGRADED.into(),
            Check::Checked(cols) => cols.join(";"),
        });
    }

    for t in &report.node_types {
        row.push(card.node_counts.get(t).to_string());
    }
    row.push(card.extraction_failed.to_string());
    row.push(card.data_path.clone());
    row
}

fn fmt_fraction(f: f64) -> String {
    format!("{f:.4}")
}

fn fmt_check(f: &Fraction) -> String {
    match f {
        Check::Checked(v) => fmt_fraction(*v),
        Check::Ungraded => UNGRADED.into(),
    }
}

fn join_keys(keys: &[QuestionKey]) -> String {
    keys.iter().map(QuestionKey::as_str).collect::<Vec<_>>().join(";")
}

/// Write the report as CSV.
pub fn write_csv<W: Write>(report: &GradeReport, writer: W) -> Result<(), ReconError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(report_header(report))?;
    for row in report_rows(report) {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_json(report: &GradeReport) -> Result<String, ReconError> {
    serde_json::to_string_pretty(report).map_err(|e| ReconError::Io(format!("JSON serialization error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradeConfig;
    use crate::engine::{grade_workflow_set, ExtractError, Extractor, Submission};
    use crate::model::{Column, DataType, Extraction, NodeCounts, ReferenceRun, RunOutput, Table, Value};
    use std::path::{Path, PathBuf};

    struct Fixed(RunOutput);

    impl Extractor for Fixed {
        fn extract(&self, workflow: &Path) -> Result<Extraction, ExtractError> {
            if workflow.ends_with("broken") {
                return Err(ExtractError::Timeout { secs: 1 });
            }
            Ok(Extraction {
                output: self.0.clone(),
                data_path: "data/input.csv".into(),
            })
        }

        fn count_nodes(&self, _workflow: &Path) -> Result<NodeCounts, ExtractError> {
            Ok(std::iter::once(("CSV Reader".to_string(), 1)).collect())
        }
    }

    fn report() -> GradeReport {
        let q1 = Table::new(vec![Column::new("id", DataType::Int64, vec![Value::Int(1)])]).unwrap();
        let output: RunOutput = std::iter::once((QuestionKey::from("Q1"), q1)).collect();
        let reference = ReferenceRun::new(output.clone(), std::iter::once(("CSV Reader".to_string(), 1)).collect());
        let subs = vec![
            Submission { id: "1001".into(), path: PathBuf::from("ws/1001") },
            Submission { id: "1002".into(), path: PathBuf::from("ws/broken") },
        ];
        grade_workflow_set("set", &reference, &subs, &Fixed(output), &GradeConfig::default())
    }

    #[test]
    fn summary_columns_come_first() {
        let header = report_header(&report());
        assert_eq!(header[0], "submission");
        let last_summary = header.iter().rposition(|h| h.contains(SUMMARY_MARKER)).unwrap();
        let first_detail = header
            .iter()
            .skip(1)
            .position(|h| !h.contains(SUMMARY_MARKER))
            .map(|i| i + 1)
            .unwrap();
        assert!(last_summary < first_detail);
        assert_eq!(header.last().unwrap(), "data_path");
    }

    #[test]
    fn summary_named_question_keeps_summaries_first() {
        let q = Table::new(vec![Column::new("total", DataType::Int64, vec![Value::Int(9)])]).unwrap();
        let output: RunOutput = std::iter::once((QuestionKey::from("sales_summary"), q)).collect();
        let reference = ReferenceRun::new(output.clone(), std::iter::once(("CSV Reader".to_string(), 1)).collect());
        let subs = vec![Submission { id: "1001".into(), path: PathBuf::from("ws/1001") }];
        let report = grade_workflow_set("set", &reference, &subs, &Fixed(output), &GradeConfig::default());

        let header = report_header(&report);
        let last_summary = header.iter().rposition(|h| h.contains(SUMMARY_MARKER)).unwrap();
        let first_detail = header
            .iter()
            .skip(1)
            .position(|h| !h.contains(SUMMARY_MARKER))
            .map(|i| i + 1)
            .unwrap();
        assert!(last_summary < first_detail, "header: {header:?}");
        assert_eq!(header[0], "submission");
        assert_eq!(header.last().unwrap(), "data_path");

        // Cells follow their columns through the reordering.
        let rows = report_rows(&report);
        let col = |name: &str| header.iter().position(|h| h == name).unwrap();
        assert_eq!(rows[0][0], "1001");
        assert_eq!(rows[0][col("sales_summary_column_summary")], "1.0000");
        assert_eq!(rows[0][col("sales_summary_missing_columns")], "");
        assert_eq!(rows[0][col("sales_summary_incorrect_values")], "");
        assert_eq!(rows[0][col("node_CSV Reader")], "1");
        assert_eq!(rows[0][col("extraction_failed")], "false");
    }

    #[test]
    fn rows_align_with_header() {
        let report = report();
        let header = report_header(&report);
        let rows = report_rows(&report);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), header.len());
        }

        let col = |name: &str| header.iter().position(|h| h == name).unwrap();
        assert_eq!(rows[0][col("Q1_column_summary")], "1.0000");
        assert_eq!(rows[0][col("data_path")], "data/input.csv");
        assert_eq!(rows[1][col("Q1_column_summary")], UNGRADED);
        assert_eq!(rows[1][col("Q1_missing_columns")], UNGRADED);
        assert_eq!(rows[1][col("question_summary")], "0.0000");
        assert_eq!(rows[1][col("missing_questions")], "Q1");
        assert_eq!(rows[1][col("extraction_failed")], "true");
        assert_eq!(rows[1][col("data_path")], "");
    }

    #[test]
    fn csv_has_one_line_per_submission() {
        let mut buf = Vec::new();
        write_csv(&report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("submission,question_summary,"));
    }

    #[test]
    fn json_marks_ungraded() {
        let json = to_json(&report()).unwrap();
        assert!(json.contains("\"UNGRADED\""));
        assert!(json.contains("\"workflow_set\": \"set\""));
    }
}
