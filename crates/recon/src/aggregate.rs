use serde::Serialize;

use crate::annotation::Resolution;
use crate::check::Check;
use crate::model::{NodeCounts, QuestionKey, ReferenceRun, RunOutput};
use crate::schema::{check_schema, SchemaReport};
use crate::values::{check_values, ValuePolicy};

/// A completion fraction in [0, 1], or `Ungraded` when the question was not submitted.
pub type Fraction = Check<f64>;

/// Schema + value check of one question for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question: QuestionKey,
    pub schema: Check<SchemaReport>,
    pub values: Check<Vec<String>>,
}

/// Run the schema and value checks for one reference question.
pub fn check_question(
    reference: &ReferenceRun,
    question: &QuestionKey,
    sub_output: &RunOutput,
    policy: ValuePolicy,
) -> QuestionResult {
    let (schema, values) = match reference.table(question) {
        Some(ref_table) => (
            check_schema(ref_table, sub_output, question),
            check_values(ref_table, sub_output, question, policy),
        ),
        // Not a reference question: nothing to grade it against.
        None => (Check::Ungraded, Check::Ungraded),
    };
    QuestionResult { question: question.clone(), schema, values }
}

/// Everything known about one submission once every check has run. Built
/// once by the grading pipeline and consumed by [`build_scorecard`].
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub data_path: String,
    pub extraction_failed: bool,
    pub nodes: NodeCounts,
    pub resolution: Resolution,
    pub questions: Vec<QuestionResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionScore {
    #[serde(flatten)]
    pub result: QuestionResult,
    pub column_presence: Fraction,
    pub type_correctness: Fraction,
    pub value_correctness: Fraction,
}

/// Normalized per-submission result. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct Scorecard {
    pub submission: String,
    pub question_completion: f64,
    pub questions: Vec<QuestionScore>,
    pub node_completion: f64,
    /// Counts for every reference node type (absent types are 0).
    pub node_counts: NodeCounts,
    pub resolution: Resolution,
    pub extraction_failed: bool,
    pub data_path: String,
}

impl Scorecard {
    /// Mean of every numeric fraction; ungraded questions count as 0.
    pub fn overall(&self) -> f64 {
        let mut sum = self.question_completion;
        let mut n = 1usize;
        for q in &self.questions {
            for f in [&q.column_presence, &q.type_correctness, &q.value_correctness] {
                sum += f.checked().copied().unwrap_or(0.0);
                n += 1;
            }
        }
        sum / n as f64
    }

    pub fn question(&self, key: &QuestionKey) -> Option<&QuestionScore> {
        self.questions.iter().find(|q| &q.result.question == key)
    }
}

/// `1 - failed / total`; a total of zero leaves nothing to fail.
pub fn completion(failed: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (1.0 - failed as f64 / total as f64).clamp(0.0, 1.0)
}

/// Share of the reference's node usage satisfied by the submission. Each
/// type is satisfied up to the reference's own count, so surplus nodes of
/// one type never stand in for another. Informational only.
pub fn node_completion(reference: &NodeCounts, submission: &NodeCounts) -> f64 {
    let ref_total = reference.total();
    if ref_total == 0 {
        return 1.0;
    }
    let satisfied: usize = reference
        .node_types()
        .map(|t| submission.get(t).min(reference.get(t)))
        .sum();
    satisfied as f64 / ref_total as f64
}

fn score_question(reference: &ReferenceRun, result: QuestionResult) -> QuestionScore {
    let total = reference.table(&result.question).map(|t| t.column_count()).unwrap_or(0);

    let column_presence = result.schema.as_ref().map(|s| completion(s.missing_cols.len(), total));
    let type_correctness = result.schema.as_ref().map(|s| completion(s.wrong_type.len(), total));
    let value_correctness = result.values.as_ref().map(|v| completion(v.len(), total));

    QuestionScore {
        result,
        column_presence,
        type_correctness,
        value_correctness,
    }
}

/// Roll one submission's checks into its scorecard.
pub fn build_scorecard(reference: &ReferenceRun, submission: &str, outcome: SubmissionOutcome) -> Scorecard {
    let question_count = reference.output().len();
    let question_completion = completion(outcome.resolution.final_diff.missing.len(), question_count);

    let node_counts: NodeCounts = reference
        .nodes()
        .node_types()
        .map(|t| (t.to_string(), outcome.nodes.get(t)))
        .collect();

    let questions = outcome
        .questions
        .into_iter()
        .map(|q| score_question(reference, q))
        .collect();

    Scorecard {
        submission: submission.to_string(),
        question_completion,
        questions,
        node_completion: node_completion(reference.nodes(), &outcome.nodes),
        node_counts,
        resolution: outcome.resolution,
        extraction_failed: outcome.extraction_failed,
        data_path: outcome.data_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::resolve;
    use crate::model::{Column, DataType, Table, Value};
    use proptest::prelude::*;

    fn reference() -> ReferenceRun {
        let q1 = Table::new(vec![
            Column::new("id", DataType::Int64, vec![Value::Int(1), Value::Int(2)]),
            Column::new("score", DataType::Float64, vec![Value::Float(1.5), Value::Float(2.5)]),
        ])
        .unwrap();
        let q2 = Table::new(vec![Column::new("n", DataType::Int64, vec![Value::Int(7)])]).unwrap();
        let output: RunOutput = vec![(QuestionKey::from("Q1"), q1), (QuestionKey::from("Q2"), q2)]
            .into_iter()
            .collect();
        let nodes = vec![("CSV Reader".to_string(), 1), ("GroupBy".to_string(), 3)]
            .into_iter()
            .collect();
        ReferenceRun::new(output, nodes)
    }

    fn outcome(reference: &ReferenceRun, sub: RunOutput, nodes: NodeCounts) -> SubmissionOutcome {
        let resolution = resolve(&reference.questions(), &sub);
        let questions = reference
            .questions()
            .iter()
            .map(|q| check_question(reference, q, &resolution.resolved, ValuePolicy::exact()))
            .collect();
        SubmissionOutcome {
            data_path: String::new(),
            extraction_failed: false,
            nodes,
            resolution,
            questions,
        }
    }

    #[test]
    fn perfect_submission_scores_one() {
        let reference = reference();
        let card = build_scorecard(
            &reference,
            "1001",
            outcome(&reference, reference.output().clone(), reference.nodes().clone()),
        );
        assert_eq!(card.question_completion, 1.0);
        assert_eq!(card.node_completion, 1.0);
        for q in &card.questions {
            assert_eq!(q.column_presence, Check::Checked(1.0));
            assert_eq!(q.type_correctness, Check::Checked(1.0));
            assert_eq!(q.value_correctness, Check::Checked(1.0));
        }
        assert_eq!(card.overall(), 1.0);
    }

    #[test]
    fn omitted_question_is_ungraded_not_zero() {
        let reference = reference();
        let sub: RunOutput = reference
            .output()
            .iter()
            .filter(|(k, _)| k.as_str() != "Q1")
            .map(|(k, t)| (k.clone(), t.clone()))
            .collect();
        let card = build_scorecard(&reference, "1002", outcome(&reference, sub, NodeCounts::new()));

        let q1 = card.question(&"Q1".into()).unwrap();
        assert!(q1.column_presence.is_ungraded());
        assert!(q1.type_correctness.is_ungraded());
        assert!(q1.value_correctness.is_ungraded());
        assert_eq!(card.question_completion, 0.5);
        assert_eq!(card.node_completion, 0.0);
    }

    #[test]
    fn missing_column_halves_presence() {
        let reference = reference();
        let q1 = Table::new(vec![Column::new("id", DataType::Int64, vec![Value::Int(1), Value::Int(2)])]).unwrap();
        let mut sub = reference.output().clone();
        sub.insert("Q1".into(), q1);
        let card = build_scorecard(&reference, "1003", outcome(&reference, sub, NodeCounts::new()));

        let q1 = card.question(&"Q1".into()).unwrap();
        assert_eq!(q1.column_presence, Check::Checked(0.5));
        assert_eq!(q1.type_correctness, Check::Checked(1.0));
        assert_eq!(q1.value_correctness, Check::Checked(1.0));
    }

    #[test]
    fn node_completion_ignores_extra_types_and_surplus() {
        let reference: NodeCounts = vec![("A".to_string(), 2), ("B".to_string(), 2)].into_iter().collect();
        let partial: NodeCounts = vec![("A".to_string(), 1), ("Z".to_string(), 10)].into_iter().collect();
        let over: NodeCounts = vec![("A".to_string(), 5), ("B".to_string(), 5)].into_iter().collect();
        assert_eq!(node_completion(&reference, &partial), 0.25);
        assert_eq!(node_completion(&reference, &over), 1.0);
        assert_eq!(node_completion(&NodeCounts::new(), &partial), 1.0);
    }

    #[test]
    fn surplus_of_one_type_does_not_cover_another() {
        let reference: NodeCounts =
            vec![("CSV Reader".to_string(), 1), ("GroupBy".to_string(), 3)].into_iter().collect();
        let readers_only: NodeCounts = std::iter::once(("CSV Reader".to_string(), 4)).collect();
        assert_eq!(node_completion(&reference, &readers_only), 0.25);
    }

    proptest! {
        #[test]
        fn completion_is_bounded(failed in 0usize..50, total in 0usize..50) {
            let f = completion(failed, total);
            prop_assert!((0.0..=1.0).contains(&f));
        }

        #[test]
        fn node_completion_is_bounded(r in 0usize..6, g in 0usize..6, sr in 0usize..20, sg in 0usize..20) {
            let reference: NodeCounts = vec![("R".to_string(), r), ("G".to_string(), g)].into_iter().collect();
            let submission: NodeCounts = vec![("R".to_string(), sr), ("G".to_string(), sg)].into_iter().collect();
            let f = node_completion(&reference, &submission);
            prop_assert!((0.0..=1.0).contains(&f));
        }
    }
}
