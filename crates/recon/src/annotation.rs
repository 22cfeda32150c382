//! Question matching between a reference run and one submission.
//!
//! Matching is by annotation only; table contents never take part. The one
//! heuristic is the assisted relabel: when exactly one reference question is
//! missing and exactly one submitted label is foreign, the foreign table is
//! taken to be the answer to the missing question.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::model::{QuestionKey, RunOutput};

/// Missing/foreign question lists for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AnnotationDiff {
    /// Reference questions absent from the submission, reference order.
    pub missing: Vec<QuestionKey>,
    /// Submitted labels absent from the reference, submission order.
    pub foreign: Vec<QuestionKey>,
}

impl AnnotationDiff {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.foreign.is_empty()
    }

    /// The single unambiguous (foreign, missing) pair, if there is one.
    fn one_to_one(&self) -> Option<(&QuestionKey, &QuestionKey)> {
        match (self.foreign.as_slice(), self.missing.as_slice()) {
            ([foreign], [missing]) => Some((foreign, missing)),
            _ => None,
        }
    }
}

/// A relabel applied by [`assisted_relabel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relabel {
    pub from: QuestionKey,
    pub to: QuestionKey,
}

/// Result of reconciling one submission. The submission's original output is
/// not touched; `resolved` is what the checkers grade.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    #[serde(skip)]
    pub resolved: RunOutput,
    pub initial: AnnotationDiff,
    pub relabel: Option<Relabel>,
    /// Recomputed after any relabel; this is what gets reported.
    #[serde(rename = "final")]
    pub final_diff: AnnotationDiff,
}

/// Compare submitted labels against the reference question universe.
pub fn reconcile(reference_keys: &[QuestionKey], submission: &RunOutput) -> AnnotationDiff {
    let reference: HashSet<&QuestionKey> = reference_keys.iter().collect();

    let missing = reference_keys
        .iter()
        .filter(|k| !submission.contains(k))
        .cloned()
        .collect();

    let foreign = submission
        .keys()
        .filter(|k| !reference.contains(k))
        .cloned()
        .collect();

    AnnotationDiff { missing, foreign }
}

/// Re-key the single foreign table under the single missing question.
///
/// Returns `None` unless the diff is exactly 1 missing / 1 foreign. The
/// re-keyed table keeps the foreign entry's position.
pub fn assisted_relabel(
    submission: &RunOutput,
    diff: &AnnotationDiff,
) -> Option<(RunOutput, Relabel)> {
    let (foreign, missing) = diff.one_to_one()?;

    let relabeled = submission
        .iter()
        .map(|(k, t)| {
            let key = if k == foreign { missing.clone() } else { k.clone() };
            (key, t.clone())
        })
        .collect();

    Some((
        relabeled,
        Relabel {
            from: foreign.clone(),
            to: missing.clone(),
        },
    ))
}

/// Reconcile, apply the assisted relabel when it is unambiguous, reconcile again.
pub fn resolve(reference_keys: &[QuestionKey], submission: &RunOutput) -> Resolution {
    let initial = reconcile(reference_keys, submission);

    match assisted_relabel(submission, &initial) {
        Some((resolved, relabel)) => {
            debug!(from = %relabel.from, to = %relabel.to, "assisted relabel");
            let final_diff = reconcile(reference_keys, &resolved);
            Resolution {
                resolved,
                initial,
                relabel: Some(relabel),
                final_diff,
            }
        }
        None => Resolution {
            resolved: submission.clone(),
            final_diff: initial.clone(),
            initial,
            relabel: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, DataType, Table, Value};
    use proptest::prelude::*;

    fn keys(names: &[&str]) -> Vec<QuestionKey> {
        names.iter().map(|n| QuestionKey::from(*n)).collect()
    }

    fn table(tag: i64) -> Table {
        Table::new(vec![Column::new("tag", DataType::Int64, vec![Value::Int(tag)])]).unwrap()
    }

    fn run(names: &[&str]) -> RunOutput {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (QuestionKey::from(*n), table(i as i64)))
            .collect()
    }

    #[test]
    fn missing_and_foreign_keep_their_orders() {
        let diff = reconcile(&keys(&["Q1", "Q2", "Q3"]), &run(&["Q9", "Q1", "Q8"]));
        assert_eq!(diff.missing, keys(&["Q2", "Q3"]));
        assert_eq!(diff.foreign, keys(&["Q9", "Q8"]));
    }

    #[test]
    fn relabel_moves_foreign_table() {
        let sub = run(&["Q1", "Q2_student_label"]);
        let foreign_table = sub.get(&"Q2_student_label".into()).cloned().unwrap();

        let diff = reconcile(&keys(&["Q1", "Q2"]), &sub);
        let (relabeled, relabel) = assisted_relabel(&sub, &diff).unwrap();

        assert_eq!(relabeled.get(&"Q2".into()), Some(&foreign_table));
        assert!(!relabeled.contains(&"Q2_student_label".into()));
        assert_eq!(relabel.from.as_str(), "Q2_student_label");
        assert_eq!(relabel.to.as_str(), "Q2");
        // Input left intact.
        assert!(sub.contains(&"Q2_student_label".into()));
    }

    #[test]
    fn no_relabel_when_ambiguous() {
        let sub = run(&["A", "B"]);
        let res = resolve(&keys(&["Q1", "Q2"]), &sub);
        assert!(res.relabel.is_none());
        assert_eq!(res.resolved, sub);
        assert_eq!(res.final_diff, res.initial);
        assert_eq!(res.final_diff.missing.len(), 2);
    }

    #[test]
    fn no_relabel_when_nothing_foreign() {
        let sub = run(&["Q1"]);
        let res = resolve(&keys(&["Q1", "Q2"]), &sub);
        assert!(res.relabel.is_none());
        assert_eq!(res.final_diff.missing, keys(&["Q2"]));
        assert!(res.final_diff.foreign.is_empty());
    }

    #[test]
    fn resolve_recomputes_after_relabel() {
        let res = resolve(&keys(&["Q1", "Q2"]), &run(&["Q1", "Q3"]));
        assert_eq!(res.initial.missing, keys(&["Q2"]));
        assert_eq!(res.initial.foreign, keys(&["Q3"]));
        assert!(res.final_diff.is_clean());
        assert_eq!(res.resolved.keys().cloned().collect::<Vec<_>>(), keys(&["Q1", "Q2"]));
    }

    fn label_set() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set("[a-e]{1,2}", 0..6).prop_map(|s| s.into_iter().collect())
    }

    proptest! {
        #[test]
        fn diff_is_set_difference(r in label_set(), s in label_set()) {
            let r_keys: Vec<QuestionKey> = r.iter().map(|k| QuestionKey::from(k.as_str())).collect();
            let sub: RunOutput = s.iter().map(|k| (QuestionKey::from(k.as_str()), Table::default())).collect();
            let diff = reconcile(&r_keys, &sub);

            for m in &diff.missing {
                prop_assert!(r.contains(&m.as_str().to_string()));
                prop_assert!(!s.contains(&m.as_str().to_string()));
            }
            for f in &diff.foreign {
                prop_assert!(s.contains(&f.as_str().to_string()));
                prop_assert!(!r.contains(&f.as_str().to_string()));
                prop_assert!(!diff.missing.contains(f));
            }
            let expected_missing = r.iter().filter(|k| !s.contains(k)).count();
            let expected_foreign = s.iter().filter(|k| !r.contains(k)).count();
            prop_assert_eq!(diff.missing.len(), expected_missing);
            prop_assert_eq!(diff.foreign.len(), expected_foreign);
        }

        #[test]
        fn relabel_guard(r in label_set(), s in label_set()) {
            let r_keys: Vec<QuestionKey> = r.iter().map(|k| QuestionKey::from(k.as_str())).collect();
            let sub: RunOutput = s.iter().map(|k| (QuestionKey::from(k.as_str()), Table::default())).collect();
            let res = resolve(&r_keys, &sub);
            let one_to_one = res.initial.missing.len() == 1 && res.initial.foreign.len() == 1;

            prop_assert_eq!(res.relabel.is_some(), one_to_one);
            if !one_to_one {
                prop_assert_eq!(&res.resolved, &sub);
            } else {
                prop_assert!(res.final_diff.is_clean());
            }
        }
    }
}
