use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{CategoryGroup, GradeRecord};

/// Buckets every score of the given records under the key `key_of` picks for
/// the record. Ungraded entries are dropped.
pub fn group_by<'a, I, F>(records: I, key_of: F) -> BTreeMap<i64, CategoryGroup>
where
    I: IntoIterator<Item = &'a GradeRecord>,
    F: Fn(&GradeRecord) -> i64,
{
    let mut groups: BTreeMap<i64, CategoryGroup> = BTreeMap::new();
    let mut dropped = 0usize;

    for record in records {
        let group = groups.entry(key_of(record)).or_default();
        for entry in &record.scores {
            if !group.push(entry) {
                dropped += 1;
            }
        }
    }

    debug!(groups = groups.len(), dropped, "grouped score entries");
    groups
}

/// One group per learner, across all of their classes.
pub fn group_by_learner<'a, I>(records: I) -> BTreeMap<i64, CategoryGroup>
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    group_by(records, |record| record.learner_id)
}

/// One group per class. Callers pass a single learner's records.
pub fn group_by_class<'a, I>(records: I) -> BTreeMap<i64, CategoryGroup>
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    group_by(records, |record| record.class_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScoreEntry, ScoreKind};

    fn entry(kind: &str, score: f64) -> ScoreEntry {
        ScoreEntry {
            kind: ScoreKind::from(kind),
            score,
        }
    }

    fn record(learner_id: i64, class_id: i64, scores: Vec<ScoreEntry>) -> GradeRecord {
        GradeRecord {
            learner_id,
            class_id,
            scores,
        }
    }

    #[test]
    fn learner_groups_merge_classes() {
        let records = vec![
            record(1, 10, vec![entry("exam", 80.0), entry("quiz", 60.0)]),
            record(1, 11, vec![entry("exam", 90.0)]),
            record(2, 10, vec![entry("homework", 50.0)]),
        ];

        let groups = group_by_learner(&records);
        assert_eq!(groups.len(), 2);

        let mut exams = groups[&1].exam.clone();
        exams.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(exams, vec![80.0, 90.0]);
        assert_eq!(groups[&1].quiz, vec![60.0]);
        assert_eq!(groups[&2].homework, vec![50.0]);
    }

    #[test]
    fn class_groups_keep_classes_apart() {
        let records = vec![
            record(7, 1, vec![entry("exam", 100.0)]),
            record(7, 2, vec![entry("exam", 40.0), entry("quiz", 40.0)]),
        ];

        let groups = group_by_class(&records);
        assert_eq!(groups[&1].exam, vec![100.0]);
        assert!(groups[&1].quiz.is_empty());
        assert_eq!(groups[&2].exam, vec![40.0]);
        assert_eq!(groups[&2].quiz, vec![40.0]);
    }

    #[test]
    fn ungraded_entries_never_reach_a_bucket() {
        let records = vec![record(
            3,
            5,
            vec![entry("participation", 100.0), entry("quiz", 20.0)],
        )];

        let groups = group_by_learner(&records);
        let group = &groups[&3];
        assert_eq!(group.quiz, vec![20.0]);
        assert!(group.exam.is_empty());
        assert!(group.homework.is_empty());
    }

    #[test]
    fn record_with_only_ungraded_entries_still_forms_a_group() {
        let records = vec![record(9, 5, vec![entry("attendance", 1.0)])];
        let groups = group_by_learner(&records);
        assert!(groups[&9].is_empty());
    }
}
