use serde::{Deserialize, Serialize};

/// Score type as stored. Anything other than the three graded categories is
/// kept as `Other` so it can be read back and then dropped by the grouping
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScoreKind {
    Exam,
    Quiz,
    Homework,
    Other(String),
}

impl ScoreKind {
    pub fn as_str(&self) -> &str {
        match self {
            ScoreKind::Exam => "exam",
            ScoreKind::Quiz => "quiz",
            ScoreKind::Homework => "homework",
            ScoreKind::Other(value) => value,
        }
    }
}

impl From<String> for ScoreKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "exam" => ScoreKind::Exam,
            "quiz" => ScoreKind::Quiz,
            "homework" => ScoreKind::Homework,
            _ => ScoreKind::Other(value),
        }
    }
}

impl From<&str> for ScoreKind {
    fn from(value: &str) -> Self {
        ScoreKind::from(value.to_string())
    }
}

impl From<ScoreKind> for String {
    fn from(kind: ScoreKind) -> Self {
        match kind {
            ScoreKind::Other(value) => value,
            graded => graded.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type")]
    pub kind: ScoreKind,
    pub score: f64,
}

/// One learner's scores for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub learner_id: i64,
    pub class_id: i64,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
}

/// Scores of one grouping key split by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryGroup {
    pub exam: Vec<f64>,
    pub quiz: Vec<f64>,
    pub homework: Vec<f64>,
}

impl CategoryGroup {
    /// Routes an entry into its bucket. Returns false when the entry was
    /// dropped because its type is not graded.
    pub fn push(&mut self, entry: &ScoreEntry) -> bool {
        let bucket = match entry.kind {
            ScoreKind::Exam => &mut self.exam,
            ScoreKind::Quiz => &mut self.quiz,
            ScoreKind::Homework => &mut self.homework,
            ScoreKind::Other(_) => return false,
        };
        bucket.push(entry.score);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.exam.is_empty() && self.quiz.is_empty() && self.homework.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAverage {
    pub class_id: i64,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerAverage {
    pub learner_id: i64,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortReport {
    pub total_learners: usize,
    pub learners_above_percentage: usize,
    pub percentage_above_percentage: f64,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
}

/// Narrows which grade records a source hands back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    pub learner_id: Option<i64>,
    pub class_id: Option<i64>,
}

impl ScopeFilter {
    pub fn learner(learner_id: i64) -> Self {
        Self {
            learner_id: Some(learner_id),
            class_id: None,
        }
    }

    pub fn class(class_id: Option<i64>) -> Self {
        Self {
            learner_id: None,
            class_id,
        }
    }

    pub fn matches(&self, record: &GradeRecord) -> bool {
        self.learner_id.map_or(true, |id| id == record.learner_id)
            && self.class_id.map_or(true, |id| id == record.class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_types_survive_deserialization() {
        let record: GradeRecord = serde_json::from_str(
            r#"{"learner_id": 2, "class_id": 339, "scores": [
                {"type": "exam", "score": 91.5},
                {"type": "participation", "score": 40}
            ]}"#,
        )
        .unwrap();

        assert_eq!(record.scores[0].kind, ScoreKind::Exam);
        assert_eq!(
            record.scores[1].kind,
            ScoreKind::Other("participation".to_string())
        );
    }

    #[test]
    fn push_drops_ungraded_entries() {
        let mut group = CategoryGroup::default();
        assert!(group.push(&ScoreEntry {
            kind: ScoreKind::Quiz,
            score: 70.0
        }));
        assert!(!group.push(&ScoreEntry {
            kind: "participation".into(),
            score: 100.0
        }));
        assert_eq!(group.quiz, vec![70.0]);
        assert!(group.exam.is_empty() && group.homework.is_empty());
    }

    #[test]
    fn scope_filter_matches_both_fields() {
        let record = GradeRecord {
            learner_id: 4,
            class_id: 12,
            scores: Vec::new(),
        };
        assert!(ScopeFilter::default().matches(&record));
        assert!(ScopeFilter::learner(4).matches(&record));
        assert!(!ScopeFilter::class(Some(13)).matches(&record));
    }

    #[test]
    fn cohort_report_uses_camel_case_keys() {
        let report = CohortReport {
            total_learners: 4,
            learners_above_percentage: 1,
            percentage_above_percentage: 25.0,
            threshold: 70.0,
            class_id: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalLearners"], 4);
        assert_eq!(json["learnersAbovePercentage"], 1);
        assert_eq!(json["percentageAbovePercentage"], 25.0);
        assert!(json.get("classId").is_none());
    }
}
