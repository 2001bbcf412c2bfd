use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SourceError;
use crate::models::{GradeRecord, ScopeFilter};

/// Where grade records come from. Implementations only fetch; all
/// aggregation happens in process.
#[async_trait]
pub trait ScoreSource: Send + Sync {
    async fn fetch_all(&self, scope: ScopeFilter) -> Result<Vec<GradeRecord>, SourceError>;

    /// Learners with at least one record, optionally limited to one class.
    async fn distinct_learner_ids(
        &self,
        class_id: Option<i64>,
    ) -> Result<BTreeSet<i64>, SourceError>;
}

/// Grade records held in memory, typically loaded from a JSON export of the
/// grades collection.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<GradeRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<GradeRecord>) -> Self {
        Self { records }
    }

    pub fn from_json_path(path: &Path) -> Result<Self, SourceError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<GradeRecord> =
            serde_json::from_str(&raw).map_err(|source| SourceError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), records = records.len(), "loaded grade records");
        Ok(Self::new(records))
    }
}

#[async_trait]
impl ScoreSource for MemorySource {
    async fn fetch_all(&self, scope: ScopeFilter) -> Result<Vec<GradeRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|record| scope.matches(record))
            .cloned()
            .collect())
    }

    async fn distinct_learner_ids(
        &self,
        class_id: Option<i64>,
    ) -> Result<BTreeSet<i64>, SourceError> {
        let scope = ScopeFilter::class(class_id);
        Ok(self
            .records
            .iter()
            .filter(|record| scope.matches(record))
            .map(|record| record.learner_id)
            .collect())
    }
}
