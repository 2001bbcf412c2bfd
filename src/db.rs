use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};

use crate::error::SourceError;
use crate::models::{GradeRecord, ScopeFilter, ScoreEntry, ScoreKind};
use crate::source::ScoreSource;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Grade records backed by the `cohort_grades` schema.
#[derive(Debug, Clone)]
pub struct PgScoreSource {
    pool: PgPool,
}

impl PgScoreSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One joined grade/score row. Score columns are empty for a grade record
/// without any scores.
#[derive(Debug, Clone, PartialEq)]
struct ScoreRow {
    grade_id: i64,
    learner_id: i64,
    class_id: i64,
    score_type: Option<String>,
    score: Option<f64>,
}

/// Rebuilds grade records from rows ordered by grade id and score position.
fn fold_rows(rows: Vec<ScoreRow>) -> Vec<GradeRecord> {
    let mut records: Vec<GradeRecord> = Vec::new();
    let mut current: Option<i64> = None;

    for row in rows {
        if current != Some(row.grade_id) {
            current = Some(row.grade_id);
            records.push(GradeRecord {
                learner_id: row.learner_id,
                class_id: row.class_id,
                scores: Vec::new(),
            });
        }

        if let (Some(score_type), Some(score), Some(record)) =
            (row.score_type, row.score, records.last_mut())
        {
            record.scores.push(ScoreEntry {
                kind: ScoreKind::from(score_type),
                score,
            });
        }
    }

    records
}

#[async_trait]
impl ScoreSource for PgScoreSource {
    async fn fetch_all(&self, scope: ScopeFilter) -> Result<Vec<GradeRecord>, SourceError> {
        let mut query = String::from(
            "SELECT g.id AS grade_id, g.learner_id, g.class_id, s.score_type, s.score \
             FROM cohort_grades.grades g \
             LEFT JOIN cohort_grades.scores s ON s.grade_id = g.id \
             WHERE TRUE",
        );

        let mut binds = Vec::new();
        if let Some(learner_id) = scope.learner_id {
            binds.push(learner_id);
            query.push_str(&format!(" AND g.learner_id = ${}", binds.len()));
        }
        if let Some(class_id) = scope.class_id {
            binds.push(class_id);
            query.push_str(&format!(" AND g.class_id = ${}", binds.len()));
        }
        query.push_str(" ORDER BY g.id, s.position");

        let mut rows = sqlx::query(&query);
        for value in binds {
            rows = rows.bind(value);
        }

        let rows = rows.fetch_all(&self.pool).await?;
        let mut score_rows = Vec::with_capacity(rows.len());
        for row in rows {
            score_rows.push(ScoreRow {
                grade_id: row.try_get("grade_id")?,
                learner_id: row.try_get("learner_id")?,
                class_id: row.try_get("class_id")?,
                score_type: row.try_get("score_type")?,
                score: row.try_get("score")?,
            });
        }

        let records = fold_rows(score_rows);
        debug!(?scope, records = records.len(), "fetched grade records");
        Ok(records)
    }

    async fn distinct_learner_ids(
        &self,
        class_id: Option<i64>,
    ) -> Result<BTreeSet<i64>, SourceError> {
        let rows = match class_id {
            Some(class_id) => {
                sqlx::query(
                    "SELECT DISTINCT learner_id FROM cohort_grades.grades WHERE class_id = $1",
                )
                .bind(class_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT DISTINCT learner_id FROM cohort_grades.grades")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut learners = BTreeSet::new();
        for row in rows {
            learners.insert(row.try_get::<i64, _>("learner_id")?);
        }
        Ok(learners)
    }
}

async fn upsert_grade(
    tx: &mut Transaction<'_, Postgres>,
    learner_id: i64,
    class_id: i64,
) -> anyhow::Result<i64> {
    let grade_id: i64 = sqlx::query(
        r#"
        INSERT INTO cohort_grades.grades (learner_id, class_id)
        VALUES ($1, $2)
        ON CONFLICT (learner_id, class_id) DO UPDATE
        SET learner_id = EXCLUDED.learner_id
        RETURNING id
        "#,
    )
    .bind(learner_id)
    .bind(class_id)
    .fetch_one(&mut **tx)
    .await?
    .get("id");

    Ok(grade_id)
}

/// Appends a score after the last one already stored for the grade record.
async fn append_score(
    tx: &mut Transaction<'_, Postgres>,
    grade_id: i64,
    kind: &ScoreKind,
    score: f64,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cohort_grades.scores (grade_id, position, score_type, score)
        SELECT $1, COALESCE(MAX(position) + 1, 0), $2, $3
        FROM cohort_grades.scores
        WHERE grade_id = $1
        "#,
    )
    .bind(grade_id)
    .bind(kind.as_str())
    .bind(score)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn seed_records() -> Vec<GradeRecord> {
    let entry = |kind: &str, score: f64| ScoreEntry {
        kind: ScoreKind::from(kind),
        score,
    };

    vec![
        GradeRecord {
            learner_id: 1,
            class_id: 339,
            scores: vec![
                entry("exam", 78.4),
                entry("quiz", 82.0),
                entry("homework", 91.5),
                entry("homework", 64.0),
            ],
        },
        GradeRecord {
            learner_id: 1,
            class_id: 117,
            scores: vec![entry("exam", 92.0), entry("quiz", 88.5)],
        },
        GradeRecord {
            learner_id: 2,
            class_id: 339,
            scores: vec![
                entry("exam", 55.0),
                entry("quiz", 61.0),
                entry("homework", 72.0),
                entry("participation", 100.0),
            ],
        },
        GradeRecord {
            learner_id: 3,
            class_id: 117,
            scores: vec![entry("exam", 69.5), entry("quiz", 74.0), entry("homework", 70.0)],
        },
    ]
}

/// Replaces the scores of a handful of sample grade records. Safe to run
/// repeatedly.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    for record in seed_records() {
        let grade_id = upsert_grade(&mut tx, record.learner_id, record.class_id).await?;
        sqlx::query("DELETE FROM cohort_grades.scores WHERE grade_id = $1")
            .bind(grade_id)
            .execute(&mut *tx)
            .await?;

        for entry in &record.scores {
            append_score(&mut tx, grade_id, &entry.kind, entry.score).await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Deserialize, PartialEq)]
struct CsvRow {
    learner_id: i64,
    class_id: i64,
    #[serde(rename = "type")]
    kind: ScoreKind,
    score: f64,
}

fn read_csv_rows<R: Read>(reader: R) -> anyhow::Result<Vec<CsvRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        rows.push(result.with_context(|| format!("invalid CSV row {}", index + 1))?);
    }
    Ok(rows)
}

/// Appends every CSV score to its learner/class record. Returns the number of
/// scores inserted.
pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = read_csv_rows(file)?;

    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for row in rows {
        let grade_id = upsert_grade(&mut tx, row.learner_id, row.class_id).await?;
        append_score(&mut tx, grade_id, &row.kind, row.score).await?;
        inserted += 1;
    }

    tx.commit().await?;
    info!(inserted, path = %csv_path.display(), "imported scores");
    Ok(inserted)
}
