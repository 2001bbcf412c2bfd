use std::collections::BTreeSet;

use tracing::info;

use crate::cohort::{self, CohortOptions};
use crate::error::SourceError;
use crate::grouping;
use crate::models::{ClassAverage, CohortReport, LearnerAverage, ScopeFilter};
use crate::source::ScoreSource;
use crate::weighting::{self, MissingCategoryPolicy};

/// Weighted average of one learner's grades, one entry per class. Empty when
/// the learner has no records.
pub async fn weighted_average_per_class(
    source: &dyn ScoreSource,
    learner_id: i64,
    policy: MissingCategoryPolicy,
) -> Result<Vec<ClassAverage>, SourceError> {
    let records = source.fetch_all(ScopeFilter::learner(learner_id)).await?;

    let averages: Vec<ClassAverage> = grouping::group_by_class(&records)
        .into_iter()
        .map(|(class_id, group)| ClassAverage {
            class_id,
            avg: weighting::weighted_average_with(&group, policy),
        })
        .collect();

    info!(learner_id, classes = averages.len(), "computed class averages");
    Ok(averages)
}

async fn scoped_averages(
    source: &dyn ScoreSource,
    options: &CohortOptions,
) -> Result<(BTreeSet<i64>, Vec<LearnerAverage>), SourceError> {
    let candidates = source.distinct_learner_ids(options.class_id).await?;
    let records = source.fetch_all(options.contribution_filter()).await?;
    let averages = cohort::learner_averages(
        cohort::contributing_records(&records, &candidates, options),
        options.missing_policy,
    );
    Ok((candidates, averages))
}

/// Per-learner averages of the cohort described by `options`.
pub async fn cohort_averages(
    source: &dyn ScoreSource,
    options: &CohortOptions,
) -> Result<Vec<LearnerAverage>, SourceError> {
    let (_, averages) = scoped_averages(source, options).await?;
    Ok(averages)
}

/// Pass-rate statistics of the cohort described by `options`.
pub async fn cohort_report(
    source: &dyn ScoreSource,
    options: &CohortOptions,
) -> Result<CohortReport, SourceError> {
    let (candidates, averages) = scoped_averages(source, options).await?;
    let report = cohort::tally(&candidates, &averages, options);
    info!(
        class_id = ?options.class_id,
        total_learners = report.total_learners,
        learners_above = report.learners_above_percentage,
        "computed cohort report"
    );
    Ok(report)
}
