use std::collections::BTreeSet;

use clap::ValueEnum;
use tracing::debug;

use crate::grouping;
use crate::models::{CohortReport, GradeRecord, LearnerAverage, ScopeFilter};
use crate::weighting::{self, MissingCategoryPolicy, DEFAULT_MISSING_POLICY};

pub const DEFAULT_THRESHOLD: f64 = 70.0;

/// What a class filter narrows down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ClassScope {
    /// Only learners enrolled in the class are counted, but each average is
    /// taken over all of that learner's classes.
    #[default]
    CandidatePool,
    /// Only the class's own scores feed the averages.
    ScoreContributions,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortOptions {
    pub threshold: f64,
    pub class_id: Option<i64>,
    pub class_scope: ClassScope,
    pub missing_policy: MissingCategoryPolicy,
}

impl Default for CohortOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            class_id: None,
            class_scope: ClassScope::default(),
            missing_policy: DEFAULT_MISSING_POLICY,
        }
    }
}

impl CohortOptions {
    pub fn scope_filter(&self) -> ScopeFilter {
        ScopeFilter::class(self.class_id)
    }

    /// Filter for the records whose scores feed the averages.
    pub fn contribution_filter(&self) -> ScopeFilter {
        match self.class_scope {
            ClassScope::CandidatePool => ScopeFilter::default(),
            ClassScope::ScoreContributions => self.scope_filter(),
        }
    }
}

pub fn learner_averages<'a, I>(records: I, policy: MissingCategoryPolicy) -> Vec<LearnerAverage>
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    grouping::group_by_learner(records)
        .into_iter()
        .map(|(learner_id, group)| LearnerAverage {
            learner_id,
            avg: weighting::weighted_average_with(&group, policy),
        })
        .collect()
}

/// Learners that make up the cohort: everyone with a record in scope.
pub fn candidates(records: &[GradeRecord], options: &CohortOptions) -> BTreeSet<i64> {
    let filter = options.scope_filter();
    records
        .iter()
        .filter(|record| filter.matches(record))
        .map(|record| record.learner_id)
        .collect()
}

/// Records whose scores count toward the averages of `candidates`.
pub fn contributing_records<'a>(
    records: &'a [GradeRecord],
    candidates: &'a BTreeSet<i64>,
    options: &CohortOptions,
) -> impl Iterator<Item = &'a GradeRecord> + 'a {
    let filter = options.contribution_filter();
    records
        .iter()
        .filter(move |record| filter.matches(record) && candidates.contains(&record.learner_id))
}

/// Counts the candidates whose average reaches the threshold. Averages of
/// learners outside `candidates` are ignored so that the numerator never
/// covers more learners than the denominator.
pub fn tally(
    candidates: &BTreeSet<i64>,
    averages: &[LearnerAverage],
    options: &CohortOptions,
) -> CohortReport {
    let total_learners = candidates.len();
    if total_learners == 0 {
        return CohortReport {
            total_learners: 0,
            learners_above_percentage: 0,
            percentage_above_percentage: 0.0,
            threshold: options.threshold,
            class_id: options.class_id,
        };
    }

    let learners_above_percentage = averages
        .iter()
        .filter(|average| candidates.contains(&average.learner_id))
        .filter(|average| average.avg.is_some_and(|avg| avg >= options.threshold))
        .count();

    debug!(
        total_learners,
        learners_above_percentage,
        threshold = options.threshold,
        "tallied cohort"
    );

    CohortReport {
        total_learners,
        learners_above_percentage,
        percentage_above_percentage: learners_above_percentage as f64 / total_learners as f64
            * 100.0,
        threshold: options.threshold,
        class_id: options.class_id,
    }
}

/// Full in-process cohort report over an already fetched record set.
pub fn cohort_report(records: &[GradeRecord], options: &CohortOptions) -> CohortReport {
    let candidates = candidates(records, options);
    let averages = learner_averages(
        contributing_records(records, &candidates, options),
        options.missing_policy,
    );
    tally(&candidates, &averages, options)
}
