use std::fmt::Write;

use crate::models::{CohortReport, LearnerAverage};

/// Two-decimal rendering; averages are only rounded here.
pub fn format_average(avg: Option<f64>) -> String {
    match avg {
        Some(value) => format!("{value:.2}"),
        None => "n/a".to_string(),
    }
}

/// Highest average first, undefined averages last.
pub fn rank_learners(averages: &[LearnerAverage]) -> Vec<LearnerAverage> {
    let mut ranked = averages.to_vec();
    ranked.sort_by(|a, b| match (a.avg, b.avg) {
        (Some(x), Some(y)) => y.total_cmp(&x).then(a.learner_id.cmp(&b.learner_id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.learner_id.cmp(&b.learner_id),
    });
    ranked
}

pub fn build_report(report: &CohortReport, averages: &[LearnerAverage]) -> String {
    let mut output = String::new();
    let scope_label = match report.class_id {
        Some(class_id) => format!("class {class_id}"),
        None => "all classes".to_string(),
    };

    let _ = writeln!(output, "# Cohort Grades Report");
    let _ = writeln!(
        output,
        "Generated for {} (pass threshold {:.0})",
        scope_label, report.threshold
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Pass Rate");

    if report.total_learners == 0 {
        let _ = writeln!(output, "No learners recorded for this scope.");
    } else {
        let _ = writeln!(output, "- Learners: {}", report.total_learners);
        let _ = writeln!(
            output,
            "- At or above threshold: {}",
            report.learners_above_percentage
        );
        let _ = writeln!(
            output,
            "- Pass rate: {:.1}%",
            report.percentage_above_percentage
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Learner Averages");

    if averages.is_empty() {
        let _ = writeln!(output, "No graded scores for this scope.");
    } else {
        for average in rank_learners(averages) {
            let marker = match average.avg {
                Some(avg) if avg >= report.threshold => "pass",
                Some(_) => "below",
                None => "ungraded",
            };
            let _ = writeln!(
                output,
                "- learner {}: {} ({})",
                average.learner_id,
                format_average(average.avg),
                marker
            );
        }
    }

    output
}
