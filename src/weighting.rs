use clap::ValueEnum;

use crate::models::CategoryGroup;

pub const EXAM_WEIGHT: f64 = 0.5;
pub const QUIZ_WEIGHT: f64 = 0.3;
pub const HOMEWORK_WEIGHT: f64 = 0.2;

/// How a category without any scores contributes to the weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingCategoryPolicy {
    /// The category's term is left out of the sum.
    Skip,
    /// Any empty category makes the whole average undefined.
    Propagate,
}

pub const DEFAULT_MISSING_POLICY: MissingCategoryPolicy = MissingCategoryPolicy::Skip;

/// Arithmetic mean, undefined for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Weighted average under the default missing-category policy.
pub fn weighted_average(group: &CategoryGroup) -> Option<f64> {
    weighted_average_with(group, DEFAULT_MISSING_POLICY)
}

/// `mean(exam) * 0.5 + mean(quiz) * 0.3 + mean(homework) * 0.2`.
///
/// Returns `None` when the group holds no graded score at all, whatever the
/// policy. Leaving a term out of the sum is numerically the same as adding 0,
/// so `Skip` only differs from `Propagate` when some but not all categories
/// are empty.
pub fn weighted_average_with(group: &CategoryGroup, policy: MissingCategoryPolicy) -> Option<f64> {
    if group.is_empty() {
        return None;
    }

    let terms = [
        (mean(&group.exam), EXAM_WEIGHT),
        (mean(&group.quiz), QUIZ_WEIGHT),
        (mean(&group.homework), HOMEWORK_WEIGHT),
    ];

    let mut avg = 0.0;
    for (mean, weight) in terms {
        match (mean, policy) {
            (Some(mean), _) => avg += mean * weight,
            (None, MissingCategoryPolicy::Skip) => {}
            (None, MissingCategoryPolicy::Propagate) => return None,
        }
    }
    Some(avg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(exam: &[f64], quiz: &[f64], homework: &[f64]) -> CategoryGroup {
        CategoryGroup {
            exam: exam.to_vec(),
            quiz: quiz.to_vec(),
            homework: homework.to_vec(),
        }
    }

    #[test]
    fn weights_sum_to_one() {
        assert!((EXAM_WEIGHT + QUIZ_WEIGHT + HOMEWORK_WEIGHT - 1.0).abs() < 1e-12);
    }

    #[test]
    fn default_policy_skips_missing_categories() {
        assert_eq!(DEFAULT_MISSING_POLICY, MissingCategoryPolicy::Skip);
    }

    #[test]
    fn complete_categories() {
        let avg = weighted_average(&group(&[80.0, 90.0], &[70.0], &[100.0])).unwrap();
        assert!((avg - 83.5).abs() < 1e-9);
    }

    #[test]
    fn missing_homework_is_skipped_not_zeroed() {
        let avg = weighted_average(&group(&[100.0], &[100.0], &[])).unwrap();
        assert!((avg - 80.0).abs() < 1e-9);
    }

    #[test]
    fn propagate_policy_needs_every_category() {
        let g = group(&[100.0], &[], &[50.0]);
        let skip = weighted_average_with(&g, MissingCategoryPolicy::Skip).unwrap();
        assert!((skip - 60.0).abs() < 1e-9);
        assert_eq!(weighted_average_with(&g, MissingCategoryPolicy::Propagate), None);

        let full = group(&[100.0], &[50.0], &[50.0]);
        let avg = weighted_average_with(&full, MissingCategoryPolicy::Propagate).unwrap();
        assert!((avg - 75.0).abs() < 1e-9);
    }

    #[test]
    fn single_category_counts_at_its_weight() {
        let avg = weighted_average(&group(&[], &[], &[50.0])).unwrap();
        assert!((avg - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_group_is_undefined() {
        assert_eq!(weighted_average(&CategoryGroup::default()), None);
        assert_eq!(
            weighted_average_with(&CategoryGroup::default(), MissingCategoryPolicy::Propagate),
            None
        );
    }

    #[test]
    fn order_does_not_matter() {
        let a = weighted_average(&group(&[60.0, 75.0, 90.0], &[10.0, 20.0], &[])).unwrap();
        let b = weighted_average(&group(&[90.0, 60.0, 75.0], &[20.0, 10.0], &[])).unwrap();
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }
}
