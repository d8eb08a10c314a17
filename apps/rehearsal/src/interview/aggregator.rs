//! Score Aggregator: folds per-question evaluations into one weighted report.

use std::collections::HashSet;

use crate::models::{AggregateReport, Category, CategoryAverages, Evaluation};

/// Strengths and improvements kept in the report.
pub const TOP_ENTRY_LIMIT: usize = 5;

pub fn aggregate(evaluations: Vec<Evaluation>) -> AggregateReport {
    let category_scores = CategoryAverages {
        technical: mean_for(&evaluations, Category::Technical).unwrap_or(0.0),
        communication: mean_for(&evaluations, Category::Communication).unwrap_or(0.0),
        problem_solving: mean_for(&evaluations, Category::ProblemSolving).unwrap_or(0.0),
        code_quality: mean_for(&evaluations, Category::CodeQuality),
    };

    let top_strengths = first_unique(
        evaluations.iter().flat_map(|e| e.strengths.iter()),
        TOP_ENTRY_LIMIT,
    );
    let top_improvements = first_unique(
        evaluations.iter().flat_map(|e| e.weaknesses.iter()),
        TOP_ENTRY_LIMIT,
    );

    AggregateReport {
        overall_score: weighted_overall(&category_scores),
        category_scores,
        top_strengths,
        top_improvements,
        per_question: evaluations,
    }
}

/// Fixed-weight sum of the category means, rounded and clamped to 0..=100.
/// An absent `code_quality` contributes zero; the remaining weights are not rescaled.
pub fn weighted_overall(averages: &CategoryAverages) -> u32 {
    let total: f64 = Category::ALL
        .iter()
        .map(|c| c.weight() * averages.get(*c).unwrap_or(0.0))
        .sum();
    total.round().clamp(0.0, 100.0) as u32
}

/// Mean over evaluations that carry `category`; `None` when none do.
fn mean_for(evaluations: &[Evaluation], category: Category) -> Option<f64> {
    let scores: Vec<u32> = evaluations
        .iter()
        .filter_map(|e| e.scores.get(category))
        .collect();
    if scores.is_empty() {
        return None;
    }
    let sum: u32 = scores.iter().sum();
    Some(sum as f64 / scores.len() as f64)
}

/// Deduplicates in first-seen order, keeping at most `limit` entries.
fn first_unique<'a>(entries: impl Iterator<Item = &'a String>, limit: usize) -> Vec<String> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    entries
        .filter(|e| seen.insert(e.as_str()))
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryScores, EvaluationSource};

    fn eval(
        scores: (u32, u32, u32, Option<u32>),
        strengths: &[&str],
        weaknesses: &[&str],
    ) -> Evaluation {
        Evaluation {
            scores: CategoryScores {
                technical: scores.0,
                communication: scores.1,
                problem_solving: scores.2,
                code_quality: scores.3,
            },
            strengths: strengths.iter().map(|s| s.to_string()).collect(),
            weaknesses: weaknesses.iter().map(|s| s.to_string()).collect(),
            narrative_feedback: "ok".to_string(),
            source: EvaluationSource::Model,
        }
    }

    #[test]
    fn test_empty_list_yields_zero_report() {
        let report = aggregate(Vec::new());
        assert_eq!(report.overall_score, 0);
        assert_eq!(report.category_scores.technical, 0.0);
        assert_eq!(report.category_scores.code_quality, None);
        assert!(report.top_strengths.is_empty());
    }

    #[test]
    fn test_weighted_sum_with_code_quality() {
        let report = aggregate(vec![
            eval((80, 70, 60, None), &[], &[]),
            eval((60, 90, 80, Some(60)), &[], &[]),
        ]);
        // code_quality mean covers only the one evaluation that had code.
        assert_eq!(report.category_scores.code_quality, Some(60.0));
        assert_eq!(report.category_scores.technical, 70.0);
        // 0.35*70 + 0.25*80 + 0.25*70 + 0.15*60 = 71
        assert_eq!(report.overall_score, 71);
    }

    #[test]
    fn test_absent_code_quality_is_not_renormalized() {
        let report = aggregate(vec![eval((100, 100, 100, None), &[], &[])]);
        assert_eq!(report.overall_score, 85);
    }

    #[test]
    fn test_top_entries_deduplicated_in_first_seen_order() {
        let report = aggregate(vec![
            eval((50, 50, 50, None), &["a", "b", "a"], &["x", "y"]),
            eval((50, 50, 50, None), &["c", "b", "d", "e", "f", "g"], &["y", "z"]),
        ]);
        assert_eq!(report.top_strengths, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(report.top_improvements, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_per_question_preserved_in_order() {
        let first = eval((10, 20, 30, None), &[], &[]);
        let second = eval((40, 50, 60, Some(70)), &[], &[]);
        let report = aggregate(vec![first.clone(), second.clone()]);
        assert_eq!(report.per_question, vec![first, second]);
    }

    #[test]
    fn test_overall_stays_in_range() {
        let report = aggregate(vec![eval((100, 100, 100, Some(100)), &[], &[])]);
        assert_eq!(report.overall_score, 100);
    }
}
