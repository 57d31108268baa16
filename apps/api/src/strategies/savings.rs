//! Savings aggregation over the current strategy selection.

use crate::strategies::OptimizationStrategy;

/// Sum of `estimated_savings` across selected strategies.
///
/// This is additive over strategy-level self-reported estimates and is NOT
/// reconciled against the recomputed `totalLanded` delta: two selected
/// strategies targeting the same product field both contribute their full
/// estimate even though last-write-wins means only one change lands. The
/// figure is an informational estimate, not a guaranteed result.
pub fn total_selected_savings(
    strategies: &[OptimizationStrategy],
    selected_ids: &[String],
) -> f64 {
    selected_ids
        .iter()
        .filter_map(|id| strategies.iter().find(|s| &s.id == id))
        .map(|s| s.estimated_savings)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy(id: &str, estimated_savings: f64) -> OptimizationStrategy {
        OptimizationStrategy {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            estimated_savings,
            impact: Default::default(),
            detailed_changes: Vec::new(),
            web_findings: None,
        }
    }

    #[test]
    fn test_sum_over_selection() {
        let strategies = vec![strategy("a", 8500.0), strategy("b", 12300.0)];
        let selected = vec!["a".to_string(), "b".to_string()];
        assert!((total_selected_savings(&strategies, &selected) - 20800.0).abs() < 1e-9);
    }

    #[test]
    fn test_unselected_strategies_excluded() {
        let strategies = vec![strategy("a", 8500.0), strategy("b", 12300.0)];
        let selected = vec!["b".to_string()];
        assert!((total_selected_savings(&strategies, &selected) - 12300.0).abs() < 1e-9);
    }

    #[test]
    fn test_stale_selected_id_contributes_nothing() {
        let strategies = vec![strategy("a", 100.0)];
        let selected = vec!["gone".to_string(), "a".to_string()];
        assert!((total_selected_savings(&strategies, &selected) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_strategies_both_counted() {
        // Deliberate: estimates are summed independently even when the
        // engine's last-write-wins rule collapses their changes.
        let strategies = vec![strategy("x", 500.0), strategy("y", 700.0)];
        let selected = vec!["x".to_string(), "y".to_string()];
        assert!((total_selected_savings(&strategies, &selected) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_selection_is_zero() {
        let strategies = vec![strategy("a", 100.0)];
        assert_eq!(total_selected_savings(&strategies, &[]), 0.0);
    }
}
