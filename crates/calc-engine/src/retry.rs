//! Geometric-retry expectations over contiguous level ranges.

use crate::{CostResult, EvalError, PriceTable};
use calc_core::{ClusterId, ClusterStage, MaterialBill};
use serde::Serialize;
use tracing::debug;

/// Expected number of independent attempts until the first success.
///
/// Closed-form mean of the geometric distribution, 1/rate. Rates outside
/// (0, 1] are rejected rather than computed through to infinity or NaN.
pub fn expected_attempts(rate: f64) -> Result<f64, EvalError> {
    if !rate.is_finite() || rate <= 0.0 || rate > 1.0 {
        return Err(EvalError::InvalidRate(rate));
    }
    Ok(rate.recip())
}

/// Per-transition detail row.
#[derive(Clone, Debug, Serialize)]
pub struct LevelRow {
    /// Level held before the transition.
    pub from: u8,
    /// Level reached on success.
    pub to: u8,
    /// Configured success rate.
    pub rate: f64,
    /// Expected attempts, 1/rate.
    pub attempts: f64,
    /// Expected valued cost of the transition (zeny plus priced materials).
    pub expected_value: f64,
}

/// Result of evaluating a cluster over a level range.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterReport {
    /// One row per configured transition inside the range.
    pub rows: Vec<LevelRow>,
    /// Expected currency and material quantities summed across the range.
    pub expected: CostResult,
    /// Material quantities for a single success at every transition.
    pub one_time: MaterialBill,
    /// Expected value of the consumed materials alone, at effective prices.
    pub material_value: f64,
}

impl ClusterReport {
    fn empty() -> Self {
        Self {
            rows: vec![],
            expected: CostResult::zero(),
            one_time: MaterialBill::new(),
            material_value: 0.0,
        }
    }
}

/// Evaluate the leveled-retry stage for one cluster over [start, end].
///
/// Transitions are independent events, each conditioned on already holding
/// the previous level, so their expectations simply add. `start >= end`
/// yields a zero report; a level with no configured transition is skipped so
/// the output reflects only levels that exist for the selected cluster.
pub fn evaluate_cluster(
    stage: &ClusterStage,
    cluster_id: &ClusterId,
    start: u8,
    end: u8,
    prices: &PriceTable,
) -> Result<ClusterReport, EvalError> {
    let cluster = stage
        .clusters
        .get(cluster_id)
        .ok_or_else(|| EvalError::UnknownCluster(cluster_id.0.clone()))?;

    let mut report = ClusterReport::empty();
    if start >= end {
        return Ok(report);
    }

    for level in (start + 1)..=end {
        let Some(transition) = cluster.levels.get(&level) else {
            debug!(cluster = %cluster_id.0, level, "no transition configured, skipping");
            continue;
        };
        let attempts = expected_attempts(transition.rate)?;
        let per_attempt = CostResult::from_attempt(transition.zeny, &transition.materials);
        let expected = per_attempt.scaled(attempts);

        report.material_value += prices.bill_value(&transition.materials)? * attempts;
        report.rows.push(LevelRow {
            from: level - 1,
            to: level,
            rate: transition.rate,
            attempts,
            expected_value: prices.value_of(&expected)?,
        });
        for (id, qty) in &transition.materials {
            *report.one_time.entry(id.clone()).or_insert(0) += qty;
        }
        report.expected = report.expected.merge(&expected);
    }
    Ok(report)
}
