//! Cascading dependent-stage expectations.
//!
//! Slots are attempted in chronological order and share one paid reset: a
//! failed pull on a later slot costs the reset and destroys the results of
//! every earlier slot, so each earlier slot's full expected bundle is
//! re-incurred on every failure of the later slot.

use crate::{expected_attempts, CostResult, EvalError};
use calc_core::{ChainedStage, EnchantId, SlotGoal};
use serde::Serialize;
use tracing::debug;

/// Expected outcome for one chained slot.
#[derive(Clone, Debug, Serialize)]
pub struct SlotOutcome {
    /// Slot number.
    pub slot: u8,
    /// Selected target.
    pub target: EnchantId,
    /// Selected level.
    pub level: u8,
    /// Configured success rate.
    pub rate: f64,
    /// Expected attempts, 1/rate.
    pub attempts: f64,
    /// Expected cost of completing this slot, resets and redo of earlier
    /// slots included.
    pub expected: CostResult,
}

/// Result of evaluating the chained-enchant stage.
#[derive(Clone, Debug, Serialize)]
pub struct ChainReport {
    /// Per-slot outcomes in chronological attempt order.
    pub slots: Vec<SlotOutcome>,
    /// Grand total across all selected slots.
    pub expected: CostResult,
}

/// Evaluate the chained-enchant stage for the goal's slot selections.
///
/// For slot i with success rate p, the per-attempt cost is the pull bundle
/// plus, with probability 1 - p, the reset bundle and the expected bundles
/// of every earlier completed slot. Dividing that per-attempt cost by p is
/// the geometric-expectation scaling; because the conditional failure cost
/// is folded in before the division, resets are charged only on failed
/// attempts, never after the final success. Expectation is linear, so the
/// recursion is applied componentwise to currency and every material.
///
/// A slot with no goal selection is left out of the plan. A selection whose
/// target/level has no configured rate is an error, never treated as p = 1
/// or p = 0.
pub fn evaluate_chain(stage: &ChainedStage, goals: &[SlotGoal]) -> Result<ChainReport, EvalError> {
    for goal in goals {
        if !stage.slots.iter().any(|s| s.slot == goal.slot) {
            return Err(EvalError::UnknownSlot(goal.slot));
        }
    }

    let reset = CostResult::from_attempt(stage.reset_zeny, &stage.reset_materials);
    let mut completed = CostResult::zero();
    let mut outcomes = Vec::new();

    for slot in &stage.slots {
        let Some(goal) = goals.iter().find(|g| g.slot == slot.slot) else {
            continue;
        };
        let option =
            slot.options
                .get(&goal.target)
                .ok_or_else(|| EvalError::UnknownTarget {
                    slot: slot.slot,
                    target: goal.target.0.clone(),
                })?;
        let rate =
            option
                .rates
                .get(&goal.level)
                .copied()
                .ok_or_else(|| EvalError::MissingRate {
                    target: goal.target.0.clone(),
                    level: goal.level,
                })?;
        let attempts = expected_attempts(rate)?;

        let pull = CostResult::from_attempt(slot.pull_zeny, &slot.pull_materials);
        let failure = reset.merge(&completed);
        let per_attempt = pull.merge(&failure.scaled(1.0 - rate));
        let expected = per_attempt.scaled(attempts);
        debug!(slot = slot.slot, rate, attempts, "evaluated chained slot");

        completed = completed.merge(&expected);
        outcomes.push(SlotOutcome {
            slot: slot.slot,
            target: goal.target.clone(),
            level: goal.level,
            rate,
            attempts,
            expected,
        });
    }

    Ok(ChainReport {
        slots: outcomes,
        expected: completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_core::{ChainedSlot, EnchantOption, MaterialBill, MaterialId};
    use proptest::prelude::*;

    fn mid(id: &str) -> MaterialId {
        MaterialId(id.to_string())
    }

    fn slot(number: u8, pull_zeny: u64, pull_materials: MaterialBill, rate: f64) -> ChainedSlot {
        ChainedSlot {
            slot: number,
            pull_zeny,
            pull_materials,
            options: [(
                EnchantId("fatal".into()),
                EnchantOption {
                    name: "Fatal".into(),
                    rates: [(1, rate)].into_iter().collect(),
                },
            )]
            .into_iter()
            .collect(),
        }
    }

    fn goal(number: u8) -> SlotGoal {
        SlotGoal {
            slot: number,
            target: EnchantId("fatal".into()),
            level: 1,
        }
    }

    fn two_slot_stage(p4: f64, p3: f64, reset_zeny: u64) -> ChainedStage {
        ChainedStage {
            slots: vec![
                slot(4, 100_000, MaterialBill::new(), p4),
                slot(3, 100_000, MaterialBill::new(), p3),
            ],
            reset_zeny,
            reset_materials: MaterialBill::new(),
        }
    }

    #[test]
    fn reference_scenario_totals() {
        let stage = two_slot_stage(0.5, 0.5, 50_000);
        let report = evaluate_chain(&stage, &[goal(4), goal(3)]).unwrap();
        // slot4: (100000 + 0.5 * 50000) / 0.5 = 250000
        // slot3: (100000 + 0.5 * (50000 + 250000)) / 0.5 = 500000
        assert!((report.slots[0].expected.zeny() - 250_000.0).abs() < 1e-6);
        assert!((report.slots[1].expected.zeny() - 500_000.0).abs() < 1e-6);
        assert!((report.expected.zeny() - 750_000.0).abs() < 1e-6);
    }

    #[test]
    fn certain_success_costs_exactly_the_pulls() {
        let stage = two_slot_stage(1.0, 1.0, 50_000);
        let report = evaluate_chain(&stage, &[goal(4), goal(3)]).unwrap();
        assert_eq!(report.slots[0].expected.zeny(), 100_000.0);
        assert_eq!(report.slots[1].expected.zeny(), 100_000.0);
        assert_eq!(report.expected.zeny(), 200_000.0);
    }

    #[test]
    fn certain_success_consumes_no_reset_materials() {
        let mut stage = two_slot_stage(1.0, 1.0, 0);
        stage.reset_materials = [(mid("catalyst"), 7)].into_iter().collect();
        stage.slots[0].pull_materials = [(mid("orb"), 1)].into_iter().collect();
        let report = evaluate_chain(&stage, &[goal(4), goal(3)]).unwrap();
        assert_eq!(report.expected.material(&mid("catalyst")), 0.0);
        assert_eq!(report.expected.material(&mid("orb")), 1.0);
    }

    #[test]
    fn later_failures_redo_the_whole_earlier_bundle() {
        let mut stage = two_slot_stage(0.5, 0.5, 50_000);
        stage.slots[0].pull_materials = [(mid("orb"), 2)].into_iter().collect();
        stage.reset_materials = [(mid("catalyst"), 1)].into_iter().collect();
        let report = evaluate_chain(&stage, &[goal(4), goal(3)]).unwrap();

        // slot4: own orbs 2 * (1/0.5) = 4; catalysts 1 * failed attempts (1).
        let slot4 = &report.slots[0].expected;
        assert!((slot4.material(&mid("orb")) - 4.0).abs() < 1e-12);
        assert!((slot4.material(&mid("catalyst")) - 1.0).abs() < 1e-12);

        // slot3 fails once in expectation; each failure costs one catalyst
        // plus slot4's entire bundle (4 orbs, 1 catalyst), all scaled by
        // 1/p3 * (1 - p3) = 1.
        let slot3 = &report.slots[1].expected;
        assert!((slot3.material(&mid("orb")) - 4.0).abs() < 1e-12);
        assert!((slot3.material(&mid("catalyst")) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn missing_rate_is_reported_not_guessed() {
        let stage = two_slot_stage(0.5, 0.5, 50_000);
        let bad = SlotGoal {
            slot: 4,
            target: EnchantId("fatal".into()),
            level: 3,
        };
        assert_eq!(
            evaluate_chain(&stage, &[bad]).unwrap_err(),
            EvalError::MissingRate {
                target: "fatal".into(),
                level: 3
            }
        );

        let bad = SlotGoal {
            slot: 4,
            target: EnchantId("lucky".into()),
            level: 1,
        };
        assert_eq!(
            evaluate_chain(&stage, &[bad]).unwrap_err(),
            EvalError::UnknownTarget {
                slot: 4,
                target: "lucky".into()
            }
        );

        assert_eq!(
            evaluate_chain(&stage, &[goal(2)]).unwrap_err(),
            EvalError::UnknownSlot(2)
        );
    }

    #[test]
    fn unselected_slots_contribute_nothing() {
        let stage = two_slot_stage(0.5, 0.5, 50_000);
        let report = evaluate_chain(&stage, &[goal(4)]).unwrap();
        assert_eq!(report.slots.len(), 1);
        assert!((report.expected.zeny() - 250_000.0).abs() < 1e-6);
    }

    /// Truncated probability-tree enumeration of a geometric stage whose
    /// failed attempts each cost `failure` on top of the pull:
    /// sum over k of p(1-p)^(k-1) * (k * pull + (k-1) * failure).
    fn truncated_expectation(
        pull: &CostResult,
        failure: &CostResult,
        rate: f64,
        terms: u32,
    ) -> CostResult {
        let mut total = CostResult::zero();
        for k in 1..=terms {
            let weight = rate * (1.0 - rate).powi(k as i32 - 1);
            let outcome = pull
                .scaled(k as f64)
                .merge(&failure.scaled((k - 1) as f64));
            total = total.merge(&outcome.scaled(weight));
        }
        total
    }

    #[test]
    fn closed_form_matches_truncated_series() {
        for (p4, p3, pull_zeny, reset_zeny) in [
            (0.5, 0.5, 100_000u64, 50_000u64),
            (0.8, 0.25, 500_000, 120_000),
            (0.45, 0.65, 2_000_000, 1_000_000),
        ] {
            let mut stage = two_slot_stage(p4, p3, reset_zeny);
            stage.slots[0].pull_zeny = pull_zeny;
            stage.slots[1].pull_zeny = pull_zeny;
            stage.slots[0].pull_materials = [(mid("orb"), 3)].into_iter().collect();
            stage.reset_materials = [(mid("catalyst"), 2)].into_iter().collect();

            let report = evaluate_chain(&stage, &[goal(4), goal(3)]).unwrap();

            let reset = CostResult::from_attempt(stage.reset_zeny, &stage.reset_materials);
            let pull4 =
                CostResult::from_attempt(stage.slots[0].pull_zeny, &stage.slots[0].pull_materials);
            let series4 = truncated_expectation(&pull4, &reset, p4, 400);
            let pull3 =
                CostResult::from_attempt(stage.slots[1].pull_zeny, &stage.slots[1].pull_materials);
            let series3 = truncated_expectation(&pull3, &reset.merge(&series4), p3, 400);
            let series_total = series4.merge(&series3);

            let rel = (report.expected.zeny() - series_total.zeny()).abs()
                / series_total.zeny().max(1.0);
            assert!(rel < 1e-6, "relative error {rel} for p4={p4} p3={p3}");
            for (id, qty) in series_total.materials() {
                let got = report.expected.material(id);
                assert!((got - qty).abs() < 1e-6 * qty.max(1.0));
            }
        }
    }

    proptest! {
        #[test]
        fn total_increases_with_reset_cost(p4 in 0.05f64..1.0, p3 in 0.05f64..1.0, reset in 0u64..1_000_000) {
            let cheap = evaluate_chain(&two_slot_stage(p4, p3, reset), &[goal(4), goal(3)]).unwrap();
            let dear = evaluate_chain(&two_slot_stage(p4, p3, reset + 10_000), &[goal(4), goal(3)]).unwrap();
            prop_assert!(dear.expected.zeny() >= cheap.expected.zeny());
        }

        #[test]
        fn total_never_decreases_with_worse_odds(p4 in 0.05f64..0.95, p3 in 0.05f64..0.95) {
            let base = evaluate_chain(&two_slot_stage(p4, p3, 50_000), &[goal(4), goal(3)]).unwrap();
            let worse4 = evaluate_chain(&two_slot_stage(p4 - 0.04, p3, 50_000), &[goal(4), goal(3)]).unwrap();
            let worse3 = evaluate_chain(&two_slot_stage(p4, p3 - 0.04, 50_000), &[goal(4), goal(3)]).unwrap();
            prop_assert!(worse4.expected.zeny() >= base.expected.zeny());
            prop_assert!(worse3.expected.zeny() >= base.expected.zeny());
        }
    }
}
