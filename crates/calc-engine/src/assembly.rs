//! Deterministic bill-of-materials assembly folding.

use crate::{CostResult, EvalError, PriceTable};
use calc_core::{AssemblyStage, AssemblyStep, AssemblyVariant, Goal};
use serde::Serialize;

/// One evaluated assembly step.
#[derive(Clone, Debug, Serialize)]
pub struct StepCost {
    /// Step name from the configuration.
    pub name: String,
    /// This step's computed total: zeny, priced materials and any copies
    /// line item.
    pub value: f64,
    /// Running total up to and including this step.
    pub running_total: f64,
}

/// Result of evaluating the assembly stage.
#[derive(Clone, Debug, Serialize)]
pub struct AssemblyReport {
    /// Per-step detail in declared order.
    pub steps: Vec<StepCost>,
    /// Currency and material totals across all steps. Currency includes
    /// copies line items; the material map never does.
    pub expected: CostResult,
    /// Total valued cost, equal to the last running total.
    pub total_value: f64,
}

fn active_variant<'a>(
    step: &'a AssemblyStep,
    goal: &Goal,
) -> Result<Option<&'a AssemblyVariant>, EvalError> {
    if step.variants.is_empty() {
        return Ok(None);
    }
    let choice = goal
        .variant_choices
        .get(&step.name)
        .ok_or_else(|| EvalError::MissingVariantChoice {
            step: step.name.clone(),
        })?;
    step.variants
        .iter()
        .find(|v| &v.name == choice)
        .map(Some)
        .ok_or_else(|| EvalError::UnknownVariant {
            step: step.name.clone(),
            variant: choice.clone(),
        })
}

/// Evaluate the assembly stage against the goal's variant choices.
///
/// Steps are folded in declared order because a later step may reference an
/// earlier step's already-computed total (not its raw material cost) as an
/// "N copies of" line item. Such a line contributes to currency only.
pub fn evaluate_assembly(
    stage: &AssemblyStage,
    goal: &Goal,
    prices: &PriceTable,
) -> Result<AssemblyReport, EvalError> {
    let mut steps = Vec::with_capacity(stage.steps.len());
    let mut totals: Vec<f64> = Vec::with_capacity(stage.steps.len());
    let mut expected = CostResult::zero();
    let mut running = 0.0;

    for (idx, step) in stage.steps.iter().enumerate() {
        let mut step_result = CostResult::from_attempt(step.zeny, &step.materials);
        let mut value = step.zeny as f64 + prices.bill_value(&step.materials)?;

        if let Some(variant) = active_variant(step, goal)? {
            value += prices.bill_value(&variant.materials)?;
            step_result = step_result.merge(&CostResult::from_attempt(0, &variant.materials));
        }

        if let Some(copies) = &step.copies_of {
            let prior = totals
                .get(copies.step)
                .copied()
                .ok_or(EvalError::BadStepReference {
                    step: idx,
                    referenced: copies.step,
                })?;
            let line = prior * copies.copies as f64;
            value += line;
            step_result = step_result.with_zeny(line);
        }

        running += value;
        totals.push(value);
        steps.push(StepCost {
            name: step.name.clone(),
            value,
            running_total: running,
        });
        expected = expected.merge(&step_result);
    }

    Ok(AssemblyReport {
        steps,
        expected,
        total_value: running,
    })
}
