#![deny(warnings)]

//! Expected-cost evaluators for the enchant pipeline.
//!
//! This crate provides validated utilities for:
//! - Effective price resolution with the synthesis substitution rule
//! - Deterministic bill-of-materials assembly folding
//! - Geometric-retry expectations over contiguous level ranges
//! - Cascading dependent-stage expectations with a shared paid reset
//! - Aggregation of per-phase results over an inclusive phase range
//!
//! Every evaluator is a pure function of its inputs; goal and prices are
//! passed in by reference on each recomputation and nothing is cached.

use thiserror::Error;

mod aggregate;
mod assembly;
mod chain;
mod price;
mod result;
mod retry;

pub use aggregate::{aggregate, Phase};
pub use assembly::{evaluate_assembly, AssemblyReport, StepCost};
pub use chain::{evaluate_chain, ChainReport, SlotOutcome};
pub use price::PriceTable;
pub use result::CostResult;
pub use retry::{evaluate_cluster, expected_attempts, ClusterReport, LevelRow};

/// Errors produced by the evaluators.
///
/// Missing configuration is signaled distinctly from a legitimate zero-cost
/// result so callers can suppress rendering instead of showing a misleading
/// number.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    /// Success rates must lie in (0, 1]; rate 0 has an infinite expectation.
    #[error("success rate {0} is outside (0, 1]")]
    InvalidRate(f64),
    /// The selected cluster has no configured table.
    #[error("unknown cluster: {0}")]
    UnknownCluster(String),
    /// A goal references a chained slot with no configured pull data.
    #[error("no pull data configured for slot {0}")]
    UnknownSlot(u8),
    /// The selected target is not offered by the slot.
    #[error("slot {slot} has no enchant target '{target}'")]
    UnknownTarget { slot: u8, target: String },
    /// The selected target has no rate entry at the requested level.
    #[error("no success rate configured for '{target}' Lv.{level}")]
    MissingRate { target: String, level: u8 },
    /// An assembly step offers variants but the goal selects none.
    #[error("step '{step}' requires a variant selection")]
    MissingVariantChoice { step: String },
    /// The goal selects a variant the step does not offer.
    #[error("step '{step}' has no variant '{variant}'")]
    UnknownVariant { step: String, variant: String },
    /// An assembly step references a step that was not evaluated before it.
    #[error("step {step} references unevaluated step {referenced}")]
    BadStepReference { step: usize, referenced: usize },
    /// Numeric conversion to floating point failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}
