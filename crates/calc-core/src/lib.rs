#![deny(warnings)]

//! Core domain models and invariants for the enchant cost calculator.
//!
//! This crate defines the serializable static configuration shared across the
//! pipeline (material catalog, stage tables, goal selection) with validation
//! helpers to guarantee basic invariants at load time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Unique identifier for a raw material, e.g. "power", "unknown".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub String);

/// Unique identifier for an enchant cluster, e.g. "tenacity".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub String);

/// Unique identifier for a chained-enchant target, e.g. "fatal".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnchantId(pub String);

/// Per-attempt material quantities keyed by material id.
pub type MaterialBill = BTreeMap<MaterialId, u32>;

/// A raw material with a display name. Unit prices are session input, not
/// part of the catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Material {
    /// Material identifier.
    pub id: MaterialId,
    /// Human-readable name, e.g. "Power Meteorite Shard".
    pub name: String,
}

/// Fixed conversion: `units_per_product` units of `source` synthesize one
/// unit of `product`. Static configuration, never derived at runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SynthesisRule {
    /// Material consumed by the synthesis.
    pub source: MaterialId,
    /// Material produced by the synthesis.
    pub product: MaterialId,
    /// Units of `source` per unit of `product` (>= 1).
    pub units_per_product: u32,
}

/// Process-wide material catalog, loaded once at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    /// All known materials (unique ids).
    pub materials: Vec<Material>,
    /// Optional synthesizable pair.
    pub synthesis: Option<SynthesisRule>,
}

/// Mutually exclusive target selection within an assembly step; exactly one
/// variant is active per evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssemblyVariant {
    /// Variant name, e.g. "weapon".
    pub name: String,
    /// Materials consumed by this variant.
    pub materials: MaterialBill,
}

/// Line item referencing "N copies of an earlier step's computed total".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepCopies {
    /// Index of the referenced step; must be strictly earlier.
    pub step: usize,
    /// Number of copies (>= 1).
    pub copies: u32,
}

/// One step of a deterministic bill-of-materials assembly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssemblyStep {
    /// Step name, e.g. "refine core".
    pub name: String,
    /// Fixed currency cost per step.
    pub zeny: u64,
    /// Materials consumed regardless of variant choice.
    pub materials: MaterialBill,
    /// Mutually exclusive variants; empty means no choice to make.
    pub variants: Vec<AssemblyVariant>,
    /// Optional pseudo-material line item.
    pub copies_of: Option<StepCopies>,
}

/// Ordered deterministic assembly; later steps may fold in earlier steps'
/// computed totals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssemblyStage {
    /// Steps in declared evaluation order.
    pub steps: Vec<AssemblyStep>,
}

/// One probabilistic level transition, from level k-1 to level k.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelTransition {
    /// Success probability in (0, 1].
    pub rate: f64,
    /// Fixed currency cost per attempt.
    pub zeny: u64,
    /// Materials consumed per attempt.
    pub materials: MaterialBill,
}

/// A leveled-retry cluster: independent transitions keyed by target level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cluster {
    /// Display name of the cluster.
    pub name: String,
    /// Transition table keyed by target level.
    pub levels: BTreeMap<u8, LevelTransition>,
}

/// The leveled-retry stage: selectable clusters over a shared level window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterStage {
    /// Lowest level a goal may start from.
    pub min_level: u8,
    /// Highest reachable level.
    pub max_level: u8,
    /// Selectable clusters.
    pub clusters: BTreeMap<ClusterId, Cluster>,
}

/// A selectable enchant for one chained slot, with per-level success rates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnchantOption {
    /// Display name of the enchant.
    pub name: String,
    /// Success rate keyed by target level.
    pub rates: BTreeMap<u8, f64>,
}

/// One pull slot of the chained-enchant stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainedSlot {
    /// Slot number as shown in game, e.g. 4.
    pub slot: u8,
    /// Fixed currency cost per pull.
    pub pull_zeny: u64,
    /// Materials consumed per pull.
    pub pull_materials: MaterialBill,
    /// Selectable targets for this slot.
    pub options: BTreeMap<EnchantId, EnchantOption>,
}

/// The chained-enchant stage. Slots are listed in chronological attempt
/// order; a failed pull on a later slot forces the shared reset, which also
/// destroys the results of every earlier slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainedStage {
    /// Slots in chronological attempt order.
    pub slots: Vec<ChainedSlot>,
    /// Fixed currency cost of the shared reset.
    pub reset_zeny: u64,
    /// Materials consumed by the shared reset.
    pub reset_materials: MaterialBill,
}

/// Target selection for one chained slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGoal {
    /// Slot number, matching `ChainedSlot::slot`.
    pub slot: u8,
    /// Selected enchant target.
    pub target: EnchantId,
    /// Selected target level.
    pub level: u8,
}

/// The user's current selection across all stages. Session state only;
/// mutated by the presentation layer and passed into the engine by reference
/// on each recomputation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Goal {
    /// Active variant per assembly step, keyed by step name.
    pub variant_choices: BTreeMap<String, String>,
    /// Target per chained slot.
    pub enchants: Vec<SlotGoal>,
    /// Selected leveled-retry cluster.
    pub cluster: ClusterId,
    /// Start level (held) and end level (wanted), inclusive of the end.
    pub level_range: (u8, u8),
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Success rates must lie in (0, 1]; 0 means an infinite expectation.
    #[error("success rate {0} is outside (0, 1]")]
    InvalidRate(f64),
    /// Names and identifiers must be non-empty.
    #[error("empty name or identifier")]
    EmptyName,
    /// Duplicate material id in the catalog.
    #[error("duplicate material id: {0}")]
    DuplicateMaterial(String),
    /// Synthesis rule references a material missing from the catalog.
    #[error("synthesis references unknown material: {0}")]
    UnknownMaterial(String),
    /// Synthesis ratio must be at least 1.
    #[error("synthesis ratio must be >= 1")]
    ZeroRatio,
    /// `copies_of` must reference a strictly earlier step.
    #[error("step {step} references step {referenced}, which is not earlier")]
    ForwardStepReference { step: usize, referenced: usize },
    /// Copies count must be at least 1.
    #[error("copies count must be >= 1 in step {0}")]
    ZeroCopies(usize),
    /// Duplicate slot number in the chained stage.
    #[error("duplicate chained slot: {0}")]
    DuplicateSlot(u8),
    /// Level window must satisfy min < max.
    #[error("level window [{0}, {1}] is empty")]
    EmptyLevelWindow(u8, u8),
    /// A transition is keyed outside the stage's level window.
    #[error("level {0} is outside the configured window")]
    LevelOutOfWindow(u8),
}

/// Check a configured success rate. 0 is a configuration error (infinite
/// expectation), not a computable value.
pub fn validate_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate <= 0.0 || rate > 1.0 {
        return Err(ValidationError::InvalidRate(rate));
    }
    Ok(())
}

/// Validate the material catalog and its optional synthesis rule.
pub fn validate_catalog(catalog: &Catalog) -> Result<(), ValidationError> {
    let mut ids: BTreeSet<&MaterialId> = BTreeSet::new();
    for m in &catalog.materials {
        if m.id.0.trim().is_empty() || m.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !ids.insert(&m.id) {
            return Err(ValidationError::DuplicateMaterial(m.id.0.clone()));
        }
    }
    if let Some(rule) = &catalog.synthesis {
        if rule.units_per_product == 0 {
            return Err(ValidationError::ZeroRatio);
        }
        for id in [&rule.source, &rule.product] {
            if !ids.contains(id) {
                return Err(ValidationError::UnknownMaterial(id.0.clone()));
            }
        }
    }
    Ok(())
}

/// Validate the assembly stage, including back-reference ordering.
pub fn validate_assembly(stage: &AssemblyStage) -> Result<(), ValidationError> {
    for (idx, step) in stage.steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        for v in &step.variants {
            if v.name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
        }
        if let Some(copies) = &step.copies_of {
            if copies.step >= idx {
                return Err(ValidationError::ForwardStepReference {
                    step: idx,
                    referenced: copies.step,
                });
            }
            if copies.copies == 0 {
                return Err(ValidationError::ZeroCopies(idx));
            }
        }
    }
    Ok(())
}

/// Validate the leveled-retry stage: rates and level keys.
pub fn validate_cluster_stage(stage: &ClusterStage) -> Result<(), ValidationError> {
    if stage.min_level >= stage.max_level {
        return Err(ValidationError::EmptyLevelWindow(
            stage.min_level,
            stage.max_level,
        ));
    }
    for cluster in stage.clusters.values() {
        if cluster.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        for (level, transition) in &cluster.levels {
            if *level <= stage.min_level || *level > stage.max_level {
                return Err(ValidationError::LevelOutOfWindow(*level));
            }
            validate_rate(transition.rate)?;
        }
    }
    Ok(())
}

/// Validate the chained-enchant stage: slot uniqueness and all rates.
pub fn validate_chained(stage: &ChainedStage) -> Result<(), ValidationError> {
    let mut slots: BTreeSet<u8> = BTreeSet::new();
    for slot in &stage.slots {
        if !slots.insert(slot.slot) {
            return Err(ValidationError::DuplicateSlot(slot.slot));
        }
        for option in slot.options.values() {
            if option.name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
            for rate in option.rates.values() {
                validate_rate(*rate)?;
            }
        }
    }
    Ok(())
}
