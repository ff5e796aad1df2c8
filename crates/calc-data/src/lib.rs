#![deny(warnings)]

//! Static game tables: the built-in dataset and a JSON loader.
//!
//! The engine treats all of this as read-only configuration, loaded once
//! before any evaluation. Loading validates every table up front so an
//! authoring mistake (a zero rate, a forward step reference) fails loudly
//! here instead of surfacing as a bogus displayed cost.

use calc_core::{
    validate_assembly, validate_catalog, validate_chained, validate_cluster_stage, AssemblyStage,
    AssemblyStep, AssemblyVariant, Catalog, ChainedSlot, ChainedStage, Cluster, ClusterId,
    ClusterStage, EnchantId, EnchantOption, Goal, LevelTransition, Material, MaterialBill,
    MaterialId, SlotGoal, StepCopies, SynthesisRule, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum DataError {
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(String),
    /// The file is not valid JSON for the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
    /// The tables parsed but violate a domain invariant.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        DataError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        DataError::Parse(e.to_string())
    }
}

/// The full static configuration for one game dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameData {
    /// Material catalog with the synthesis rule.
    pub catalog: Catalog,
    /// Deterministic assembly tables.
    pub assembly: AssemblyStage,
    /// Chained-enchant tables.
    pub chained: ChainedStage,
    /// Leveled cluster-enchant tables.
    pub clusters: ClusterStage,
}

impl GameData {
    /// Run every domain validator.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_catalog(&self.catalog)?;
        validate_assembly(&self.assembly)?;
        validate_chained(&self.chained)?;
        validate_cluster_stage(&self.clusters)?;
        Ok(())
    }

    /// A goal that selects something sensible from every table: weapon
    /// assembly, Fatal Lv.1 on both chained slots, Tenacity 1 -> 5.
    pub fn default_goal(&self) -> Goal {
        Goal {
            variant_choices: [("shape the base".to_string(), "weapon".to_string())]
                .into_iter()
                .collect(),
            enchants: vec![
                SlotGoal {
                    slot: 4,
                    target: EnchantId("fatal".into()),
                    level: 1,
                },
                SlotGoal {
                    slot: 3,
                    target: EnchantId("fatal".into()),
                    level: 1,
                },
            ],
            cluster: ClusterId("tenacity".into()),
            level_range: (self.clusters.min_level, self.clusters.max_level),
        }
    }
}

/// Load and validate a dataset from a JSON file.
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<GameData, DataError> {
    let text = fs::read_to_string(path.as_ref())?;
    let data: GameData = serde_json::from_str(&text)?;
    data.validate()?;
    info!(path = %path.as_ref().display(), "loaded game data");
    Ok(data)
}

fn mid(id: &str) -> MaterialId {
    MaterialId(id.to_string())
}

fn bill(entries: &[(&str, u32)]) -> MaterialBill {
    entries.iter().map(|(id, qty)| (mid(id), *qty)).collect()
}

fn transition(rate: f64, zeny: u64, materials: &[(&str, u32)]) -> LevelTransition {
    LevelTransition {
        rate,
        zeny,
        materials: bill(materials),
    }
}

fn cluster(name: &str, levels: [(u8, LevelTransition); 4]) -> Cluster {
    Cluster {
        name: name.to_string(),
        levels: levels.into_iter().collect(),
    }
}

fn enchant_option(name: &str, rates: &[(u8, f64)]) -> EnchantOption {
    EnchantOption {
        name: name.to_string(),
        rates: rates.iter().copied().collect(),
    }
}

fn chained_slot(number: u8) -> ChainedSlot {
    let options: BTreeMap<EnchantId, EnchantOption> = [
        (
            EnchantId("fatal".into()),
            enchant_option("Fatal", &[(1, 0.5), (2, 0.3), (3, 0.15)]),
        ),
        (
            EnchantId("sharp".into()),
            enchant_option("Sharp", &[(1, 0.45), (2, 0.25), (3, 0.10)]),
        ),
        (
            EnchantId("lucky".into()),
            enchant_option("Lucky Day", &[(1, 0.40), (2, 0.20), (3, 0.08)]),
        ),
    ]
    .into_iter()
    .collect();
    ChainedSlot {
        slot: number,
        pull_zeny: 100_000,
        pull_materials: bill(&[("unknown", 2)]),
        options,
    }
}

/// The built-in dataset: the four meteorite clusters with their published
/// rate/zeny/material tables, the seven shard materials, and the assembly
/// and chained-enchant tables.
pub fn builtin() -> GameData {
    let materials = [
        ("power", "Power Meteorite Shard"),
        ("focus", "Focus Meteorite Shard"),
        ("wisdom", "Wisdom Meteorite Shard"),
        ("creation", "Creation Meteorite Shard"),
        ("sorcery", "Sorcery Meteorite Shard"),
        ("stamina", "Stamina Meteorite Shard"),
        ("unknown", "Unknown Meteorite Shard"),
    ]
    .into_iter()
    .map(|(id, name)| Material {
        id: mid(id),
        name: name.to_string(),
    })
    .collect();

    let catalog = Catalog {
        materials,
        // Three identified shards fuse into one unknown shard.
        synthesis: Some(SynthesisRule {
            source: mid("power"),
            product: mid("unknown"),
            units_per_product: 3,
        }),
    };

    let assembly = AssemblyStage {
        steps: vec![
            AssemblyStep {
                name: "meteorite core".into(),
                zeny: 100_000,
                materials: bill(&[("power", 10), ("stamina", 10)]),
                variants: vec![],
                copies_of: None,
            },
            AssemblyStep {
                name: "shape the base".into(),
                zeny: 200_000,
                materials: bill(&[("unknown", 5)]),
                variants: vec![
                    AssemblyVariant {
                        name: "weapon".into(),
                        materials: bill(&[("focus", 20), ("sorcery", 10)]),
                    },
                    AssemblyVariant {
                        name: "armor".into(),
                        materials: bill(&[("stamina", 20), ("creation", 10)]),
                    },
                ],
                copies_of: None,
            },
            AssemblyStep {
                name: "socket polishing".into(),
                zeny: 50_000,
                materials: bill(&[("unknown", 5)]),
                // Polishing burns through two spare cores.
                copies_of: Some(StepCopies { step: 0, copies: 2 }),
                variants: vec![],
            },
        ],
    };

    let chained = ChainedStage {
        slots: vec![chained_slot(4), chained_slot(3)],
        reset_zeny: 50_000,
        reset_materials: MaterialBill::new(),
    };

    let clusters = ClusterStage {
        min_level: 1,
        max_level: 5,
        clusters: [
            (
                ClusterId("tenacity".into()),
                cluster(
                    "Tenacity Cluster",
                    [
                        (
                            2,
                            transition(
                                0.80,
                                500_000,
                                &[("power", 5), ("focus", 4), ("wisdom", 5), ("unknown", 4)],
                            ),
                        ),
                        (
                            3,
                            transition(
                                0.65,
                                1_000_000,
                                &[("power", 10), ("focus", 8), ("wisdom", 10), ("unknown", 8)],
                            ),
                        ),
                        (
                            4,
                            transition(
                                0.45,
                                2_000_000,
                                &[
                                    ("power", 20),
                                    ("focus", 16),
                                    ("wisdom", 20),
                                    ("unknown", 16),
                                ],
                            ),
                        ),
                        (
                            5,
                            transition(
                                0.25,
                                3_500_000,
                                &[
                                    ("power", 35),
                                    ("focus", 28),
                                    ("wisdom", 35),
                                    ("unknown", 28),
                                ],
                            ),
                        ),
                    ],
                ),
            ),
            (
                ClusterId("fortune".into()),
                cluster(
                    "Fortune Cluster",
                    [
                        (
                            2,
                            transition(
                                0.80,
                                500_000,
                                &[
                                    ("power", 4),
                                    ("creation", 5),
                                    ("sorcery", 5),
                                    ("unknown", 4),
                                ],
                            ),
                        ),
                        (
                            3,
                            transition(
                                0.65,
                                1_000_000,
                                &[
                                    ("power", 8),
                                    ("creation", 10),
                                    ("sorcery", 10),
                                    ("unknown", 8),
                                ],
                            ),
                        ),
                        (
                            4,
                            transition(
                                0.45,
                                2_000_000,
                                &[
                                    ("power", 16),
                                    ("creation", 20),
                                    ("sorcery", 20),
                                    ("unknown", 16),
                                ],
                            ),
                        ),
                        (
                            5,
                            transition(
                                0.25,
                                3_500_000,
                                &[
                                    ("power", 28),
                                    ("creation", 35),
                                    ("sorcery", 35),
                                    ("unknown", 28),
                                ],
                            ),
                        ),
                    ],
                ),
            ),
            (
                ClusterId("wisdom".into()),
                cluster(
                    "Wisdom Cluster",
                    [
                        (
                            2,
                            transition(
                                0.80,
                                500_000,
                                &[
                                    ("stamina", 5),
                                    ("focus", 4),
                                    ("sorcery", 5),
                                    ("unknown", 4),
                                ],
                            ),
                        ),
                        (
                            3,
                            transition(
                                0.65,
                                1_000_000,
                                &[
                                    ("stamina", 10),
                                    ("focus", 8),
                                    ("sorcery", 10),
                                    ("unknown", 8),
                                ],
                            ),
                        ),
                        (
                            4,
                            transition(
                                0.45,
                                2_000_000,
                                &[
                                    ("stamina", 20),
                                    ("focus", 16),
                                    ("sorcery", 20),
                                    ("unknown", 16),
                                ],
                            ),
                        ),
                        (
                            5,
                            transition(
                                0.25,
                                3_500_000,
                                &[
                                    ("stamina", 35),
                                    ("focus", 28),
                                    ("sorcery", 35),
                                    ("unknown", 28),
                                ],
                            ),
                        ),
                    ],
                ),
            ),
            (
                ClusterId("defense".into()),
                cluster(
                    "Defense Cluster",
                    [
                        (
                            2,
                            transition(
                                0.80,
                                500_000,
                                &[
                                    ("stamina", 5),
                                    ("creation", 5),
                                    ("wisdom", 4),
                                    ("unknown", 4),
                                ],
                            ),
                        ),
                        (
                            3,
                            transition(
                                0.65,
                                1_000_000,
                                &[
                                    ("stamina", 10),
                                    ("creation", 10),
                                    ("wisdom", 8),
                                    ("unknown", 8),
                                ],
                            ),
                        ),
                        (
                            4,
                            transition(
                                0.45,
                                2_000_000,
                                &[
                                    ("stamina", 20),
                                    ("creation", 20),
                                    ("wisdom", 16),
                                    ("unknown", 16),
                                ],
                            ),
                        ),
                        (
                            5,
                            transition(
                                0.25,
                                3_500_000,
                                &[
                                    ("stamina", 35),
                                    ("creation", 35),
                                    ("wisdom", 28),
                                    ("unknown", 28),
                                ],
                            ),
                        ),
                    ],
                ),
            ),
        ]
        .into_iter()
        .collect(),
    };

    GameData {
        catalog,
        assembly,
        chained,
        clusters,
    }
}
