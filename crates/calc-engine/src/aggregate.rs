//! Aggregation of per-phase results.

use crate::CostResult;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Pipeline phases in chronological order. The derived `Ord` follows the
/// declaration order, which is what the range selection relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Phase {
    /// Deterministic bill-of-materials assembly.
    Assembly,
    /// Chained enchant pulls sharing a reset.
    ChainedEnchant,
    /// Leveled cluster enchanting.
    ClusterEnchant,
}

impl Phase {
    /// All phases in pipeline order.
    pub const ALL: [Phase; 3] = [
        Phase::Assembly,
        Phase::ChainedEnchant,
        Phase::ClusterEnchant,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Assembly => "assembly",
            Phase::ChainedEnchant => "chained",
            Phase::ClusterEnchant => "cluster",
        };
        f.write_str(name)
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assembly" => Ok(Phase::Assembly),
            "chained" => Ok(Phase::ChainedEnchant),
            "cluster" => Ok(Phase::ClusterEnchant),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

/// Sum the results of every phase whose position lies in [from, to]
/// inclusive. Each component evaluator's own output is used as-is; material
/// maps merge by keyed addition with absent keys defaulting to 0.
pub fn aggregate(results: &[(Phase, CostResult)], from: Phase, to: Phase) -> CostResult {
    results
        .iter()
        .filter(|(phase, _)| (from..=to).contains(phase))
        .fold(CostResult::zero(), |acc, (_, result)| acc.merge(result))
}
