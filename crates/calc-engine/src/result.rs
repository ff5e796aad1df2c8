//! Expectation value type shared by every evaluator.

use calc_core::{MaterialBill, MaterialId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Output of any evaluator: an expected currency total plus expected
/// material quantities (reals, not necessarily integral).
///
/// Immutable value semantics: combinators return fresh values and never
/// mutate a caller's previously returned result. All quantities are >= 0 by
/// construction because inputs are unsigned configuration and scaling
/// factors are non-negative.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CostResult {
    zeny: f64,
    materials: BTreeMap<MaterialId, f64>,
}

impl CostResult {
    /// The empty expectation.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Expectation of a single deterministic attempt.
    pub fn from_attempt(zeny: u64, bill: &MaterialBill) -> Self {
        Self {
            zeny: zeny as f64,
            materials: bill
                .iter()
                .map(|(id, qty)| (id.clone(), *qty as f64))
                .collect(),
        }
    }

    /// Expected currency.
    pub fn zeny(&self) -> f64 {
        self.zeny
    }

    /// Expected quantity per material.
    pub fn materials(&self) -> &BTreeMap<MaterialId, f64> {
        &self.materials
    }

    /// Expected quantity of one material; absent keys default to 0.
    pub fn material(&self, id: &MaterialId) -> f64 {
        self.materials.get(id).copied().unwrap_or(0.0)
    }

    /// Keyed addition of two expectations.
    pub fn merge(&self, other: &Self) -> Self {
        let mut materials = self.materials.clone();
        for (id, qty) in &other.materials {
            *materials.entry(id.clone()).or_insert(0.0) += qty;
        }
        Self {
            zeny: self.zeny + other.zeny,
            materials,
        }
    }

    /// Scale currency and every material quantity by the same factor.
    pub fn scaled(&self, factor: f64) -> Self {
        debug_assert!(factor >= 0.0);
        Self {
            zeny: self.zeny * factor,
            materials: self
                .materials
                .iter()
                .map(|(id, qty)| (id.clone(), qty * factor))
                .collect(),
        }
    }

    /// Add a currency-only line item (pseudo-material contributions touch
    /// currency, never the material map).
    pub fn with_zeny(&self, amount: f64) -> Self {
        debug_assert!(amount >= 0.0);
        Self {
            zeny: self.zeny + amount,
            materials: self.materials.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mid(id: &str) -> MaterialId {
        MaterialId(id.to_string())
    }

    #[test]
    fn merge_adds_keyed_with_zero_default() {
        let a = CostResult::from_attempt(100, &[(mid("power"), 2)].into_iter().collect());
        let b = CostResult::from_attempt(50, &[(mid("focus"), 3)].into_iter().collect());
        let sum = a.merge(&b);
        assert_eq!(sum.zeny(), 150.0);
        assert_eq!(sum.material(&mid("power")), 2.0);
        assert_eq!(sum.material(&mid("focus")), 3.0);
        assert_eq!(sum.material(&mid("wisdom")), 0.0);
        // inputs untouched
        assert_eq!(a.material(&mid("focus")), 0.0);
    }

    #[test]
    fn zeny_line_item_never_touches_materials() {
        let a = CostResult::from_attempt(100, &[(mid("power"), 2)].into_iter().collect());
        let with = a.with_zeny(400.0);
        assert_eq!(with.zeny(), 500.0);
        assert_eq!(with.materials(), a.materials());
    }

    proptest! {
        #[test]
        fn scaling_is_componentwise(zeny in 0u64..10_000_000, qty in 0u32..10_000, factor in 0.0f64..100.0) {
            let r = CostResult::from_attempt(zeny, &[(mid("power"), qty)].into_iter().collect());
            let s = r.scaled(factor);
            prop_assert!((s.zeny() - zeny as f64 * factor).abs() < 1e-6);
            prop_assert!((s.material(&mid("power")) - qty as f64 * factor).abs() < 1e-6);
        }

        #[test]
        fn merge_is_commutative(z1 in 0u64..1_000_000, z2 in 0u64..1_000_000, q1 in 0u32..1_000, q2 in 0u32..1_000) {
            let a = CostResult::from_attempt(z1, &[(mid("power"), q1)].into_iter().collect());
            let b = CostResult::from_attempt(z2, &[(mid("power"), q2), (mid("focus"), q1)].into_iter().collect());
            prop_assert_eq!(a.merge(&b), b.merge(&a));
        }
    }
}
