//! Effective price resolution.

use crate::{CostResult, EvalError};
use calc_core::{Catalog, MaterialBill, MaterialId};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Effective unit prices, derived from raw user input whenever prices or the
/// goal change; recomputed from scratch, never patched in place.
#[derive(Clone, Debug, Default)]
pub struct PriceTable {
    prices: BTreeMap<MaterialId, Decimal>,
}

impl PriceTable {
    /// Resolve raw user prices against the catalog.
    ///
    /// Unlisted materials price at 0 (forgiving input). For the synthesizable
    /// pair, the product's effective price is the cheaper of buying directly
    /// and crafting from the source at the fixed ratio.
    pub fn resolve(catalog: &Catalog, raw: &BTreeMap<MaterialId, u64>) -> Self {
        let mut prices: BTreeMap<MaterialId, Decimal> = catalog
            .materials
            .iter()
            .map(|m| {
                let unit = raw.get(&m.id).copied().unwrap_or(0);
                (m.id.clone(), Decimal::from(unit))
            })
            .collect();
        if let Some(rule) = &catalog.synthesis {
            let source = prices
                .get(&rule.source)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let synthesized = source / Decimal::from(rule.units_per_product);
            if let Some(direct) = prices.get_mut(&rule.product) {
                if synthesized < *direct {
                    *direct = synthesized;
                }
            }
        }
        Self { prices }
    }

    /// Effective unit price; absent materials price at 0.
    pub fn unit_price(&self, id: &MaterialId) -> Decimal {
        self.prices.get(id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Value of one attempt's material bill at effective prices.
    pub fn bill_value(&self, bill: &MaterialBill) -> Result<f64, EvalError> {
        let mut total = Decimal::ZERO;
        for (id, qty) in bill {
            total += self.unit_price(id) * Decimal::from(*qty);
        }
        total.to_f64().ok_or(EvalError::NonFinite)
    }

    /// Currency value of a full expectation: expected zeny plus every
    /// expected material quantity at its effective price. Used for display
    /// totals; the engine itself keeps quantities and currency separate.
    pub fn value_of(&self, result: &CostResult) -> Result<f64, EvalError> {
        let mut total = result.zeny();
        for (id, qty) in result.materials() {
            let unit = self.unit_price(id).to_f64().ok_or(EvalError::NonFinite)?;
            total += qty * unit;
        }
        if !total.is_finite() {
            return Err(EvalError::NonFinite);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_core::{Material, SynthesisRule};
    use rust_decimal::prelude::FromPrimitive;

    fn mid(id: &str) -> MaterialId {
        MaterialId(id.to_string())
    }

    fn catalog() -> Catalog {
        Catalog {
            materials: vec![
                Material {
                    id: mid("power"),
                    name: "Power Meteorite Shard".into(),
                },
                Material {
                    id: mid("unknown"),
                    name: "Unknown Meteorite Shard".into(),
                },
            ],
            synthesis: Some(SynthesisRule {
                source: mid("power"),
                product: mid("unknown"),
                units_per_product: 3,
            }),
        }
    }

    #[test]
    fn missing_prices_default_to_zero() {
        let table = PriceTable::resolve(&catalog(), &BTreeMap::new());
        assert_eq!(table.unit_price(&mid("power")), Decimal::ZERO);
        assert_eq!(table.unit_price(&mid("off-catalog")), Decimal::ZERO);
    }

    #[test]
    fn synthesis_substitutes_when_cheaper() {
        let raw = [(mid("power"), 900u64), (mid("unknown"), 500u64)]
            .into_iter()
            .collect();
        let table = PriceTable::resolve(&catalog(), &raw);
        // 900 / 3 = 300 beats buying at 500.
        assert_eq!(table.unit_price(&mid("unknown")), Decimal::from(300));

        let raw = [(mid("power"), 2100u64), (mid("unknown"), 500u64)]
            .into_iter()
            .collect();
        let table = PriceTable::resolve(&catalog(), &raw);
        assert_eq!(table.unit_price(&mid("unknown")), Decimal::from(500));
    }

    #[test]
    fn synthesis_price_keeps_fractional_precision() {
        let raw = [(mid("power"), 1000u64), (mid("unknown"), 400u64)]
            .into_iter()
            .collect();
        let table = PriceTable::resolve(&catalog(), &raw);
        let expected = Decimal::from_f64(1000.0 / 3.0).unwrap();
        let got = table.unit_price(&mid("unknown"));
        assert!((got - expected).abs() < Decimal::new(1, 6));
    }

    #[test]
    fn bill_value_sums_at_effective_prices() {
        let raw = [(mid("power"), 100u64), (mid("unknown"), 900u64)]
            .into_iter()
            .collect();
        let table = PriceTable::resolve(&catalog(), &raw);
        // unknown is synthesized at 100/3.
        let bill: MaterialBill = [(mid("power"), 2), (mid("unknown"), 3)].into_iter().collect();
        let value = table.bill_value(&bill).unwrap();
        assert!((value - (200.0 + 100.0)).abs() < 1e-9);
    }
}
