#![deny(warnings)]

//! Headless CLI: builds a goal and price table from flags, runs every
//! evaluator, and prints per-stage and aggregate expectations.

use anyhow::{Context, Result};
use calc_core::{EnchantId, Goal, MaterialId, SlotGoal};
use calc_engine::{
    aggregate, evaluate_assembly, evaluate_chain, evaluate_cluster, AssemblyReport, ChainReport,
    ClusterReport, CostResult, Phase, PriceTable,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    data: Option<String>,
    cluster: Option<String>,
    from: Option<u8>,
    to: Option<u8>,
    enchants: Vec<SlotGoal>,
    variants: Vec<(String, String)>,
    prices: BTreeMap<MaterialId, u64>,
    phases: Option<(Phase, Phase)>,
    json: bool,
}

/// `slot=target:level`, e.g. `4=fatal:2`.
fn parse_enchant(spec: &str) -> Option<SlotGoal> {
    let (slot, rest) = spec.split_once('=')?;
    let (target, level) = rest.split_once(':')?;
    Some(SlotGoal {
        slot: slot.parse().ok()?,
        target: EnchantId(target.to_string()),
        level: level.parse().ok()?,
    })
}

/// `material=zeny`; an unparseable price is coerced to 0, not rejected.
fn parse_price(spec: &str) -> Option<(MaterialId, u64)> {
    let (id, price) = spec.split_once('=')?;
    Some((MaterialId(id.to_string()), price.parse().unwrap_or(0)))
}

/// `from..to` over the phase names, e.g. `chained..cluster`.
fn parse_phases(spec: &str) -> Option<(Phase, Phase)> {
    let (from, to) = spec.split_once("..")?;
    Some((from.parse().ok()?, to.parse().ok()?))
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--data" => args.data = it.next(),
            "--cluster" => args.cluster = it.next(),
            "--from" => args.from = it.next().and_then(|s| s.parse().ok()),
            "--to" => args.to = it.next().and_then(|s| s.parse().ok()),
            "--enchant" => {
                if let Some(goal) = it.next().as_deref().and_then(parse_enchant) {
                    args.enchants.push(goal);
                }
            }
            "--variant" => {
                if let Some((step, variant)) = it
                    .next()
                    .as_deref()
                    .and_then(|s| s.split_once('=').map(|(a, b)| (a.to_string(), b.to_string())))
                {
                    args.variants.push((step, variant));
                }
            }
            "--price" => {
                if let Some((id, price)) = it.next().as_deref().and_then(parse_price) {
                    args.prices.insert(id, price);
                }
            }
            "--phases" => args.phases = it.next().as_deref().and_then(parse_phases),
            "--json" => args.json = true,
            _ => {}
        }
    }
    args
}

fn fmt_zeny(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[derive(Serialize)]
struct Summary {
    assembly: Option<AssemblyReport>,
    chained: Option<ChainReport>,
    cluster: Option<ClusterReport>,
    total: CostResult,
    total_value: f64,
}

fn print_assembly(report: &AssemblyReport) {
    println!("Assembly");
    for step in &report.steps {
        println!(
            "  {:<20} {:>14}  (running {:>14})",
            step.name,
            fmt_zeny(step.value),
            fmt_zeny(step.running_total)
        );
    }
    println!("  total value: {} Zeny", fmt_zeny(report.total_value));
}

fn print_chain(report: &ChainReport, prices: &PriceTable) -> Result<()> {
    println!("Chained enchant");
    for slot in &report.slots {
        println!(
            "  slot {} {} Lv.{}  rate {:>4.0}%  attempts {:>6.2}  expected {:>14} Zeny",
            slot.slot,
            slot.target.0,
            slot.level,
            slot.rate * 100.0,
            slot.attempts,
            fmt_zeny(prices.value_of(&slot.expected)?)
        );
    }
    println!(
        "  total value: {} Zeny",
        fmt_zeny(prices.value_of(&report.expected)?)
    );
    Ok(())
}

fn print_cluster(report: &ClusterReport, prices: &PriceTable) -> Result<()> {
    println!("Cluster enchant");
    for row in &report.rows {
        println!(
            "  Lv.{} -> Lv.{}  rate {:>4.0}%  attempts {:>6.2}  expected {:>14} Zeny",
            row.from,
            row.to,
            row.rate * 100.0,
            row.attempts,
            fmt_zeny(row.expected_value)
        );
    }
    println!(
        "  zeny: {}  materials: {}  total value: {} Zeny",
        fmt_zeny(report.expected.zeny()),
        fmt_zeny(report.material_value),
        fmt_zeny(prices.value_of(&report.expected)?)
    );
    Ok(())
}

fn print_materials(total: &CostResult) {
    if total.materials().is_empty() {
        return;
    }
    println!("Expected materials");
    for (id, qty) in total.materials() {
        println!("  {:<12} {:>12.2}", id.0, qty);
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();

    let data = match &args.data {
        Some(path) => calc_data::load_path(path).context("loading game data")?,
        None => calc_data::builtin(),
    };
    data.validate().context("validating game data")?;

    let mut goal: Goal = data.default_goal();
    if let Some(cluster) = &args.cluster {
        goal.cluster = calc_core::ClusterId(cluster.clone());
    }
    if let Some(from) = args.from {
        goal.level_range.0 = from;
    }
    if let Some(to) = args.to {
        goal.level_range.1 = to;
    }
    if !args.enchants.is_empty() {
        goal.enchants = args.enchants.clone();
    }
    for (step, variant) in &args.variants {
        goal.variant_choices.insert(step.clone(), variant.clone());
    }

    let prices = PriceTable::resolve(&data.catalog, &args.prices);
    let (phase_from, phase_to) = args
        .phases
        .unwrap_or((Phase::Assembly, Phase::ClusterEnchant));
    info!(cluster = %goal.cluster.0, from = goal.level_range.0, to = goal.level_range.1, "evaluating plan");

    // A stage whose goal selection has no configuration is reported as
    // "no result" and left out of the aggregate, never shown as zero.
    let mut results: Vec<(Phase, CostResult)> = Vec::new();

    let assembly = match evaluate_assembly(&data.assembly, &goal, &prices) {
        Ok(report) => {
            results.push((Phase::Assembly, report.expected.clone()));
            Some(report)
        }
        Err(err) => {
            warn!(%err, "assembly: no result");
            None
        }
    };
    let chained = match evaluate_chain(&data.chained, &goal.enchants) {
        Ok(report) => {
            results.push((Phase::ChainedEnchant, report.expected.clone()));
            Some(report)
        }
        Err(err) => {
            warn!(%err, "chained enchant: no result");
            None
        }
    };
    let cluster = match evaluate_cluster(
        &data.clusters,
        &goal.cluster,
        goal.level_range.0,
        goal.level_range.1,
        &prices,
    ) {
        Ok(report) => {
            results.push((Phase::ClusterEnchant, report.expected.clone()));
            Some(report)
        }
        Err(err) => {
            warn!(%err, "cluster enchant: no result");
            None
        }
    };

    let total = aggregate(&results, phase_from, phase_to);
    let total_value = prices.value_of(&total)?;

    if args.json {
        let summary = Summary {
            assembly,
            chained,
            cluster,
            total,
            total_value,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if let Some(report) = &assembly {
        print_assembly(report);
    }
    if let Some(report) = &chained {
        print_chain(report, &prices)?;
    }
    if let Some(report) = &cluster {
        print_cluster(report, &prices)?;
    }
    println!(
        "Aggregate [{phase_from}..{phase_to}] | zeny: {} | total value: {} Zeny",
        fmt_zeny(total.zeny()),
        fmt_zeny(total_value)
    );
    print_materials(&total);

    Ok(())
}
