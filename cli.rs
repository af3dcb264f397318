use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use yield_alloc_engine::allocation::{allocate, narrow, Allocation};
use yield_alloc_engine::batch::{allocate_batch, summarize, sweep, Scenario};
use yield_alloc_engine::model::{total_profit, Pool};

#[derive(Parser)]
#[command(name = "yield-alloc", about = "Constrained liquidity allocation across yield pools")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Allocate a liquidity total across pools given inline as a,b pairs.
	Allocate {
		#[arg(long)]
		total: f64,
		/// Pool rate-model parameters, e.g. --pool 20,1000 --pool 30,2000
		#[arg(long = "pool", required = true)]
		pools: Vec<String>,
		/// Flat per-pool participation cost; when set, the allocation is
		/// narrowed after optimizing.
		#[arg(long)]
		pool_cost: Option<f64>,
		#[arg(long, default_value_t = false)]
		json: bool,
	},
	/// Allocate every scenario in a JSON file
	/// ([{"total": .., "pools": [{"a": .., "b": ..}, ..]}, ..]).
	Batch {
		file: PathBuf,
		#[arg(long, default_value_t = false)]
		json: bool,
	},
	/// Random-scenario sweep: sample, allocate in parallel, report aggregates.
	Sweep {
		#[arg(long, default_value_t = 200)]
		scenarios: usize,
		#[arg(long, default_value_t = 0)]
		seed_start: u64,
		/// Write a JSON receipt with per-scenario records.
		#[arg(long)]
		receipt: Option<PathBuf>,
	},
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	match cli.command {
		Commands::Allocate { total, pools, pool_cost, json } => {
			allocate_cmd(total, &pools, pool_cost, json)
		}
		Commands::Batch { file, json } => batch_cmd(&file, json),
		Commands::Sweep { scenarios, seed_start, receipt } => {
			sweep_cmd(scenarios, seed_start, receipt.as_deref())
		}
	}
}

fn parse_pool(s: &str) -> Result<Pool> {
	let (a, b) = s
		.split_once(',')
		.with_context(|| format!("pool must be given as \"a,b\", got {s:?}"))?;
	Ok(Pool::new(
		a.trim().parse().with_context(|| format!("bad pool parameter a in {s:?}"))?,
		b.trim().parse().with_context(|| format!("bad pool parameter b in {s:?}"))?,
	))
}

fn allocate_cmd(total: f64, pool_args: &[String], pool_cost: Option<f64>, json: bool) -> Result<()> {
	let pools = pool_args.iter().map(|s| parse_pool(s)).collect::<Result<Vec<_>>>()?;
	let result = allocate(total, &pools)?;
	let narrowed = pool_cost
		.map(|cost| narrow(&result.allocation, &pools, cost))
		.transpose()?;

	if json {
		let payload = json!({
			"total": total,
			"allocation": result.allocation,
			"interests": result.interests,
			"steps": result.steps,
			"narrowed": narrowed,
		});
		println!("{}", serde_json::to_string_pretty(&payload)?);
		return Ok(());
	}

	println!("\nPool (a, b)           Allocation      Interest");
	println!("------------------------------------------------");
	for (p, &xi) in pools.iter().zip(&result.allocation) {
		println!("({:>6.1},{:>8.1}) {:>14.4} {:>13.4}", p.a, p.b, xi, p.interest(xi, 1.0));
	}
	println!("------------------------------------------------");
	println!("total interests {:>10.4} in {} steps", result.interests, result.steps);

	if let (Some(cost), Some(narrowed)) = (pool_cost, narrowed) {
		println!("\nnarrowed at pool cost {cost}:");
		for (p, &xi) in pools.iter().zip(&narrowed) {
			println!("({:>6.1},{:>8.1}) {:>14.4}", p.a, p.b, xi);
		}
		println!("total profit {:>10.4}", total_profit(&narrowed, &pools, cost, 1.0));
	}

	Ok(())
}

fn batch_cmd(file: &Path, json: bool) -> Result<()> {
	let raw = fs::read_to_string(file)
		.with_context(|| format!("cannot read scenario file {}", file.display()))?;
	let scenarios: Vec<Scenario> =
		serde_json::from_str(&raw).context("scenario file is not a JSON array of scenarios")?;
	if scenarios.is_empty() {
		bail!("scenario file {} holds no scenarios", file.display());
	}

	let results: Vec<Allocation> = allocate_batch(&scenarios)?;

	if json {
		let payload: Vec<_> = scenarios
			.iter()
			.zip(&results)
			.map(|(s, r)| {
				json!({
					"total": s.total,
					"pools": s.pools,
					"allocation": r.allocation,
					"interests": r.interests,
					"steps": r.steps,
				})
			})
			.collect();
		println!("{}", serde_json::to_string_pretty(&payload)?);
		return Ok(());
	}

	println!("\n   #     Pools        Total     Interests    Uplift%   Steps");
	println!("--------------------------------------------------------------");
	for (i, (s, r)) in scenarios.iter().zip(&results).enumerate() {
		let uniform = s.uniform_interests();
		let uplift = if uniform > 0.0 { (r.interests - uniform) / uniform * 100.0 } else { 0.0 };
		println!(
			"{:>4} {:>9} {:>12.2} {:>13.4} {:>10.3} {:>7}",
			i,
			s.pools.len(),
			s.total,
			r.interests,
			uplift,
			r.steps
		);
	}

	Ok(())
}

fn sweep_cmd(n_scenarios: usize, seed_start: u64, receipt: Option<&Path>) -> Result<()> {
	if n_scenarios == 0 {
		bail!("sweep needs at least one scenario");
	}

	let records = sweep(n_scenarios, seed_start)?;
	let summary = summarize(&records);

	println!("\nScenarios   Mean Uplift%   Mean Steps   Max |Σx-L|     Min Entry");
	println!("------------------------------------------------------------------");
	println!(
		"{:>9} {:>14.4} {:>12.1} {:>12.3e} {:>13.3e}",
		summary.scenarios,
		summary.mean_uplift_pct,
		summary.mean_steps,
		summary.max_conservation_error,
		summary.min_entry
	);

	if let Some(path) = receipt {
		let ts = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
		let payload = json!({
			"timestamp": ts,
			"scenarios": n_scenarios,
			"seed_start": seed_start,
			"summary": summary,
			"records": records,
		});
		fs::write(path, serde_json::to_vec_pretty(&payload)?)
			.with_context(|| format!("cannot write receipt to {}", path.display()))?;
		println!("\nSweep receipt: {}", path.display());
	}

	Ok(())
}
