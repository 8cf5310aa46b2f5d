// Policy Benchmark Runner — Monte Carlo validation of the fine-policy engine
// Seedable PRNG, per-iteration audit trail, JSON report output
//
// Usage:
//   cargo run --release --bin bench                   # Run all scenarios (10 runs each)
//   cargo run --release --bin bench -- --runs 3       # Quick mode
//   cargo run --release --bin bench -- DECOMPOSITION  # Filter by name
//   cargo run --release --bin bench -- --history      # Enable JSONL output
//   cargo run --release --bin bench -- --seed 42      # Custom base seed
//   cargo run --release --bin bench -- --agents 50    # Override population size

mod monte_carlo;
mod report;
mod scenarios;
mod time_series;

use report::*;
use scenarios::scenarios;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    agents: Option<usize>,
    history: bool,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 10,
        seed: 0,
        agents: None,
        history: false,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(10);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--agents" => {
                i += 1;
                if i < args.len() {
                    cli.agents = args[i].parse().ok();
                }
            }
            "--history" => {
                cli.history = true;
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let cli = parse_args();
    let all_scenarios = scenarios(cli.agents);

    let to_run: Vec<&scenarios::Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios
                .iter()
                .filter(|s| {
                    s.name.to_lowercase().contains(&f_lower)
                        || s.label.to_lowercase().contains(&f_lower)
                        || s.category.to_lowercase().contains(&f_lower)
                })
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    let history_dir = if cli.history {
        Some(std::path::Path::new("benchmark-results/history").to_path_buf())
    } else {
        None
    };

    println!("\n  Fine Policy Benchmark Runner v0.2.0");
    println!(
        "  PRNG: ChaCha8Rng | Runs/scenario: {} | Base seed: {}",
        cli.runs, cli.seed
    );
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!(
        "  {:<38} {:>5} {:>14} {:>9} {:>9} {:>8}",
        "Scenario", "Pass%", "ΔWelfare", "Gini(F)", "Gini(I)", "Time"
    );
    println!("  {}", "-".repeat(90));

    let suite_start = Instant::now();
    let mut mc_reports = Vec::new();

    for scenario in &to_run {
        let report = monte_carlo::run_monte_carlo(
            scenario,
            cli.runs,
            cli.seed,
            history_dir.as_deref(),
        );

        let pass_pct = report.pass_rate * 100.0;
        let dw = &report.welfare_difference;
        let dw_ci = (dw.ci_upper - dw.ci_lower) / 2.0;
        let status = if report.pass_rate >= 0.9 { "PASS" } else { "FAIL" };

        println!(
            "  {:<38} {:>4}% {:>8.3}±{:<5.3} {:>9.3} {:>9.3} {:>6.0}ms  {}",
            report.label,
            pass_pct as u32,
            dw.mean,
            dw_ci,
            report.flat_gini.mean,
            report.income_gini.mean,
            report.elapsed_ms.mean,
            status,
        );

        mc_reports.push(report);
    }

    let suite_elapsed = suite_start.elapsed();

    // ─── Summary ────────────────────────────────────────────────────────

    let total = mc_reports.len();
    let passed = mc_reports.iter().filter(|r| r.pass_rate >= 0.9).count();
    let failed = total - passed;

    println!("  {}", "-".repeat(90));
    println!(
        "  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
        total,
        passed,
        failed,
        suite_elapsed.as_secs_f64()
    );

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let timestamp = format!("{}", ts);

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: "0.2.0",
        prng: "ChaCha8Rng",
        n_runs_per_scenario: cli.runs,
        summary: Summary {
            total,
            passed,
            failed,
            pass_rate: if total > 0 {
                passed as f64 / total as f64
            } else {
                0.0
            },
        },
        scenarios: mc_reports,
    };

    let dir = std::path::Path::new("benchmark-results");
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Failed to create benchmark-results/: {e}");
        std::process::exit(1);
    }
    let path = dir.join(format!("bench-{}.json", timestamp));
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&path, &json) {
                eprintln!("Failed to write benchmark file: {e}");
                std::process::exit(1);
            }
            println!("  Results saved to: {}\n", path.display());
        }
        Err(e) => {
            eprintln!("Failed to serialize report: {e}");
            std::process::exit(1);
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
