use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "halo-atomics workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the criterion benchmarks and summarize them
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
    /// Run the multi-threaded race tests in release mode
    Stress {
        /// Iterations per test (HALO_STRESS_ITERS)
        #[arg(long, default_value_t = 200_000)]
        iters: usize,

        /// Threads per test (HALO_STRESS_THREADS)
        #[arg(long, default_value_t = 8)]
        threads: usize,

        /// Also enable the `tracing` feature
        #[arg(long, default_value_t = false)]
        tracing: bool,
    },
}

const BENCHES: &[&str] = &["reference_benchmark", "atomic_int_benchmark"];

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
        Commands::Stress {
            iters,
            threads,
            tracing,
        } => run_stress(iters, threads, tracing)?,
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!("Running benchmarks...");

    for bench in BENCHES {
        println!("\n>>> {}", bench);
        let start = Instant::now();

        let mut cmd = Command::new("cargo");
        cmd.env("CARGO_INCREMENTAL", "0")
            .args(["bench", "-p", "halo-atomics", "--bench", bench]);

        // Args for the test runner (Criterion) go after --
        cmd.arg("--");
        if quick {
            cmd.args(["--measurement-time", "0.5", "--sample-size", "10", "--noplot"]);
        }

        let status = cmd
            .status()
            .with_context(|| format!("failed to launch cargo bench for {}", bench))?;
        if !status.success() {
            bail!("benchmark {} failed", bench);
        }
        println!("Finished {} in {:.2?}", bench, start.elapsed());
    }

    Ok(())
}

fn run_stress(iters: usize, threads: usize, tracing: bool) -> Result<()> {
    if threads < 2 {
        bail!("stress runs need at least two threads, got {}", threads);
    }
    println!("Stressing with {} iterations on {} threads", iters, threads);
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.env("HALO_STRESS_ITERS", iters.to_string())
        .env("HALO_STRESS_THREADS", threads.to_string())
        .args(["test", "-p", "halo-atomics", "--release"]);
    if tracing {
        cmd.args(["--features", "tracing"]);
    }
    cmd.args(["--test", "reference_race", "--test", "atomic_stack"]);

    let status = cmd.status().context("failed to launch cargo test")?;
    if !status.success() {
        bail!("stress run failed");
    }
    println!("Stress run passed in {:.2?}", start.elapsed());
    Ok(())
}

/// Mean throughput per `group -> function`, from criterion's latest run.
type Results = BTreeMap<String, BTreeMap<String, f64>>;

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");
    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let mut results = Results::new();
    collect_results(criterion_dir, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(report_path)
        .with_context(|| format!("cannot create {}", report_path.display()))?;

    writeln!(file, "# Benchmark Report")?;
    for (group, functions) in &results {
        let best = functions.values().copied().fold(0.0, f64::max);
        writeln!(file, "\n## {}\n", group)?;
        writeln!(file, "| Implementation | Ops/s | vs best |")?;
        writeln!(file, "|---|---|---|")?;
        for (function, ops) in functions {
            let rel = if best > 0.0 { ops / best } else { 0.0 };
            writeln!(file, "| {} | {} | **{:.2}x** |", function, format_ops(*ops), rel)?;
        }
    }

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn format_ops(ops: f64) -> String {
    if ops > 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops > 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{:.0}", ops)
    }
}

fn read_json(path: &Path) -> Option<serde_json::Value> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

fn file_name(path: &Path) -> Option<String> {
    Some(path.file_name()?.to_str()?.to_owned())
}

fn collect_results(dir: &Path, results: &mut Results) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_results(&path, results)?;
            continue;
        }
        // Structure: .../group/function/new/estimates.json
        if file_name(&path).as_deref() != Some("estimates.json") {
            continue;
        }
        let Some(run_dir) = path.parent() else { continue };
        if file_name(run_dir).as_deref() != Some("new") {
            continue;
        }
        let Some(function_dir) = run_dir.parent() else { continue };
        let Some(group_dir) = function_dir.parent() else { continue };
        let (Some(function), Some(group)) = (file_name(function_dir), file_name(group_dir)) else {
            continue;
        };

        let elements = read_json(&run_dir.join("benchmark.json"))
            .and_then(|json| json.get("throughput")?.get("Elements")?.as_f64())
            .unwrap_or(1.0);
        let Some(time_ns) = read_json(&path)
            .and_then(|json| json.get("mean")?.get("point_estimate")?.as_f64())
        else {
            continue;
        };
        if time_ns > 0.0 {
            results
                .entry(group)
                .or_default()
                .insert(function, elements * 1e9 / time_ns);
        }
    }
    Ok(())
}
