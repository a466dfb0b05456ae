//! regsearch CLI Module
//!
//! Command-line interface for running the model-selection pipeline.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::data::{load_csv, Dataset};
use crate::pipeline::{Pipeline, PipelineReport};
use crate::selection::CancelToken;
use crate::synthetic::LinearSpec;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "regsearch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Forward selection, k-NN and ridge sweeps ranked by held-out MSE")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline on a cleaned, all-numeric CSV file
    Run {
        /// Input CSV file with a header row
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the full JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the split/fold seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the held-out fraction
        #[arg(long)]
        test_size: Option<f64>,
    },

    /// Run the pipeline on synthetic sale-price data
    Demo {
        /// Number of rows to generate
        #[arg(short, long, default_value = "100")]
        rows: usize,

        /// Seed for data generation and the split
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Write the full JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    data_path: &Path,
    target: &str,
    config_path: Option<&Path>,
    output: Option<&Path>,
    seed: Option<u64>,
    test_size: Option<f64>,
) -> anyhow::Result<()> {
    section("Run");

    let mut config = match config_path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(fraction) = test_size {
        config = config.with_held_out_fraction(fraction);
    }

    step_run("Loading data");
    let start = Instant::now();
    let dataset = load_csv(data_path, target)?;
    step_done(&format!(
        "{} rows × {} predictors in {:?}",
        dataset.n_samples(),
        dataset.n_predictors(),
        start.elapsed()
    ));

    run_and_report(&dataset, config, output)
}

pub fn cmd_demo(rows: usize, seed: u64, output: Option<&Path>) -> anyhow::Result<()> {
    section("Demo");

    let spec = LinearSpec::housing();
    step_run("Generating data");
    let dataset = spec.generate(rows, seed)?.with_target_name("price");
    step_done(&format!(
        "{} rows, price ~ {}",
        dataset.n_samples(),
        spec.formula()?
    ));

    let config = PipelineConfig::default().with_seed(seed);
    run_and_report(&dataset, config, output)
}

pub fn cmd_config() -> anyhow::Result<()> {
    println!("{}", PipelineConfig::default().to_json()?);
    Ok(())
}

fn run_and_report(dataset: &Dataset, config: PipelineConfig, output: Option<&Path>) -> anyhow::Result<()> {
    step_run("Searching");
    let start = Instant::now();
    let report = Pipeline::new(config).run(dataset, &CancelToken::new())?;
    step_done(&format!("{:?}", start.elapsed()));

    print_report(&report);

    if let Some(path) = output {
        step_run(&format!("Saving → {}", path.display()));
        std::fs::write(path, report.to_json()?)?;
        step_done("");
    }

    println!();
    Ok(())
}

// ─── Report rendering ──────────────────────────────────────────────────────────

fn print_report(report: &PipelineReport) {
    println!();
    println!("  {:<12} {}", muted("Target"), report.target);
    println!("  {:<12} {} / {}", muted("Train/test"), report.n_train, report.n_test);
    println!("  {:<12} {}", muted("Fitter"), report.fitter);

    section("Forward selection");
    println!("  {:<6} {:<34} {:>8} {:>8}", muted("Round"), muted("Added"), muted("R²"), muted("Adj R²"));
    let chosen = report.forward.best.as_ref().map(|m| m.round);
    for step in report.forward.trajectory.steps() {
        let marker = if Some(step.round) == chosen { ok("◆") } else { dim(" ") };
        println!(
            "  {:<6} {:<34} {:>8.4} {:>8.4} {}",
            step.round, step.added, step.fit.r2, step.fit.adjusted_r2, marker
        );
        for failure in &step.failures {
            println!("         {}", format!("skipped {}", failure.candidate).red());
        }
    }
    if !report.forward.unfittable.is_empty() {
        println!("  {} {}", muted("unfittable"), report.forward.unfittable.join(", ").yellow());
    }

    if let Some(subsets) = &report.subsets {
        section("Fixed subsets");
        for e in &subsets.evaluations {
            println!("  {:<24} {:>14.4}", e.candidate.name, e.test_mse);
        }
        for failure in &subsets.failures {
            println!("  {:<24} {}", failure.candidate, "failed".red());
        }
    }

    if let Some(formula) = &report.sweep_formula {
        println!();
        println!("  {} {}", muted("sweep features"), formula.to_string().white());
    }

    if let Some(knn) = &report.neighbors {
        section("KNN");
        for row in knn.table.rows() {
            println!("  {:<6} {:>14.4}", format!("k={}", row.value), row.mse);
        }
    }

    if let Some(ridge) = &report.ridge {
        section("Ridge");
        if let Some((low, high)) = ridge.bracket {
            println!("  {:<16} [{}, {}]", muted("bracket"), low, high);
        }
        println!("  {:<16} {}", muted("refined points"), ridge.refined.len());
        if let (Some(best), Some(model)) = (&ridge.best, &ridge.model) {
            println!("  {:<16} {:.4}", muted("alpha"), best.value);
            println!("  {:<16} {:.4}", muted("cv mse"), best.mse);
            println!("  {:<16} {:.4}", muted("test mse"), model.test_mse);
        }
    }

    if let Some(ranking) = &report.ranking {
        section("Ranking");
        println!("  {:<4} {:<24} {:>14}", muted("#"), muted("Model"), muted("Held-out MSE"));
        for entry in ranking.entries() {
            println!("  {:<4} {:<24} {:>14.4}", entry.rank, entry.name, entry.mse);
        }
        if let Some(best) = ranking.recommended() {
            println!();
            println!("  {} {} {} {:.4}", ok("best"), best.name.white().bold(), muted("mse:"), best.mse);
        }
    }

    if report.cancelled {
        println!();
        println!("  {}", "search cancelled; results are partial".yellow());
    }
}
