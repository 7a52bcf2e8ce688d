//! Run command - backfill the orders of an orders file.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use docfill_core::pipeline::{BackfillEngine, RunOptions};
use docfill_core::report::{MappingReport, PersistenceStatus};
use docfill_core::store::JsonFileStore;

use super::{OcrArg, load_config};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Orders file (JSON array of order snapshots)
    #[arg(required = true)]
    orders: PathBuf,

    /// Write decisions back to the orders file (default: dry run)
    #[arg(long)]
    apply: bool,

    /// Let OCR-sourced candidates influence writes
    #[arg(long)]
    allow_ocr_evidence: bool,

    /// OCR policy (default: from config)
    #[arg(long, value_enum)]
    ocr: Option<OcrArg>,

    /// Only process this order (repeatable)
    #[arg(long = "order", value_name = "ID")]
    order_ids: Vec<String>,

    /// Process at most this many orders
    #[arg(long)]
    limit: Option<usize>,

    /// Mapping report output path
    #[arg(short, long, default_value = "mapping-report.json")]
    report: PathBuf,

    /// Also write a CSV of applied values
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Scan this directory for files named after each order's PO number
    #[arg(long)]
    related_dir: Option<PathBuf>,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(dir) = &args.related_dir {
        if !dir.is_dir() {
            anyhow::bail!("Related-file directory not found: {}", dir.display());
        }
        config.related.root = Some(dir.clone());
    }

    if !args.orders.exists() {
        anyhow::bail!("Orders file not found: {}", args.orders.display());
    }

    let mut store = JsonFileStore::open(&args.orders)?;
    let engine = BackfillEngine::from_config(&config);
    let options = RunOptions {
        dry_run: !args.apply,
        allow_ocr_evidence: args.allow_ocr_evidence,
        ocr_policy: args.ocr.map(Into::into).unwrap_or(config.acquisition.ocr_policy),
        order_ids: args.order_ids.clone(),
        limit: args.limit,
    };

    info!(
        "Backfilling {} ({})",
        args.orders.display(),
        if options.dry_run { "dry run" } else { "apply" }
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} orders {msg}")?
            .progress_chars("=>-"),
    );

    let report = engine.run_with_progress(&mut store, &options, |_, total, order| {
        pb.set_length(total as u64);
        pb.set_message(order.order_id.clone());
        pb.inc(1);
    })?;

    pb.finish_and_clear();

    report.save(&args.report)?;
    debug!("Wrote mapping report to {}", args.report.display());

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &report)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_summary(&report);
    println!(
        "{} Report written to {} in {:?}",
        style("✓").green(),
        args.report.display(),
        start.elapsed()
    );

    Ok(())
}

fn write_summary(path: &Path, report: &MappingReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in report.summary_rows() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_summary(report: &MappingReport) {
    let counters = &report.counters;
    let mode = if report.dry_run {
        style("dry run").yellow()
    } else {
        style("applied").green()
    };

    println!();
    println!(
        "{} {} orders processed, {} touched ({})",
        style("ℹ").blue(),
        counters.orders_processed,
        counters.orders_touched,
        mode
    );

    for (field, count) in &counters.fields {
        println!("   {:<28} {}", field.as_str(), count);
    }
    for (field, count) in &counters.line_fields {
        println!("   {:<28} {}", format!("line.{}", field), count);
    }
    if counters.lines_created > 0 {
        println!("   {:<28} {}", "lines created", counters.lines_created);
    }

    if counters.persistence_failures > 0 {
        println!();
        println!("{}", style("Rejected writes:").red());
        for order in &report.orders {
            if let PersistenceStatus::Failed { error } = &order.persistence {
                println!("  - {}: {}", order.order_id, error);
            }
        }
    }
}
