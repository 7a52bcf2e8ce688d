//! Extract command - show what the matchers find in one document.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use docfill_core::models::document::DocumentType;
use docfill_core::pipeline::{BackfillEngine, DocumentExtraction};

use super::{OcrArg, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF, image, spreadsheet, CSV or text)
    #[arg(required = true)]
    input: PathBuf,

    /// Document type (e.g. bill_of_lading, packing_list, pi)
    #[arg(short = 't', long)]
    doc_type: String,

    /// OCR policy (default: from config)
    #[arg(long, value_enum)]
    ocr: Option<OcrArg>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
    /// The acquired text itself
    Raw,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let Some(doc_type) = DocumentType::from_str(&args.doc_type) else {
        let known: Vec<&str> = DocumentType::ALL.iter().map(|t| t.as_str()).collect();
        anyhow::bail!(
            "Unknown document type: {} (expected one of {})",
            args.doc_type,
            known.join(", ")
        );
    };

    info!("Extracting {} as {}", args.input.display(), doc_type);

    let engine = BackfillEngine::from_config(&config);
    let policy = args.ocr.map(Into::into).unwrap_or(config.acquisition.ocr_policy);
    let extraction = engine.extract(&args.input, doc_type, policy);

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&extraction)?,
        OutputFormat::Text => format_text(&extraction),
        OutputFormat::Raw => extraction.text.clone(),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(extraction: &DocumentExtraction) -> String {
    let mut out = String::new();

    out.push_str(&format!("File:     {}\n", extraction.source_path));
    out.push_str(&format!("Type:     {}\n", extraction.document_type));
    out.push_str(&format!(
        "Method:   {} ({} chars)\n",
        extraction.method, extraction.chars
    ));
    for error in &extraction.errors {
        out.push_str(&format!("Warning:  {}\n", error));
    }

    let evidence = &extraction.evidence;
    if !evidence.fields.is_empty() {
        out.push_str("\nFields:\n");
        for (field, candidates) in &evidence.fields {
            for candidate in candidates {
                out.push_str(&format!(
                    "  {:<26} {:<24} [{}] {}\n",
                    field.as_str(),
                    candidate.value,
                    candidate.provenance.matcher,
                    candidate.context.replace('\n', " / ")
                ));
            }
        }
    }

    if !evidence.line_items.is_empty() {
        out.push_str("\nLine items:\n");
        for row in &evidence.line_items {
            let item = &row.value;
            out.push_str(&format!(
                "  {:<16} qty {:>8}  unit {:>10}  total {:>12}\n",
                item.sku.as_deref().unwrap_or("-"),
                item.units_ordered,
                item.unit_cost.map(|d| d.to_string()).unwrap_or_default(),
                item.total_cost.map(|d| d.to_string()).unwrap_or_default()
            ));
        }
    }

    if !evidence.shipping_marks.is_empty() {
        out.push_str("\nShipping marks:\n");
        for mark in &evidence.shipping_marks {
            let m = &mark.value;
            out.push_str(&format!(
                "  {:<16} {} ctns x {} pcs\n",
                m.sku,
                m.cartons.map(|n| n.to_string()).unwrap_or_else(|| "?".into()),
                m.units_per_carton.map(|n| n.to_string()).unwrap_or_else(|| "?".into())
            ));
        }
    }

    if !evidence.po_references.is_empty() {
        let refs: Vec<&str> = evidence.po_references.iter().map(String::as_str).collect();
        out.push_str(&format!("\nPO references: {}\n", refs.join(", ")));
    }

    out
}
