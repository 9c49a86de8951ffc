use clap::Args;

use crate::catalog::store::DataStore;
use crate::cli::{DatasetArgs, OutputFormat};
use crate::core::stats::DatasetSummary;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub input: DatasetArgs,
}

pub fn run(args: InfoArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let store = args.input.load()?;
    let summary = DatasetSummary::from_dataset(store.dataset());

    if verbose {
        eprintln!(
            "Loaded {} ({} alignments)",
            args.input.dataset.display(),
            summary.alignment_count
        );
    }

    match format {
        OutputFormat::Text => print_text_summary(&store, &summary),
        OutputFormat::Json => print_json_summary(&store, &summary)?,
        OutputFormat::Tsv => print_tsv_summary(&store),
    }

    Ok(())
}

fn print_text_summary(store: &DataStore, summary: &DatasetSummary) {
    println!("Dataset Summary");
    println!("{}", "=".repeat(60));

    println!("\nReferences: {}", summary.reference_count);
    println!("  Total length: {} bp", summary.reference_total_length);
    println!("  N50: {} bp", summary.reference_n50);

    println!("\nContigs: {}", summary.query_count);
    println!("  Total length: {} bp", summary.query_total_length);
    println!("  N50: {} bp", summary.query_n50);

    println!("\nAlignments: {}", summary.alignment_count);
    println!("  unique: {}", summary.unique_alignments);
    println!("  unique_short: {}", summary.unique_short_alignments);
    println!("  repetitive: {}", summary.repetitive_alignments);

    println!("\nContigs per reference:");
    for reference in store.references() {
        println!(
            "  {:<20} {:>12} bp  {:>6} contigs",
            reference.name,
            reference.length,
            store.queries_for_reference(&reference.name).len()
        );
    }
}

fn print_json_summary(store: &DataStore, summary: &DatasetSummary) -> anyhow::Result<()> {
    let references: Vec<serde_json::Value> = store
        .references()
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.name,
                "length": r.length,
                "contig_count": store.queries_for_reference(&r.name).len(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "summary": summary,
        "references": references,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_summary(store: &DataStore) {
    println!("reference\tlength\tcontigs");
    for reference in store.references() {
        println!(
            "{}\t{}\t{}",
            reference.name,
            reference.length,
            store.queries_for_reference(&reference.name).len()
        );
    }
}
