use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::cli::{open_session, DatasetArgs, OutputFormat};
use crate::export::changelog::{ChangeLog, CHANGELOG_COLUMNS};
use crate::export::scaffold::ScaffoldDocument;

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: DatasetArgs,

    /// Session holding the curated workspaces
    #[arg(short, long, required = true)]
    pub session: PathBuf,

    /// Write the scaffolding document (JSON) here
    #[arg(long)]
    pub scaffold: Option<PathBuf>,

    /// Write the change log (CSV) here
    #[arg(long)]
    pub changelog: Option<PathBuf>,
}

pub fn run(args: ExportArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let session = open_session(&args.input, Some(&args.session))?;
    let scaffold = session.scaffold();
    let changelog = session.changelog();

    if verbose {
        eprintln!(
            "{} modifications, {} chromosome groups, {} change log rows",
            scaffold.modifications.len(),
            scaffold.chromosome_groups.len(),
            changelog.rows.len()
        );
    }

    if let Some(path) = &args.scaffold {
        std::fs::write(path, scaffold.to_json()?)?;
        info!("Wrote scaffolding document to {}", path.display());
    }
    if let Some(path) = &args.changelog {
        changelog.save(path)?;
        info!("Wrote change log to {}", path.display());
    }

    // Without any output file the scaffolding document goes to stdout
    if args.scaffold.is_none() && args.changelog.is_none() {
        match format {
            OutputFormat::Text => print_text_export(&scaffold, &changelog),
            OutputFormat::Json => println!("{}", scaffold.to_json()?),
            OutputFormat::Tsv => print_tsv_changelog(&changelog),
        }
    } else if let OutputFormat::Text = format {
        for path in args.scaffold.iter().chain(args.changelog.iter()) {
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn print_text_export(scaffold: &ScaffoldDocument, changelog: &ChangeLog) {
    println!("Scaffolding Export");
    println!("{}", "=".repeat(60));
    println!("Modifications: {}", scaffold.modifications.len());
    println!("Chromosome groups: {}", scaffold.chromosome_groups.len());
    for (name, group) in &scaffold.chromosome_groups {
        println!(
            "  {:<16} on {:<12} {:>4} contigs{}",
            name,
            group.created_on,
            group.contigs.len(),
            if group.visible { "" } else { " (hidden)" }
        );
    }

    if !changelog.rows.is_empty() {
        println!("\nChanges:");
        for row in &changelog.rows {
            println!(
                "  {:>4}  {:<12} {:<8} {}",
                row.seq, row.reference, row.kind, row.contig
            );
        }
    }
}

fn print_tsv_changelog(changelog: &ChangeLog) {
    println!("{}", CHANGELOG_COLUMNS.join("\t"));
    for row in &changelog.rows {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.seq,
            row.reference,
            row.kind,
            row.contig,
            row.length.map_or(String::new(), |l| l.to_string()),
            row.position.map_or(String::new(), |p| p.to_string()),
            row.timestamp.to_rfc3339(),
            row.note
        );
    }
}
