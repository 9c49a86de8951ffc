use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use tracing::info;

use crate::cli::{open_session, DatasetArgs, OutputFormat};
use crate::core::modification::Modification;
use crate::session::CurationSession;
use crate::workspace::manager::{SwitchDecision, SwitchOutcome};

#[derive(Args)]
pub struct EditArgs {
    #[command(flatten)]
    pub input: DatasetArgs,

    /// Reference whose workspace is edited
    #[arg(short, long, required = true)]
    pub reference: String,

    /// Session to start from
    #[arg(short, long)]
    pub session: Option<PathBuf>,

    /// Where to write the updated session (default: overwrite --session)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Undo this many steps before applying any edit
    #[arg(long, default_value = "0")]
    pub undo: usize,

    /// Invert a contig (repeatable)
    #[arg(long, value_name = "CONTIG")]
    pub invert: Vec<String>,

    /// Break a contig at a position (repeatable)
    #[arg(long = "break", value_name = "CONTIG:POS", value_parser = parse_break)]
    pub breaks: Vec<(String, u64)>,

    /// Create a chromosome group (repeatable)
    #[arg(long, value_name = "NAME=CONTIG,CONTIG", value_parser = parse_group)]
    pub group: Vec<(String, Vec<String>)>,

    /// Delete a chromosome group (repeatable)
    #[arg(long, value_name = "NAME")]
    pub ungroup: Vec<String>,

    /// Hide a chromosome group's contigs (repeatable)
    #[arg(long, value_name = "NAME")]
    pub hide_group: Vec<String>,

    /// Mark a contig as uninformative (repeatable)
    #[arg(long, value_name = "CONTIG")]
    pub uninformative: Vec<String>,
}

/// Parse `CONTIG:POS`; the last colon separates the position
fn parse_break(value: &str) -> Result<(String, u64), String> {
    let (contig, position) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected CONTIG:POS, got '{value}'"))?;
    if contig.is_empty() {
        return Err(format!("missing contig name in '{value}'"));
    }
    let position = position
        .parse::<u64>()
        .map_err(|_| format!("invalid break position '{position}'"))?;
    Ok((contig.to_string(), position))
}

fn parse_group(value: &str) -> Result<(String, Vec<String>), String> {
    let (name, contigs) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=CONTIG,CONTIG, got '{value}'"))?;
    let contigs: Vec<String> = contigs
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Ok((name.to_string(), contigs))
}

/// What an edit run changed
#[derive(Debug, Default, serde::Serialize)]
struct EditSummary {
    reference: String,
    undone: usize,
    modifications_added: usize,
    groups_created: usize,
    groups_deleted: usize,
    groups_hidden: usize,
    uninformative_added: usize,
    total_modifications: usize,
    output: String,
}

pub fn run(args: EditArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let Some(output) = args.output.clone().or_else(|| args.session.clone()) else {
        bail!("Nowhere to write the session: pass --output or --session");
    };

    let mut session = open_session(&args.input, args.session.as_deref())?;
    let summary = apply_edits(&mut session, &args, output.display().to_string())?;

    session.export_session().save(&output)?;
    info!("Wrote session to {}", output.display());

    if verbose {
        eprintln!(
            "{} now has {} recorded modifications",
            summary.reference, summary.total_modifications
        );
    }

    match format {
        OutputFormat::Text => print_text_summary(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Tsv => print_tsv_summary(&summary),
    }

    Ok(())
}

fn apply_edits(
    session: &mut CurationSession,
    args: &EditArgs,
    output: String,
) -> anyhow::Result<EditSummary> {
    let reference = args.reference.as_str();
    let mut summary = EditSummary {
        reference: reference.to_string(),
        output,
        ..EditSummary::default()
    };

    if let SwitchOutcome::DecisionRequired(_) = session.select(reference)? {
        // Edits to the previous reference travel with the written session
        session.resolve_switch(SwitchDecision::Save)?;
    }

    let manager = session.manager_mut();

    for _ in 0..args.undo {
        if !manager.undo(reference)? {
            break;
        }
        summary.undone += 1;
    }

    let modifications: Vec<Modification> = args
        .invert
        .iter()
        .map(Modification::invert)
        .chain(
            args.breaks
                .iter()
                .map(|(contig, position)| Modification::split(contig, *position)),
        )
        .collect();
    if !modifications.is_empty() {
        summary.modifications_added = modifications.len();
        manager.add_modifications(reference, modifications)?;
    }

    for name in &args.ungroup {
        manager.delete_group(reference, name)?;
        summary.groups_deleted += 1;
    }
    for (name, contigs) in &args.group {
        manager.create_group(reference, name, contigs.clone())?;
        summary.groups_created += 1;
    }
    for name in &args.hide_group {
        manager.set_group_visible(reference, name, false)?;
        summary.groups_hidden += 1;
    }

    if !args.uninformative.is_empty() {
        let mut marked = manager.workspace(reference)?.uninformative_contigs.clone();
        let before = marked.len();
        marked.extend(args.uninformative.iter().cloned());
        summary.uninformative_added = marked.len() - before;
        manager.set_uninformative(reference, marked)?;
    }

    manager.mark_saved(reference)?;
    summary.total_modifications = manager.workspace(reference)?.modifications.len();
    Ok(summary)
}

fn print_text_summary(summary: &EditSummary) {
    println!("Workspace: {}", summary.reference);
    if summary.undone > 0 {
        println!("  Undone steps: {}", summary.undone);
    }
    println!("  Modifications added: {}", summary.modifications_added);
    println!("  Groups created: {}", summary.groups_created);
    if summary.groups_deleted > 0 {
        println!("  Groups deleted: {}", summary.groups_deleted);
    }
    if summary.groups_hidden > 0 {
        println!("  Groups hidden: {}", summary.groups_hidden);
    }
    if summary.uninformative_added > 0 {
        println!("  Marked uninformative: {}", summary.uninformative_added);
    }
    println!("  Total modifications: {}", summary.total_modifications);
    println!("\nSession written to {}", summary.output);
}

fn print_tsv_summary(summary: &EditSummary) {
    println!("reference\tundone\tadded\tgroups_created\ttotal\toutput");
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        summary.reference,
        summary.undone,
        summary.modifications_added,
        summary.groups_created,
        summary.total_modifications,
        summary.output
    );
}
