use std::path::PathBuf;

use clap::Args;

use crate::cli::{open_session, DatasetArgs, OutputFormat};
use crate::engine::frame::Frame;
use crate::engine::layout::{format_bp, Viewport};
use crate::engine::visibility::VisibilityStatus;

#[derive(Args)]
pub struct FrameArgs {
    #[command(flatten)]
    pub input: DatasetArgs,

    /// Reference to lay out (default: the session's active reference, else the first)
    #[arg(short, long)]
    pub reference: Option<String>,

    /// Session providing edits and display settings
    #[arg(short, long)]
    pub session: Option<PathBuf>,

    /// Hide contigs shorter than this (bp)
    #[arg(long)]
    pub min_contig_size: Option<u64>,

    /// Minimum fraction of a contig covered by unique alignments
    #[arg(long)]
    pub min_unique_ratio: Option<f64>,

    /// Maximum number of contigs to draw
    #[arg(long)]
    pub cap: Option<usize>,

    /// Viewport width in pixels
    #[arg(long)]
    pub width: Option<f64>,

    /// Viewport height in pixels
    #[arg(long)]
    pub height: Option<f64>,

    /// Also list filtered contigs and their status
    #[arg(long)]
    pub all: bool,
}

pub fn run(args: FrameArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let mut session = open_session(&args.input, args.session.as_deref())?;

    let mut settings = session.view_settings();
    if let Some(size) = args.min_contig_size {
        settings.visibility.min_contig_size = size;
    }
    if let Some(ratio) = args.min_unique_ratio {
        settings.visibility.min_unique_ratio = ratio;
    }
    if let Some(cap) = args.cap {
        settings.visibility.display_cap = cap;
    }
    settings.viewport = Viewport {
        width: args.width.unwrap_or(settings.viewport.width),
        height: args.height.unwrap_or(settings.viewport.height),
    };
    session.apply_settings(settings);

    let frame = session.frame(args.reference.as_deref())?;

    if verbose {
        eprintln!(
            "{}: {} of {} contigs allowed, {} segments",
            frame.reference,
            frame.allowed.len(),
            frame.contigs.len(),
            frame.segments.len()
        );
    }

    match format {
        OutputFormat::Text => print_text_frame(&frame, args.all),
        OutputFormat::Json => print_json_frame(&frame)?,
        OutputFormat::Tsv => print_tsv_frame(&frame, args.all),
    }

    Ok(())
}

fn print_text_frame(frame: &Frame, all: bool) {
    println!(
        "Reference: {} ({})",
        frame.reference,
        format_bp(frame.layout.reference_length)
    );
    println!("{}", "=".repeat(60));
    println!(
        "Drawing {} of {} contigs ({} segments)",
        frame.allowed.len(),
        frame.contigs.len(),
        frame.segments.len()
    );
    if frame.cap_applied {
        println!("Display cap removed {} contigs", frame.capped_count);
    }

    println!("\nQuery axis:");
    for placed in &frame.layout.contigs {
        let mut flags = Vec::new();
        if placed.inverted {
            flags.push("inverted");
        }
        if placed.is_broken {
            flags.push("broken");
        }
        println!(
            "  {:<24} {:>10}  @ {:>12}  {:>6.2}%  {}",
            placed.name,
            format_bp(placed.length),
            placed.offset,
            placed.best_identity,
            flags.join(",")
        );
    }

    if all {
        let hidden: Vec<_> = frame
            .contigs
            .iter()
            .filter(|c| !frame.allowed.contains(&c.name))
            .collect();
        if !hidden.is_empty() {
            println!("\nNot drawn:");
            for contig in hidden {
                println!(
                    "  {:<24} {:>10}  ratio {:.3}  {}",
                    contig.name,
                    format_bp(contig.length),
                    contig.unique_ratio,
                    status_label(contig.status)
                );
            }
        }
    }

    if !frame.rejections.is_empty() {
        println!("\nSkipped modifications:");
        for rejection in &frame.rejections {
            println!("  #{}: {}", rejection.index, rejection.error);
        }
    }
}

fn print_json_frame(frame: &Frame) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(frame)?);
    Ok(())
}

fn print_tsv_frame(frame: &Frame, all: bool) {
    println!("contig\tlength\tunique_ratio\tstatus\toffset\tgap\tinverted\tbroken");
    for contig in &frame.contigs {
        let placed = frame.layout.contig(&contig.name);
        if placed.is_none() && !all {
            continue;
        }
        println!(
            "{}\t{}\t{:.4}\t{}\t{}\t{}\t{}\t{}",
            contig.name,
            contig.length,
            contig.unique_ratio,
            status_label(contig.status),
            placed.map_or(String::new(), |p| p.offset.to_string()),
            placed.map_or(String::new(), |p| p.gap.to_string()),
            placed.is_some_and(|p| p.inverted),
            placed.is_some_and(|p| p.is_broken),
        );
    }
}

fn status_label(status: VisibilityStatus) -> &'static str {
    match status {
        VisibilityStatus::Protected => "protected",
        VisibilityStatus::Passed => "passed",
        VisibilityStatus::GroupHidden => "group_hidden",
        VisibilityStatus::Uninformative => "uninformative",
        VisibilityStatus::FilteredBySize => "too_small",
        VisibilityStatus::FilteredByRatio => "low_unique_ratio",
        VisibilityStatus::Capped => "capped",
    }
}
