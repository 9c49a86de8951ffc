//! Command-line interface for contig-scaffolder.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **info**: Summarize a dataset (counts, total lengths, N50)
//! - **frame**: Filter and lay out one reference and print the result
//! - **edit**: Apply inversions, breaks, groups and undo steps to a session file
//! - **export**: Write the scaffolding document and change log from a session
//! - **serve**: Start the JSON API for an interactive renderer
//!
//! ## Usage
//!
//! ```text
//! # Summarize a coords file (the .coords.idx next to it is used automatically)
//! contig-scaffolder info asm_vs_ref.coords
//!
//! # Which contigs would be drawn for chr1?
//! contig-scaffolder frame asm_vs_ref.coords --reference chr1 --min-unique-ratio 0.1
//!
//! # Invert two contigs in one step and save the session
//! contig-scaffolder edit asm_vs_ref.coords --reference chr1 \
//!     --invert ctg12 --invert ctg40 --output session.json
//!
//! # Produce files for the downstream scaffolder
//! contig-scaffolder export asm_vs_ref.coords --session session.json \
//!     --scaffold scaffold.json --changelog changes.csv
//!
//! # Start the API
//! contig-scaffolder serve asm_vs_ref.coords --port 8080 --open
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use crate::catalog::store::DataStore;
use crate::export::session::SessionDocument;
use crate::session::CurationSession;

pub mod edit;
pub mod export;
pub mod frame;
pub mod info;

#[derive(Parser)]
#[command(name = "contig-scaffolder")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Curate reference-guided scaffolding decisions from contig alignments")]
#[command(
    long_about = "contig-scaffolder loads alignments of assembled contigs against reference chromosomes and lets you curate a scaffold per reference.\n\nIt keeps an isolated, undoable workspace for every reference and provides:\n- Inversions and breaks applied to alignment coordinates\n- Chromosome groups and contig ordering\n- Filtering by size and unique-alignment ratio\n- Layout geometry for a renderer, and export for the downstream scaffolder"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a dataset
    Info(info::InfoArgs),

    /// Compute the visible contigs and layout for one reference
    Frame(frame::FrameArgs),

    /// Apply edits to a session
    Edit(edit::EditArgs),

    /// Export scaffolding document and change log
    Export(export::ExportArgs),

    /// Start the web server
    Serve(ServeArgs),
}

/// Dataset location shared by every command
#[derive(clap::Args, Clone, Debug)]
pub struct DatasetArgs {
    /// Alignment dataset: a .coords file (optionally .gz) or a JSON document
    #[arg(required = true)]
    pub dataset: PathBuf,

    /// Index for a .coords file (default: <dataset>.idx when present)
    #[arg(long)]
    pub index: Option<PathBuf>,
}

impl DatasetArgs {
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be loaded.
    pub fn load(&self) -> anyhow::Result<DataStore> {
        Ok(DataStore::open(&self.dataset, self.index.as_deref())?)
    }
}

#[derive(clap::Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub input: DatasetArgs,

    /// Session to resume
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Load the dataset and, if given, restore a session on top of it
///
/// # Errors
///
/// Returns an error if either file cannot be loaded or the session does not
/// match the dataset.
pub fn open_session(input: &DatasetArgs, session: Option<&Path>) -> anyhow::Result<CurationSession> {
    let mut curation = CurationSession::new(input.load()?);
    if let Some(path) = session {
        let document = SessionDocument::load(path)?;
        curation.restore_session(document)?;
        info!("Resumed session from {}", path.display());
    }
    Ok(curation)
}
