//! # contig-scaffolder
//!
//! A library for curating reference-guided scaffolds from contig-to-reference
//! alignments.
//!
//! After an assembly is aligned against a related reference genome, each
//! reference chromosome is looked at in turn: contigs are inverted where they
//! align backwards, broken where they are chimeric, and bundled into ordered
//! chromosome groups that the downstream scaffolder turns into finished
//! sequences.
//!
//! `contig-scaffolder` keeps the loaded alignments immutable and records every
//! decision as an edit in an isolated, undoable workspace per reference. The
//! drawable state of a reference is always derived fresh from the original
//! data plus those edits.
//!
//! ## Features
//!
//! - **Non-destructive edits**: inversions and breaks replayed onto the original alignments
//! - **Per-reference workspaces**: bounded undo, batched updates, unsaved-change tracking
//! - **Filtering**: by contig size and unique-alignment ratio, with a display cap
//!   that never hides grouped or edited contigs
//! - **Layout**: stacked query axis, mirrored reference axis, tick placement
//! - **Exports**: session files, a scaffolding document and a CSV change log
//!
//! ## Example
//!
//! ```rust,no_run
//! use contig_scaffolder::catalog::store::DataStore;
//! use contig_scaffolder::core::modification::Modification;
//! use contig_scaffolder::session::CurationSession;
//! use std::path::Path;
//!
//! let store = DataStore::open(Path::new("asm_vs_ref.coords"), None).unwrap();
//! let mut session = CurationSession::new(store);
//!
//! session
//!     .manager_mut()
//!     .add_modification("chr1", Modification::invert("ctg12"))
//!     .unwrap();
//!
//! let frame = session.frame(Some("chr1")).unwrap();
//! for contig in &frame.layout.contigs {
//!     println!("{} at {}", contig.name, contig.offset);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: The immutable loaded dataset
//! - [`core`]: Data types for references, contigs, alignments and edits
//! - [`engine`]: Modification replay, filtering and layout
//! - [`workspace`]: Per-reference editable state and undo
//! - [`view`]: Interaction mode, camera and display settings
//! - [`export`]: Session, scaffolding and change-log documents
//! - [`parsing`]: Readers for `.coords` and `.coords.idx` files
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: JSON API for an interactive renderer

pub mod catalog;
pub mod cli;
pub mod core;
pub mod engine;
pub mod export;
pub mod parsing;
pub mod session;
pub mod utils;
pub mod view;
pub mod web;
pub mod workspace;

// Re-export commonly used types for convenience
pub use catalog::store::DataStore;
pub use core::dataset::{Alignment, Dataset, Query, Reference};
pub use core::modification::Modification;
pub use core::types::*;
pub use engine::frame::Frame;
pub use session::CurationSession;
pub use workspace::manager::WorkspaceManager;
