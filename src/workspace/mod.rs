//! Per-reference editable state.
//!
//! Each reference chromosome gets its own [`state::Workspace`] holding the
//! contig order, recorded modifications, chromosome groups, uninformative set
//! and selection, plus a bounded stack of undo snapshots. Workspaces are only
//! changed through [`manager::WorkspaceManager`].
//!
//! ## Lifecycle
//!
//! | Event | Effect |
//! |-------|--------|
//! | first access to a reference | workspace created with the default contig order |
//! | any edit | snapshot pushed, workspace marked unsaved |
//! | undo | last snapshot restored (all five fields at once) |
//! | reset all / reload | every workspace dropped |
//!
//! ## Example
//!
//! ```rust
//! use contig_scaffolder::catalog::store::DataStore;
//! use contig_scaffolder::core::dataset::{Alignment, Dataset, Query, Reference};
//! use contig_scaffolder::core::modification::Modification;
//! use contig_scaffolder::workspace::manager::WorkspaceManager;
//!
//! let dataset = Dataset::new(
//!     vec![Reference::new("chr1", 1_000)],
//!     vec![Query::new("q1", 100)],
//!     vec![Alignment::new("chr1", "q1", (0, 100), (0, 100))],
//! );
//! let mut manager = WorkspaceManager::new(DataStore::new(dataset).unwrap());
//!
//! manager.add_modification("chr1", Modification::invert("q1")).unwrap();
//! assert!(manager.undo("chr1").unwrap());
//! assert!(manager.get("chr1").unwrap().modifications.is_empty());
//! ```

pub mod manager;
pub mod state;
