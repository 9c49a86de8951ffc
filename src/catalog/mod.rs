//! Storage for the original, never-edited dataset.
//!
//! [`store::DataStore`] validates a dataset once at load time (unique names,
//! alignments pointing at known references and contigs, size limits) and
//! indexes it by name. Every derived view starts from this copy.
//!
//! ## Example
//!
//! ```rust,no_run
//! use contig_scaffolder::catalog::store::DataStore;
//! use std::path::Path;
//!
//! // A .coords file; the .coords.idx next to it is picked up automatically
//! let store = DataStore::open(Path::new("asm_vs_ref.coords"), None).unwrap();
//!
//! for reference in store.references() {
//!     let contigs = store.queries_for_reference(&reference.name);
//!     println!("{}: {} contigs", reference.name, contigs.len());
//! }
//! ```
//!
//! JSON documents with `references`, `queries` and `alignments` arrays are
//! accepted too:
//!
//! ```rust,no_run
//! use contig_scaffolder::catalog::store::DataStore;
//! use std::path::Path;
//!
//! let store = DataStore::open(Path::new("dataset.json"), None).unwrap();
//! ```

pub mod store;
