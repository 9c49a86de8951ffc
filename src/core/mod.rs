//! Core data types for alignment curation.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`dataset::Reference`]: a chromosome or scaffold contigs were aligned against
//! - [`dataset::Query`]: an assembled contig, or a segment of one after a break
//! - [`dataset::Alignment`]: a matched region with coordinates on both sides
//! - [`modification::Modification`]: the closed set of edits (invert, break, reorder)
//! - [`types::Orientation`], [`types::AlignmentTag`]: strand and uniqueness classes
//! - [`stats::DatasetSummary`]: counts, total lengths and N50s
//!
//! ## Coordinates
//!
//! All coordinates are integer base-pair offsets with `start <= end`; the
//! strand of an alignment is carried separately in `aligned_orientation`.
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `ref_start`, `ref_end` | interval on the reference |
//! | `query_start`, `query_end` | interval on the contig, in its current orientation |
//! | `length` | aligned length (query-side span) |

pub mod dataset;
pub mod modification;
pub mod stats;
pub mod types;
