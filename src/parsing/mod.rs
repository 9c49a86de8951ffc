//! Readers for the alignment-preparation outputs.
//!
//! This module provides parsers for:
//!
//! - **`.coords` files**: alignment coordinates grouped into `!contig!tag` sections
//! - **`.coords.idx` files**: reference and contig lengths, orientation and
//!   per-tag alignment counts
//!
//! Both may be gzipped. Together they produce the original [`Dataset`]; without
//! an index, lengths are estimated from the largest coordinate seen.
//!
//! ## Example
//!
//! ```rust,no_run
//! use contig_scaffolder::parsing::load_coords_dataset;
//! use std::path::Path;
//!
//! let dataset = load_coords_dataset(
//!     Path::new("asm_vs_ref.coords"),
//!     Some(Path::new("asm_vs_ref.coords.idx")),
//! )
//! .unwrap();
//! println!("{} alignments", dataset.alignments.len());
//! ```
//!
//! ## Index columns
//!
//! | Section | Columns |
//! |---------|---------|
//! | `#ref` | ref, ref_length, matching_queries (`~`-separated) |
//! | `#query` | query, query_length, orientation, unique, unique_short, repetitive, matching_refs |

pub mod coords;
pub mod index;

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::dataset::{Dataset, Query, Reference};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid coordinate file format: {0}")]
    InvalidFormat(String),

    #[error("{0}")]
    TooManyAlignments(String),

    #[error("{0}")]
    TooManyContigs(String),
}

pub(crate) fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Read a whole text file, decompressing `.gz` transparently
pub(crate) fn read_text(path: &Path) -> Result<String, ParseError> {
    let file = std::fs::File::open(path)?;
    let mut text = String::new();
    if is_gzipped(path) {
        MultiGzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        std::io::BufReader::new(file).read_to_string(&mut text)?;
    }
    Ok(text)
}

/// Index file next to `coords`, if one exists (`x.coords.idx` for `x.coords`
/// or `x.coords.gz`)
pub fn default_index_path(coords: &Path) -> Option<PathBuf> {
    let path = coords.to_string_lossy();
    let mut candidates = vec![PathBuf::from(format!("{path}.idx"))];
    if let Some(stem) = path.strip_suffix(".gz") {
        candidates.push(PathBuf::from(format!("{stem}.idx")));
        candidates.push(PathBuf::from(format!("{stem}.idx.gz")));
    }
    candidates.into_iter().find(|p| p.is_file())
}

/// Build a dataset from a `.coords` file and an optional `.coords.idx`
///
/// # Errors
///
/// Returns any `ParseError` from either file.
pub fn load_coords_dataset(coords: &Path, index: Option<&Path>) -> Result<Dataset, ParseError> {
    let parsed = coords::parse_coords_file(coords)?;

    let (references, queries) = match index {
        Some(index_path) => {
            let idx = index::parse_index_file(index_path)?;
            debug!(
                "Index {} lists {} references and {} contigs",
                index_path.display(),
                idx.references.len(),
                idx.queries.len()
            );
            let references = idx
                .references
                .into_iter()
                .map(|r| Reference::new(r.name, r.length))
                .collect();
            let queries = idx
                .queries
                .into_iter()
                .map(|q| Query::new(q.name, q.length).with_orientation(q.orientation))
                .collect();
            (references, queries)
        }
        None => {
            warn!(
                "No index for {}; estimating lengths from alignment coordinates",
                coords.display()
            );
            let references = parsed
                .references
                .iter()
                .map(|(name, end)| Reference::new(name.clone(), *end))
                .collect();
            let queries = parsed
                .queries
                .iter()
                .map(|(name, end)| Query::new(name.clone(), *end))
                .collect();
            (references, queries)
        }
    };

    Ok(Dataset::new(references, queries, parsed.alignments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_with_and_without_index() {
        let dir = tempfile::tempdir().unwrap();
        let coords = dir.path().join("asm.coords");
        std::fs::write(&coords, "!ctg1!unique\n0,500,0,500,chr1,+,+,False,99.0\n").unwrap();

        let estimated = load_coords_dataset(&coords, None).unwrap();
        assert_eq!(estimated.references[0].length, 500);
        assert_eq!(estimated.queries[0].length, 500);
        assert!(default_index_path(&coords).is_none());

        let idx = dir.path().join("asm.coords.idx");
        std::fs::write(
            &idx,
            "#ref\nref,ref_length,matching_queries\nchr1,10000,ctg1\n#query\nquery,query_length,orientation\nctg1,800,-\n",
        )
        .unwrap();
        assert_eq!(default_index_path(&coords), Some(idx.clone()));

        let indexed = load_coords_dataset(&coords, Some(&idx)).unwrap();
        assert_eq!(indexed.references[0].length, 10_000);
        assert_eq!(indexed.queries[0].length, 800);
        assert_eq!(indexed.queries[0].orientation, crate::core::types::Orientation::Reverse);
    }

    #[test]
    fn test_reads_gzipped_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asm.coords.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder
            .write_all(b"!ctg1!repetitive\n10,20,0,10,chr1\n")
            .unwrap();
        encoder.finish().unwrap();

        let dataset = load_coords_dataset(&path, None).unwrap();
        assert_eq!(dataset.alignments.len(), 1);
        assert_eq!(dataset.alignments[0].tag, crate::core::types::AlignmentTag::Repetitive);
    }
}
