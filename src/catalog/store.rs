use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::core::dataset::{Dataset, DatasetDocument, Query, Reference};
use crate::parsing::{default_index_path, is_gzipped, load_coords_dataset, read_text, ParseError};
use crate::utils::validation::check_dataset_size;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read dataset: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse dataset: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Dataset is missing its '{0}' collection")]
    MissingCollection(&'static str),

    #[error("Duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Alignment {index} refers to unknown reference '{name}'")]
    UnknownReference { index: usize, name: String },

    #[error("Alignment {index} refers to unknown contig '{name}'")]
    UnknownQuery { index: usize, name: String },

    #[error("Alignment {index} lies outside {name}: {detail}")]
    AlignmentOutOfRange {
        index: usize,
        name: String,
        detail: String,
    },

    #[error("{0}")]
    TooLarge(String),

    #[error(transparent)]
    Coords(#[from] ParseError),
}

/// The immutable original dataset with lookup indexes.
///
/// Never mutated after construction; reloading means building a new store.
#[derive(Debug, Clone)]
pub struct DataStore {
    dataset: Arc<Dataset>,

    /// Index: reference name -> index in `dataset.references`
    reference_index: HashMap<String, usize>,

    /// Index: query name -> index in `dataset.queries`
    query_index: HashMap<String, usize>,

    /// Index: reference name -> indices of queries with at least one alignment,
    /// in global query order
    queries_by_reference: HashMap<String, Vec<usize>>,
}

impl DataStore {
    /// Validate a dataset and index it
    ///
    /// # Errors
    ///
    /// Returns `LoadError::DuplicateName` for repeated reference or contig names,
    /// `LoadError::UnknownReference`/`UnknownQuery` when an alignment names an
    /// entity that is not present, `LoadError::AlignmentOutOfRange` when an
    /// interval is reversed or runs past the end of its reference or contig,
    /// or `LoadError::TooLarge` past the size limits.
    pub fn new(dataset: Dataset) -> Result<Self, LoadError> {
        let contigs = dataset.references.len().max(dataset.queries.len());
        if let Some(msg) = check_dataset_size(contigs, dataset.alignments.len()) {
            return Err(LoadError::TooLarge(msg));
        }

        let reference_index = index_names(dataset.references.iter().map(|r| &r.name), "reference")?;
        let query_index = index_names(dataset.queries.iter().map(|q| &q.name), "contig")?;

        let mut aligned: HashMap<&str, HashSet<usize>> = HashMap::new();
        for (index, alignment) in dataset.alignments.iter().enumerate() {
            let Some(&reference_idx) = reference_index.get(&alignment.reference) else {
                return Err(LoadError::UnknownReference {
                    index,
                    name: alignment.reference.clone(),
                });
            };
            let Some(&query_idx) = query_index.get(&alignment.query) else {
                return Err(LoadError::UnknownQuery {
                    index,
                    name: alignment.query.clone(),
                });
            };
            check_interval(
                index,
                &alignment.reference,
                (alignment.ref_start, alignment.ref_end),
                dataset.references[reference_idx].length,
            )?;
            check_interval(
                index,
                &alignment.query,
                (alignment.query_start, alignment.query_end),
                dataset.queries[query_idx].length,
            )?;
            aligned
                .entry(alignment.reference.as_str())
                .or_default()
                .insert(query_idx);
        }

        let queries_by_reference = aligned
            .into_iter()
            .map(|(reference, set)| {
                let mut indices: Vec<usize> = set.into_iter().collect();
                indices.sort_unstable();
                (reference.to_string(), indices)
            })
            .collect();

        info!(
            "Loaded dataset with {} references, {} contigs, {} alignments",
            dataset.references.len(),
            dataset.queries.len(),
            dataset.alignments.len()
        );

        Ok(Self {
            dataset: Arc::new(dataset),
            reference_index,
            query_index,
            queries_by_reference,
        })
    }

    /// Load a JSON dataset document from disk (`.json` or `.json.gz`)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the document is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, LoadError> {
        let content = if is_gzipped(path) {
            read_text(path)?
        } else {
            std::fs::read_to_string(path)?
        };
        Self::from_json(&content)
    }

    /// Open a dataset by file type: a JSON document, or a `.coords` file with
    /// its index. When `index` is `None` the index next to the coords file is
    /// used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or parsed, or the
    /// resulting dataset fails validation.
    pub fn open(path: &Path, index: Option<&Path>) -> Result<Self, LoadError> {
        let name = path.to_string_lossy().to_lowercase();
        if name.ends_with(".json") || name.ends_with(".json.gz") {
            return Self::load_from_file(path);
        }
        let index = index.map(Path::to_path_buf).or_else(|| default_index_path(path));
        info!("Loading {} (index: {:?})", path.display(), index.as_deref());
        Self::new(load_coords_dataset(path, index.as_deref())?)
    }

    /// Parse a JSON dataset document. All three collections must be present.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::MissingCollection` before any indexing happens when a
    /// collection is absent, or any error from [`DataStore::new`].
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let doc: DatasetDocument = serde_json::from_str(json)?;
        let references = doc.references.ok_or(LoadError::MissingCollection("references"))?;
        let queries = doc.queries.ok_or(LoadError::MissingCollection("queries"))?;
        let alignments = doc.alignments.ok_or(LoadError::MissingCollection("alignments"))?;
        Self::new(Dataset::new(references, queries, alignments))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Shared handle to the original dataset
    pub fn shared(&self) -> Arc<Dataset> {
        Arc::clone(&self.dataset)
    }

    pub fn reference(&self, name: &str) -> Option<&Reference> {
        self.reference_index
            .get(name)
            .map(|&idx| &self.dataset.references[idx])
    }

    pub fn query(&self, name: &str) -> Option<&Query> {
        self.query_index
            .get(name)
            .map(|&idx| &self.dataset.queries[idx])
    }

    pub fn has_reference(&self, name: &str) -> bool {
        self.reference_index.contains_key(name)
    }

    /// Contigs with at least one alignment to `reference`, in global query order
    pub fn queries_for_reference(&self, reference: &str) -> Vec<&Query> {
        self.queries_by_reference
            .get(reference)
            .map(|indices| indices.iter().map(|&idx| &self.dataset.queries[idx]).collect())
            .unwrap_or_default()
    }

    pub fn references(&self) -> &[Reference] {
        &self.dataset.references
    }
}

/// Require `start <= end <= length` for one side of an alignment
fn check_interval(
    index: usize,
    name: &str,
    (start, end): (u64, u64),
    length: u64,
) -> Result<(), LoadError> {
    let detail = if start > end {
        format!("start {start} is after end {end}")
    } else if end > length {
        format!("end {end} is past length {length}")
    } else {
        return Ok(());
    };
    Err(LoadError::AlignmentOutOfRange {
        index,
        name: name.to_string(),
        detail,
    })
}

fn index_names<'a>(
    names: impl Iterator<Item = &'a String>,
    kind: &'static str,
) -> Result<HashMap<String, usize>, LoadError> {
    let mut index = HashMap::new();
    for (idx, name) in names.enumerate() {
        if index.insert(name.clone(), idx).is_some() {
            return Err(LoadError::DuplicateName {
                kind,
                name: name.clone(),
            });
        }
    }
    Ok(index)
}
