use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::dataset::{Alignment, Dataset, Query};
use crate::core::modification::{Modification, ModificationError, ModificationRecord};
use crate::core::types::{Orientation, QuerySpan};
use crate::utils::validation::compute_fingerprint;

/// Contig name -> explicit display position
pub type ContigOrder = BTreeMap<String, usize>;

/// Number of derived datasets kept by [`ModificationEngine`]
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// A modification that was skipped during derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Position in the modification list
    pub index: usize,
    pub modification: Modification,
    #[serde(serialize_with = "serialize_error")]
    pub error: ModificationError,
}

fn serialize_error<S: serde::Serializer>(e: &ModificationError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&e.to_string())
}

/// Result of applying a modification list to the original dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkingDataset {
    pub dataset: Dataset,
    pub rejections: Vec<Rejection>,
}

impl WorkingDataset {
    pub fn query(&self, name: &str) -> Option<&Query> {
        self.dataset.query(name)
    }
}

/// Apply `modifications` to a copy of `original`, strictly in list order.
///
/// Invalid entries are recorded as [`Rejection`]s and otherwise skipped.
/// `contig_order` does not change coordinates; it is part of the input so
/// callers can key caches on the full derivation input.
pub fn derive(
    original: &Dataset,
    modifications: &[ModificationRecord],
    contig_order: &ContigOrder,
) -> WorkingDataset {
    let mut working = original.clone();
    let mut rejections = Vec::new();

    for (index, record) in modifications.iter().enumerate() {
        if let Err(error) = apply(&mut working, &record.modification) {
            warn!("Skipping modification #{index} ({}): {error}", record.modification);
            rejections.push(Rejection {
                index,
                modification: record.modification.clone(),
                error,
            });
        }
    }

    debug!(
        "Derived working dataset: {} modifications, {} rejected, {} ordered contigs",
        modifications.len(),
        rejections.len(),
        contig_order.len()
    );

    WorkingDataset {
        dataset: working,
        rejections,
    }
}

/// Apply one modification in place
///
/// # Errors
///
/// Returns `ModificationError::UnknownQuery` if the contig is not present in
/// `dataset`, or `ModificationError::InvalidBreakPosition` when a break is not
/// strictly inside the contig. On error `dataset` is unchanged.
pub fn apply(dataset: &mut Dataset, modification: &Modification) -> Result<(), ModificationError> {
    match modification {
        Modification::Invert { query } => invert(dataset, query),
        Modification::Break { query, position } => split(dataset, query, *position),
        Modification::Reorder => Ok(()),
    }
}

fn invert(dataset: &mut Dataset, name: &str) -> Result<(), ModificationError> {
    let query = dataset
        .queries
        .iter_mut()
        .find(|q| q.name == name)
        .ok_or_else(|| ModificationError::UnknownQuery(name.to_string()))?;

    query.orientation = query.orientation.flipped();
    query.inverted = !query.inverted;
    let length = query.length;

    for alignment in dataset.alignments.iter_mut().filter(|a| a.query == name) {
        match alignment.pre_invert.take() {
            Some(span) => {
                alignment.query_start = span.start;
                alignment.query_end = span.end;
                alignment.aligned_orientation = span.orientation;
            }
            None => {
                alignment.pre_invert = Some(QuerySpan {
                    start: alignment.query_start,
                    end: alignment.query_end,
                    orientation: alignment.aligned_orientation,
                });
                let (start, end) = (alignment.query_start, alignment.query_end);
                alignment.query_start = length.saturating_sub(end);
                alignment.query_end = length.saturating_sub(start);
                alignment.aligned_orientation = alignment.aligned_orientation.flipped();
            }
        }
    }

    Ok(())
}

fn split(dataset: &mut Dataset, name: &str, position: u64) -> Result<(), ModificationError> {
    let idx = dataset
        .queries
        .iter()
        .position(|q| q.name == name)
        .ok_or_else(|| ModificationError::UnknownQuery(name.to_string()))?;

    let original = &dataset.queries[idx];
    if position == 0 || position >= original.length {
        return Err(ModificationError::InvalidBreakPosition {
            query: name.to_string(),
            position,
            length: original.length,
        });
    }

    let left_name = format!("{name}_1");
    let right_name = format!("{name}_2");
    let source = original.source_name().to_string();
    let segment = |seg_name: &str, length: u64| Query {
        name: seg_name.to_string(),
        length,
        orientation: original.orientation,
        is_broken: true,
        inverted: original.inverted,
        source: Some(source.clone()),
    };
    let left = segment(&left_name, position);
    let right = segment(&right_name, original.length - position);
    dataset.queries.splice(idx..=idx, [left, right]);

    let alignments = std::mem::take(&mut dataset.alignments);
    dataset.alignments = Vec::with_capacity(alignments.len() + 1);
    for mut alignment in alignments {
        if alignment.query != name {
            dataset.alignments.push(alignment);
            continue;
        }

        // Coordinates are re-based on the segments, so the inversion cache no
        // longer describes this alignment
        alignment.pre_invert = None;

        if alignment.query_end <= position {
            alignment.query = left_name.clone();
            dataset.alignments.push(alignment);
        } else if alignment.query_start >= position {
            alignment.query = right_name.clone();
            alignment.query_start -= position;
            alignment.query_end -= position;
            dataset.alignments.push(alignment);
        } else {
            let (left_part, right_part) = cut_alignment(&alignment, position, &left_name, &right_name);
            dataset.alignments.push(left_part);
            dataset.alignments.push(right_part);
        }
    }

    Ok(())
}

/// Split an alignment spanning `position` into one partial alignment per segment.
/// The reference interval is divided in proportion to the query interval.
fn cut_alignment(
    alignment: &Alignment,
    position: u64,
    left_name: &str,
    right_name: &str,
) -> (Alignment, Alignment) {
    let query_len = alignment.query_len();
    let left_query = position - alignment.query_start;
    let ref_len = alignment.ref_len();

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ref_cut = ((ref_len as f64) * (left_query as f64) / (query_len as f64)).round() as u64;
    let ref_cut = ref_cut.min(ref_len);

    let mut left = alignment.clone();
    left.query = left_name.to_string();
    left.query_end = position;
    left.length = left.query_len();
    left.partial = true;

    let mut right = alignment.clone();
    right.query = right_name.to_string();
    right.query_start = 0;
    right.query_end = alignment.query_end - position;
    right.length = right.query_len();
    right.partial = true;

    match alignment.aligned_orientation {
        Orientation::Forward => {
            left.ref_end = alignment.ref_start + ref_cut;
            right.ref_start = alignment.ref_start + ref_cut;
        }
        Orientation::Reverse => {
            left.ref_start = alignment.ref_end - ref_cut;
            right.ref_end = alignment.ref_end - ref_cut;
        }
    }

    (left, right)
}

/// Caching front end for [`derive`] bound to one original dataset.
///
/// Entries are keyed by the fingerprint of `(modifications, contig order)`
/// and evicted oldest first.
#[derive(Debug)]
pub struct ModificationEngine {
    original: Arc<Dataset>,
    cache: HashMap<String, Arc<WorkingDataset>>,
    insertion_order: VecDeque<String>,
    capacity: usize,
}

impl ModificationEngine {
    pub fn new(original: Arc<Dataset>) -> Self {
        Self::with_capacity(original, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(original: Arc<Dataset>, capacity: usize) -> Self {
        Self {
            original,
            cache: HashMap::new(),
            insertion_order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn original(&self) -> &Dataset {
        &self.original
    }

    /// Derive (or fetch from cache) the working dataset for the given edits
    pub fn derive(
        &mut self,
        modifications: &[ModificationRecord],
        contig_order: &ContigOrder,
    ) -> Arc<WorkingDataset> {
        let key = compute_fingerprint(modifications, contig_order);
        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(hit);
        }

        let working = Arc::new(derive(&self.original, modifications, contig_order));

        if self.cache.len() >= self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.insertion_order.push_back(key.clone());
        self.cache.insert(key, Arc::clone(&working));
        working
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::Reference;
    use crate::core::types::AlignmentTag;

    fn records(mods: Vec<Modification>) -> Vec<ModificationRecord> {
        mods.into_iter().map(ModificationRecord::new).collect()
    }

    fn sample() -> Dataset {
        Dataset::new(
            vec![Reference::new("chr1", 10_000_000)],
            vec![Query::new("q1", 2_000_000), Query::new("q2", 3_000_000)],
            vec![
                Alignment::new("chr1", "q1", (100_000, 600_000), (0, 500_000)).with_identity(99.1),
                Alignment::new("chr1", "q1", (600_000, 1_600_000), (500_000, 1_500_000))
                    .with_identity(98.0),
                Alignment::new("chr1", "q1", (5_000_000, 5_200_000), (1_700_000, 1_900_000))
                    .with_tag(AlignmentTag::Repetitive)
                    .with_orientation(Orientation::Reverse),
                Alignment::new("chr1", "q2", (3_000_000, 3_100_000), (0, 100_000)),
            ],
        )
    }

    #[test]
    fn test_invert_mirrors_query_coordinates() {
        let original = sample();
        let working = derive(&original, &records(vec![Modification::invert("q1")]), &ContigOrder::new());

        let q1 = working.query("q1").unwrap();
        assert!(q1.is_inverted());
        assert_eq!(q1.orientation, Orientation::Reverse);

        let first = &working.dataset.alignments[0];
        assert_eq!((first.query_start, first.query_end), (1_500_000, 2_000_000));
        assert_eq!(first.aligned_orientation, Orientation::Reverse);
        assert!(first.pre_invert.is_some());

        // Unrelated contig untouched
        assert_eq!(working.dataset.alignments[3], original.alignments[3]);
    }

    #[test]
    fn test_double_invert_is_identity() {
        let original = sample();
        let mods = records(vec![Modification::invert("q1"), Modification::invert("q1")]);
        let working = derive(&original, &mods, &ContigOrder::new());

        assert_eq!(working.dataset, original);
        assert_eq!(
            serde_json::to_string(&working.dataset).unwrap(),
            serde_json::to_string(&original).unwrap()
        );
    }

    #[test]
    fn test_break_conserves_lengths() {
        let original = sample();
        let working = derive(
            &original,
            &records(vec![Modification::split("q1", 1_000_000)]),
            &ContigOrder::new(),
        );

        assert!(working.query("q1").is_none());
        let left = working.query("q1_1").unwrap();
        let right = working.query("q1_2").unwrap();
        assert_eq!(left.length + right.length, 2_000_000);
        assert!(left.is_broken && right.is_broken);
        assert_eq!(left.source_name(), "q1");

        // Segments replace the contig in place
        let names: Vec<&str> = working.dataset.queries.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["q1_1", "q1_2", "q2"]);

        // The 500k..1.5M alignment spans the break
        let partials: Vec<&Alignment> = working.dataset.alignments.iter().filter(|a| a.partial).collect();
        assert_eq!(partials.len(), 2);
        assert_eq!(partials[0].query, "q1_1");
        assert_eq!((partials[0].query_start, partials[0].query_end), (500_000, 1_000_000));
        assert_eq!(partials[1].query, "q1_2");
        assert_eq!((partials[1].query_start, partials[1].query_end), (0, 500_000));
        assert_eq!(partials[0].query_len() + partials[1].query_len(), 1_000_000);
        assert_eq!(partials[0].ref_end, partials[1].ref_start);
        assert_eq!(partials[0].ref_end, 1_100_000);

        // Wholly right alignment shifted
        let shifted = working
            .dataset
            .alignments
            .iter()
            .find(|a| a.tag == AlignmentTag::Repetitive)
            .unwrap();
        assert_eq!(shifted.query, "q1_2");
        assert_eq!((shifted.query_start, shifted.query_end), (700_000, 900_000));
    }

    #[test]
    fn test_break_reverse_alignment_splits_reference_from_the_end() {
        let original = Dataset::new(
            vec![Reference::new("chr1", 1000)],
            vec![Query::new("q", 100)],
            vec![Alignment::new("chr1", "q", (200, 300), (0, 100)).with_orientation(Orientation::Reverse)],
        );
        let working = derive(&original, &records(vec![Modification::split("q", 40)]), &ContigOrder::new());
        let left = &working.dataset.alignments[0];
        let right = &working.dataset.alignments[1];
        assert_eq!((left.ref_start, left.ref_end), (260, 300));
        assert_eq!((right.ref_start, right.ref_end), (200, 260));
    }

    #[test]
    fn test_invalid_break_is_rejected_and_skipped() {
        let original = sample();
        let mods = records(vec![
            Modification::split("q1", 0),
            Modification::split("q1", 2_000_000),
            Modification::invert("nope"),
        ]);
        let working = derive(&original, &mods, &ContigOrder::new());
        assert_eq!(working.dataset, original);
        assert_eq!(working.rejections.len(), 3);
        assert!(matches!(
            working.rejections[0].error,
            ModificationError::InvalidBreakPosition { position: 0, .. }
        ));
        assert_eq!(working.rejections[2].index, 2);
        assert_eq!(
            working.rejections[2].error,
            ModificationError::UnknownQuery("nope".to_string())
        );
    }

    #[test]
    fn test_order_sensitivity() {
        let original = sample();
        let invert_then_break = records(vec![
            Modification::invert("q1"),
            Modification::split("q1", 1_000_000),
        ]);
        let break_then_invert = records(vec![
            Modification::split("q1", 1_000_000),
            Modification::invert("q1"),
        ]);

        let a = derive(&original, &invert_then_break, &ContigOrder::new());
        let b = derive(&original, &break_then_invert, &ContigOrder::new());

        assert!(a.rejections.is_empty());
        // After the break "q1" no longer exists, so the invert is rejected
        assert_eq!(b.rejections.len(), 1);
        assert_ne!(a.dataset, b.dataset);

        // Break after invert works in mirrored space: the repetitive alignment
        // (originally 1.7M..1.9M) now sits at 100k..300k, i.e. on segment 1
        let rep = a
            .dataset
            .alignments
            .iter()
            .find(|al| al.tag == AlignmentTag::Repetitive)
            .unwrap();
        assert_eq!(rep.query, "q1_1");
        assert_eq!((rep.query_start, rep.query_end), (100_000, 300_000));
        assert!(a.query("q1_1").unwrap().is_inverted());
    }

    #[test]
    fn test_derive_is_deterministic() {
        let original = sample();
        let mods = records(vec![
            Modification::invert("q2"),
            Modification::split("q1", 700_000),
            Modification::invert("q1_2"),
            Modification::Reorder,
        ]);
        let order: ContigOrder = [("q2".to_string(), 0), ("q1_1".to_string(), 1)].into_iter().collect();
        let a = derive(&original, &mods, &order);
        let b = derive(&original, &mods, &order);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
        assert_eq!(original, sample());
    }

    #[test]
    fn test_engine_caches_by_fingerprint() {
        let mut engine = ModificationEngine::with_capacity(Arc::new(sample()), 2);
        let mods = records(vec![Modification::invert("q1")]);
        let order = ContigOrder::new();

        let first = engine.derive(&mods, &order);
        let second = engine.derive(&mods, &order);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cached_entries(), 1);

        engine.derive(&records(vec![Modification::invert("q2")]), &order);
        engine.derive(&[], &order);
        assert_eq!(engine.cached_entries(), 2);

        // Oldest entry evicted: a fresh Arc is produced
        let again = engine.derive(&mods, &order);
        assert!(!Arc::ptr_eq(&first, &again));
        assert_eq!(*first, *again);
    }
}
