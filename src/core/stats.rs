use serde::Serialize;

use crate::core::dataset::Dataset;
use crate::core::types::AlignmentTag;

/// Length-weighted median: the length L such that sequences of length >= L
/// cover at least half of the total.
#[must_use]
pub fn n50(lengths: &[u64]) -> u64 {
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let total: u64 = sorted.iter().sum();
    let mut running = 0u64;
    for length in sorted {
        running += length;
        if running * 2 >= total {
            return length;
        }
    }
    0
}

/// Summary counts for a loaded dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub reference_count: usize,
    pub reference_total_length: u64,
    pub reference_n50: u64,
    pub query_count: usize,
    pub query_total_length: u64,
    pub query_n50: u64,
    pub alignment_count: usize,
    pub unique_alignments: usize,
    pub unique_short_alignments: usize,
    pub repetitive_alignments: usize,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let ref_lengths: Vec<u64> = dataset.references.iter().map(|r| r.length).collect();
        let query_lengths: Vec<u64> = dataset.queries.iter().map(|q| q.length).collect();

        let count_tag = |tag: AlignmentTag| dataset.alignments.iter().filter(|a| a.tag == tag).count();

        Self {
            reference_count: ref_lengths.len(),
            reference_total_length: ref_lengths.iter().sum(),
            reference_n50: n50(&ref_lengths),
            query_count: query_lengths.len(),
            query_total_length: query_lengths.iter().sum(),
            query_n50: n50(&query_lengths),
            alignment_count: dataset.alignments.len(),
            unique_alignments: count_tag(AlignmentTag::Unique),
            unique_short_alignments: count_tag(AlignmentTag::UniqueShort),
            repetitive_alignments: count_tag(AlignmentTag::Repetitive),
        }
    }
}
