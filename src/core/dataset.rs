use serde::{Deserialize, Serialize};

use crate::core::types::{AlignmentTag, Orientation, QuerySpan};

fn is_false(value: &bool) -> bool {
    !*value
}

/// A chromosome or scaffold that contigs were aligned against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub length: u64,
}

impl Reference {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

/// An assembled contig (or a segment of one after a break)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub name: String,

    pub length: u64,

    /// Stored orientation; flipped by every inversion
    pub orientation: Orientation,

    /// True for segments produced by a break
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_broken: bool,

    /// Derived by the modification engine: odd number of inversions applied
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverted: bool,

    /// Contig of the original dataset this segment descends from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Query {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
            orientation: Orientation::Forward,
            is_broken: false,
            inverted: false,
            source: None,
        }
    }

    #[must_use]
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Name of the original contig this entry descends from (itself if never broken)
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

/// A matched region between one contig and one reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    #[serde(rename = "ref")]
    pub reference: String,

    pub query: String,

    pub ref_start: u64,
    pub ref_end: u64,
    pub query_start: u64,
    pub query_end: u64,

    /// Percent identity
    #[serde(default)]
    pub identity: f64,

    /// Aligned length in bp (query-side span at load time)
    pub length: u64,

    #[serde(default)]
    pub tag: AlignmentTag,

    #[serde(default)]
    pub aligned_orientation: Orientation,

    /// Set when a break cut through this alignment
    #[serde(default, skip_serializing_if = "is_false")]
    pub partial: bool,

    /// Coordinates before the first inversion, used to toggle back exactly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_invert: Option<QuerySpan>,
}

impl Alignment {
    /// Build an alignment, normalising both coordinate pairs to start <= end
    pub fn new(
        reference: impl Into<String>,
        query: impl Into<String>,
        ref_span: (u64, u64),
        query_span: (u64, u64),
    ) -> Self {
        let (ref_start, ref_end) = ordered(ref_span);
        let (query_start, query_end) = ordered(query_span);
        Self {
            reference: reference.into(),
            query: query.into(),
            ref_start,
            ref_end,
            query_start,
            query_end,
            identity: 0.0,
            length: query_end - query_start,
            tag: AlignmentTag::Unique,
            aligned_orientation: Orientation::Forward,
            partial: false,
            pre_invert: None,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: AlignmentTag) -> Self {
        self.tag = tag;
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: f64) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.aligned_orientation = orientation;
        self
    }

    pub fn query_len(&self) -> u64 {
        self.query_end.saturating_sub(self.query_start)
    }

    pub fn ref_len(&self) -> u64 {
        self.ref_end.saturating_sub(self.ref_start)
    }

    pub fn is_unique(&self) -> bool {
        self.tag == AlignmentTag::Unique
    }
}

fn ordered((a, b): (u64, u64)) -> (u64, u64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// References, contigs and the alignments between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub references: Vec<Reference>,
    pub queries: Vec<Query>,
    pub alignments: Vec<Alignment>,
}

impl Dataset {
    pub fn new(references: Vec<Reference>, queries: Vec<Query>, alignments: Vec<Alignment>) -> Self {
        Self {
            references,
            queries,
            alignments,
        }
    }

    pub fn reference(&self, name: &str) -> Option<&Reference> {
        self.references.iter().find(|r| r.name == name)
    }

    pub fn query(&self, name: &str) -> Option<&Query> {
        self.queries.iter().find(|q| q.name == name)
    }

    pub fn alignments_for_query<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Alignment> + 'a {
        self.alignments.iter().filter(move |a| a.query == name)
    }

    pub fn alignments_to_reference<'a>(
        &'a self,
        reference: &'a str,
    ) -> impl Iterator<Item = &'a Alignment> + 'a {
        self.alignments.iter().filter(move |a| a.reference == reference)
    }
}

/// Dataset as it arrives from an external document; every collection is optional
/// so that a missing one can be reported instead of silently defaulting
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetDocument {
    pub references: Option<Vec<Reference>>,
    pub queries: Option<Vec<Query>>,
    pub alignments: Option<Vec<Alignment>>,
}
