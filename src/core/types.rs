use serde::{Deserialize, Serialize};

/// Strand orientation of a contig or an alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Orientation {
    #[default]
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Orientation {
    /// Parse a strand symbol. Anything other than `-` is forward.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "-" => Orientation::Reverse,
            _ => Orientation::Forward,
        }
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}

/// Uniqueness class assigned to an alignment during alignment preparation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentTag {
    /// Enough sequence is covered by this alignment alone
    #[default]
    Unique,
    /// Mostly unique but shorter than the uniqueness threshold
    UniqueShort,
    /// Overlaps other alignments of the same contig
    Repetitive,
}

impl AlignmentTag {
    /// Parse a tag from its coords-file spelling. Unknown tags are treated as unique.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "unique_short" => AlignmentTag::UniqueShort,
            "repetitive" => AlignmentTag::Repetitive,
            _ => AlignmentTag::Unique,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::UniqueShort => "unique_short",
            Self::Repetitive => "repetitive",
        }
    }
}

impl std::fmt::Display for AlignmentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query-side coordinates of an alignment as they were before an inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpan {
    pub start: u64,
    pub end: u64,
    pub orientation: Orientation,
}
