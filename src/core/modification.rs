use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A recorded scaffolding edit
///
/// The list of modifications of a workspace is applied strictly in creation
/// order; variants are never reordered or coalesced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Modification {
    /// Reverse-complement a contig
    Invert { query: String },
    /// Split a contig into `<query>_1` (`[0, position)`) and `<query>_2`
    Break { query: String, position: u64 },
    /// Contig order changed; the order itself lives in the workspace
    Reorder,
}

impl Modification {
    pub fn invert(query: impl Into<String>) -> Self {
        Self::Invert {
            query: query.into(),
        }
    }

    pub fn split(query: impl Into<String>, position: u64) -> Self {
        Self::Break {
            query: query.into(),
            position,
        }
    }

    /// Contig the edit targets, if any
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Invert { query } | Self::Break { query, .. } => Some(query),
            Self::Reorder => None,
        }
    }

    pub fn position(&self) -> Option<u64> {
        match self {
            Self::Break { position, .. } => Some(*position),
            Self::Invert { .. } | Self::Reorder => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invert { .. } => "invert",
            Self::Break { .. } => "break",
            Self::Reorder => "reorder",
        }
    }
}

impl std::fmt::Display for Modification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invert { query } => write!(f, "invert {query}"),
            Self::Break { query, position } => write!(f, "break {query} at {position}"),
            Self::Reorder => write!(f, "reorder"),
        }
    }
}

/// A modification plus when it was made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationRecord {
    #[serde(flatten)]
    pub modification: Modification,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ModificationRecord {
    pub fn new(modification: Modification) -> Self {
        Self {
            modification,
            timestamp: Utc::now(),
            note: None,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Why a single modification could not be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModificationError {
    #[error("Unknown contig '{0}'")]
    UnknownQuery(String),

    #[error("Invalid break position {position} for contig '{query}' of length {length}")]
    InvalidBreakPosition {
        query: String,
        position: u64,
        length: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modification_wire_format() {
        let json = serde_json::to_string(&Modification::split("ctg7", 1200)).unwrap();
        assert_eq!(json, r#"{"type":"break","query":"ctg7","position":1200}"#);

        let parsed: Modification = serde_json::from_str(r#"{"type":"invert","query":"ctg1"}"#).unwrap();
        assert_eq!(parsed, Modification::invert("ctg1"));

        let parsed: Modification = serde_json::from_str(r#"{"type":"reorder"}"#).unwrap();
        assert_eq!(parsed, Modification::Reorder);
    }

    #[test]
    fn test_record_flattens_modification() {
        let record = ModificationRecord::new(Modification::invert("ctg1")).with_note("flip");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "invert");
        assert_eq!(value["query"], "ctg1");
        assert_eq!(value["note"], "flip");

        let back: ModificationRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_accessors() {
        let m = Modification::split("q", 10);
        assert_eq!(m.query(), Some("q"));
        assert_eq!(m.position(), Some(10));
        assert_eq!(m.kind(), "break");
        assert_eq!(Modification::Reorder.query(), None);
        assert_eq!(m.to_string(), "break q at 10");
    }
}
