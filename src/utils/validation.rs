//! Centralized validation and helper functions.

use std::collections::BTreeMap;

use crate::core::modification::ModificationRecord;

/// Maximum number of contigs (queries or references) in a single dataset
pub const MAX_CONTIGS: usize = 1_000_000;

/// Maximum number of alignments in a single dataset
pub const MAX_ALIGNMENTS: usize = 5_000_000;

/// Maximum length of a chromosome group name
pub const MAX_GROUP_NAME_LENGTH: usize = 128;

/// Check if adding another contig would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new contig.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_contig_limit(count: usize) -> Option<String> {
    if count >= MAX_CONTIGS {
        Some(format!(
            "Too many contigs: adding another would exceed maximum of {MAX_CONTIGS}"
        ))
    } else {
        None
    }
}

/// Same as [`check_contig_limit`] for alignment records.
#[must_use]
pub fn check_alignment_limit(count: usize) -> Option<String> {
    if count >= MAX_ALIGNMENTS {
        Some(format!(
            "Too many alignments: adding another would exceed maximum of {MAX_ALIGNMENTS}"
        ))
    } else {
        None
    }
}

/// Check a complete dataset against the size limits.
///
/// Unlike the incremental checks, the counts here are final sizes, so a
/// dataset holding exactly the maximum is accepted.
#[must_use]
pub fn check_dataset_size(contigs: usize, alignments: usize) -> Option<String> {
    if contigs > MAX_CONTIGS {
        Some(format!(
            "Too many contigs: {contigs} exceeds maximum of {MAX_CONTIGS}"
        ))
    } else if alignments > MAX_ALIGNMENTS {
        Some(format!(
            "Too many alignments: {alignments} exceeds maximum of {MAX_ALIGNMENTS}"
        ))
    } else {
        None
    }
}

/// Name validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("Name is empty")]
    Empty,
    #[error("Name too long: exceeds {MAX_GROUP_NAME_LENGTH} characters")]
    TooLong,
    #[error("Name contains control characters")]
    ControlCharacters,
}

/// Validate a chromosome group name and return it trimmed.
///
/// # Examples
///
/// ```
/// use contig_scaffolder::utils::validation::validate_group_name;
///
/// assert_eq!(validate_group_name("  chr1A ").unwrap(), "chr1A");
/// assert!(validate_group_name("   ").is_err());
/// ```
///
/// # Errors
///
/// Returns `NameError::Empty` for blank names, `NameError::TooLong` past
/// [`MAX_GROUP_NAME_LENGTH`], or `NameError::ControlCharacters`.
pub fn validate_group_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if trimmed.chars().count() > MAX_GROUP_NAME_LENGTH {
        return Err(NameError::TooLong);
    }
    if trimmed.chars().any(char::is_control) {
        return Err(NameError::ControlCharacters);
    }
    Ok(trimmed.to_string())
}

/// Compute a fingerprint of a modification list and contig order.
///
/// The fingerprint is the MD5 of the canonical JSON encoding of the
/// modification variants (timestamps and notes excluded) followed by the
/// order map, whose keys are already sorted.
#[must_use]
pub fn compute_fingerprint(
    modifications: &[ModificationRecord],
    contig_order: &BTreeMap<String, usize>,
) -> String {
    let mut context = md5::Context::new();
    for record in modifications {
        // Serializing a plain enum of strings and integers cannot fail
        if let Ok(bytes) = serde_json::to_vec(&record.modification) {
            context.consume(&bytes);
        }
        context.consume(b"\n");
    }
    context.consume(b"#order\n");
    for (name, index) in contig_order {
        context.consume(name.as_bytes());
        context.consume(b"\t");
        context.consume(index.to_string().as_bytes());
        context.consume(b"\n");
    }
    format!("{:x}", context.compute())
}
