use std::collections::HashMap;
use std::path::Path;

use crate::core::dataset::Alignment;
use crate::core::types::{AlignmentTag, Orientation};
use crate::parsing::{read_text, ParseError};
use crate::utils::validation::check_alignment_limit;

/// Alignments of a `.coords` file plus the contigs in order of first appearance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordsFile {
    pub alignments: Vec<Alignment>,

    /// `(name, largest query_end seen)` per contig, in file order
    pub queries: Vec<(String, u64)>,

    /// `(name, largest ref_end seen)` per reference, in file order
    pub references: Vec<(String, u64)>,
}

/// Parse a `.coords` file (optionally gzipped)
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or any error from
/// [`parse_coords_text`].
pub fn parse_coords_file(path: &Path) -> Result<CoordsFile, ParseError> {
    parse_coords_text(&read_text(path)?)
}

/// Parse a coordinate integer; float spellings such as `1200.0` are accepted
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn parse_coordinate(field: &str, what: &str, line_num: usize) -> Result<u64, ParseError> {
    let field = field.trim();
    if let Ok(value) = field.parse::<u64>() {
        return Ok(value);
    }
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value.round() as u64),
        _ => Err(ParseError::InvalidFormat(format!(
            "Invalid {what} on line {line_num}: '{field}'"
        ))),
    }
}

/// Largest end coordinate per name, kept in order of first appearance
#[derive(Default)]
struct EndTracker {
    positions: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl EndTracker {
    fn track(&mut self, name: &str, end: u64) {
        match self.positions.get(name) {
            Some(&pos) => self.entries[pos].1 = self.entries[pos].1.max(end),
            None => {
                self.positions.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), end));
            }
        }
    }
}

/// Parse `.coords` text.
///
/// Layout:
///
/// ```text
/// ref_start,ref_end,query_start,query_end,ref,original_orientation,aligned_orientation,needs_flip,identity
/// !ctg1!unique
/// 100,600,0,500,chr1,+,+,False,99.10
/// ```
///
/// Only the first five columns are required.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` for malformed lines or data lines
/// outside a `!query!tag` section, or `ParseError::TooManyAlignments`.
pub fn parse_coords_text(text: &str) -> Result<CoordsFile, ParseError> {
    let mut parsed = CoordsFile::default();
    let mut queries = EndTracker::default();
    let mut references = EndTracker::default();
    let mut section: Option<(String, AlignmentTag)> = None;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        let line_num = i + 1;
        if line.is_empty() || line.starts_with("ref_start") {
            continue;
        }

        if let Some(rest) = line.strip_prefix('!') {
            let mut parts = rest.splitn(2, '!');
            let query = parts.next().unwrap_or_default().trim();
            if query.is_empty() {
                return Err(ParseError::InvalidFormat(format!(
                    "Empty contig name in section header on line {line_num}"
                )));
            }
            let tag = parts.next().map_or(AlignmentTag::Unique, AlignmentTag::parse);
            section = Some((query.to_string(), tag));
            continue;
        }

        let Some((query, tag)) = &section else {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has coordinates before any !contig!tag section"
            )));
        };

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 5 {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has fewer than 5 fields"
            )));
        }
        if let Some(msg) = check_alignment_limit(parsed.alignments.len()) {
            return Err(ParseError::TooManyAlignments(msg));
        }

        let ref_start = parse_coordinate(fields[0], "ref_start", line_num)?;
        let ref_end = parse_coordinate(fields[1], "ref_end", line_num)?;
        let query_start = parse_coordinate(fields[2], "query_start", line_num)?;
        let query_end = parse_coordinate(fields[3], "query_end", line_num)?;
        let reference = fields[4].trim();
        if reference.is_empty() {
            return Err(ParseError::InvalidFormat(format!(
                "Empty reference name on line {line_num}"
            )));
        }
        let orientation = fields.get(6).map_or(Orientation::Forward, |s| Orientation::parse(s));
        let identity = match fields.get(8).map(|s| s.trim()) {
            Some(s) if !s.is_empty() => s.parse::<f64>().map_err(|_| {
                ParseError::InvalidFormat(format!("Invalid identity on line {line_num}: '{s}'"))
            })?,
            _ => 0.0,
        };

        let alignment = Alignment::new(reference, query.as_str(), (ref_start, ref_end), (query_start, query_end))
            .with_tag(*tag)
            .with_orientation(orientation)
            .with_identity(identity);
        queries.track(query, alignment.query_end);
        references.track(reference, alignment.ref_end);
        parsed.alignments.push(alignment);
    }

    parsed.queries = queries.entries;
    parsed.references = references.entries;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COORDS: &str = "\
ref_start,ref_end,query_start,query_end,ref,original_orientation,aligned_orientation,needs_flip,identity
!ctg1!unique
100,600,0,500,chr1,+,+,False,99.10
700,900,800,600,chr1,+,-,True,97.50
!ctg1!repetitive
5000,5200,1700,1900,chr2,+,+,False,88.00
!ctg2!unique_short
10,20,0,10,chr1
";

    #[test]
    fn test_parse_sections() {
        let parsed = parse_coords_text(COORDS).unwrap();
        assert_eq!(parsed.alignments.len(), 4);

        let second = &parsed.alignments[1];
        assert_eq!((second.query_start, second.query_end), (600, 800));
        assert_eq!(second.aligned_orientation, Orientation::Reverse);
        assert!((second.identity - 97.5).abs() < 1e-9);
        assert_eq!(second.tag, AlignmentTag::Unique);

        assert_eq!(parsed.alignments[2].tag, AlignmentTag::Repetitive);
        let short = &parsed.alignments[3];
        assert_eq!(short.tag, AlignmentTag::UniqueShort);
        assert_eq!(short.aligned_orientation, Orientation::Forward);
        assert_eq!(short.identity, 0.0);

        assert_eq!(
            parsed.queries,
            vec![("ctg1".to_string(), 1_900), ("ctg2".to_string(), 10)]
        );
        assert_eq!(parsed.references[0], ("chr1".to_string(), 900));
    }

    #[test]
    fn test_reappearing_names_keep_first_position() {
        let mut text = String::new();
        for i in 0..200u64 {
            text.push_str(&format!("!ctg{}!unique\n{},{},0,{},chr{}\n", i % 50, i, i + 10, i + 5, i % 3));
        }
        let parsed = parse_coords_text(&text).unwrap();
        assert_eq!(parsed.alignments.len(), 200);
        assert_eq!(parsed.queries.len(), 50);
        assert_eq!(parsed.queries[0], ("ctg0".to_string(), 155));
        assert_eq!(parsed.queries[49], ("ctg49".to_string(), 204));
        let names: Vec<&str> = parsed.references.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["chr0", "chr1", "chr2"]);
        assert_eq!(parsed.references[0].1, 208);
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = parse_coords_text("1,2,3,4,chr1\n").unwrap_err();
        assert!(err.to_string().contains("Line 1"));

        let err = parse_coords_text("!q!unique\n1,2,x,4,chr1\n").unwrap_err();
        assert!(err.to_string().contains("query_start on line 2"));

        let err = parse_coords_text("!q!unique\n1,2,3\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_float_coordinates() {
        assert_eq!(parse_coordinate("1200.0", "x", 1).unwrap(), 1200);
        assert!(parse_coordinate("-5", "x", 1).is_err());
    }
}
