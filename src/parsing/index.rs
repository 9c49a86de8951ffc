use std::path::Path;

use crate::core::types::Orientation;
use crate::parsing::coords::parse_coordinate;
use crate::parsing::{read_text, ParseError};
use crate::utils::validation::check_contig_limit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedReference {
    pub name: String,
    pub length: u64,
    pub matching_queries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedQuery {
    pub name: String,
    pub length: u64,
    pub orientation: Orientation,
    pub unique_alignments: usize,
    pub unique_short_alignments: usize,
    pub repetitive_alignments: usize,
    pub matching_refs: Vec<String>,
}

/// Contents of a `.coords.idx` file. Query order is the global contig order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordsIndex {
    pub references: Vec<IndexedReference>,
    pub queries: Vec<IndexedQuery>,
}

#[derive(Clone, Copy)]
enum Section {
    None,
    Reference,
    Query,
    Other,
}

/// Parse a `.coords.idx` file (optionally gzipped)
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or any error from
/// [`parse_index_text`].
pub fn parse_index_file(path: &Path) -> Result<CoordsIndex, ParseError> {
    parse_index_text(&read_text(path)?)
}

fn split_list(field: Option<&&str>) -> Vec<String> {
    let mut names: Vec<String> = field
        .map(|s| s.split('~').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();
    names.sort();
    names
}

fn parse_count(field: Option<&&str>) -> usize {
    field.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

/// Parse `.coords.idx` text: a `#ref` section, a `#query` section and any
/// further `#` sections, which are skipped.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` for malformed rows or
/// `ParseError::TooManyContigs` past the contig limit.
pub fn parse_index_text(text: &str) -> Result<CoordsIndex, ParseError> {
    let mut index = CoordsIndex::default();
    let mut section = Section::None;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        let line_num = i + 1;
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix('#') {
            section = match name.trim() {
                "ref" => Section::Reference,
                "query" => Section::Query,
                _ => Section::Other,
            };
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        match section {
            Section::Reference => {
                if fields[0] == "ref" {
                    continue;
                }
                if fields.len() < 2 {
                    return Err(ParseError::InvalidFormat(format!(
                        "Reference row on line {line_num} has fewer than 2 fields"
                    )));
                }
                if let Some(msg) = check_contig_limit(index.references.len()) {
                    return Err(ParseError::TooManyContigs(msg));
                }
                index.references.push(IndexedReference {
                    name: fields[0].trim().to_string(),
                    length: parse_coordinate(fields[1], "ref_length", line_num)?,
                    matching_queries: split_list(fields.get(2)),
                });
            }
            Section::Query => {
                if fields[0] == "query" {
                    continue;
                }
                if fields.len() < 2 {
                    return Err(ParseError::InvalidFormat(format!(
                        "Contig row on line {line_num} has fewer than 2 fields"
                    )));
                }
                if let Some(msg) = check_contig_limit(index.queries.len()) {
                    return Err(ParseError::TooManyContigs(msg));
                }
                index.queries.push(IndexedQuery {
                    name: fields[0].trim().to_string(),
                    length: parse_coordinate(fields[1], "query_length", line_num)?,
                    orientation: fields.get(2).map_or(Orientation::Forward, |s| Orientation::parse(s)),
                    unique_alignments: parse_count(fields.get(3)),
                    unique_short_alignments: parse_count(fields.get(4)),
                    repetitive_alignments: parse_count(fields.get(5)),
                    matching_refs: split_list(fields.get(6)),
                });
            }
            Section::Other => {}
            Section::None => {
                return Err(ParseError::InvalidFormat(format!(
                    "Line {line_num} appears before any #ref or #query section"
                )));
            }
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "\
#ref
ref,ref_length,matching_queries
chr1,248956422,ctg2~ctg1
chr2,242193529,ctg1
#query
query,query_length,orientation,unique_alignments,unique_short_alignments,repetitive_alignments,matching_refs
ctg2,500000,-,3,0,1,chr1
ctg1,2000000,+,10,2,5,chr2~chr1
#overview
ref_start,ref_end,query_start,query_end,ref,query,tag,identity
1,2,3,4,chr1,ctg1,unique,99.00
";

    #[test]
    fn test_parse_sections() {
        let index = parse_index_text(INDEX).unwrap();
        assert_eq!(index.references.len(), 2);
        assert_eq!(index.references[0].length, 248_956_422);
        assert_eq!(index.references[0].matching_queries, vec!["ctg1", "ctg2"]);

        let names: Vec<&str> = index.queries.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["ctg2", "ctg1"]);
        assert_eq!(index.queries[0].orientation, Orientation::Reverse);
        assert_eq!(index.queries[1].unique_alignments, 10);
        assert_eq!(index.queries[1].matching_refs, vec!["chr1", "chr2"]);
    }

    #[test]
    fn test_rows_outside_sections_are_rejected() {
        assert!(parse_index_text("chr1,100\n").is_err());
        assert!(parse_index_text("#ref\nchr1,abc\n").is_err());
    }
}
