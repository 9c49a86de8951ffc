use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::export::list_order_keys;
use crate::workspace::state::Workspace;

/// Column names, in order
pub const CHANGELOG_COLUMNS: [&str; 8] = [
    "seq",
    "reference",
    "type",
    "contig",
    "length",
    "position",
    "timestamp",
    "note",
];

#[derive(Error, Debug)]
pub enum ChangeLogError {
    #[error("Failed to write change log: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write change log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Change log is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One line of the change log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeLogRow {
    pub seq: usize,
    pub reference: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub contig: String,
    pub length: Option<u64>,
    pub position: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

/// Flat record of every modification and group assignment across workspaces
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeLog {
    pub rows: Vec<ChangeLogRow>,
}

impl ChangeLog {
    /// Build the log. `length_of(reference, contig)` supplies contig lengths.
    ///
    /// Group assignments get one row per member with type `group`, the 1-based
    /// position within the group and the group name as note. Each workspace's
    /// modification and group lists keep their order; rows from different
    /// lists are interleaved by timestamp, then reference, and numbered from 1.
    pub fn from_workspaces<'a, F>(workspaces: impl IntoIterator<Item = &'a Workspace>, length_of: F) -> Self
    where
        F: Fn(&str, &str) -> Option<u64>,
    {
        let mut keyed = Vec::new();
        for workspace in workspaces {
            let reference = workspace.reference.as_str();
            let keys = list_order_keys(workspace.modifications.iter().map(|r| r.timestamp));
            for (record, key) in workspace.modifications.iter().zip(keys) {
                let contig = record.modification.query().unwrap_or_default();
                keyed.push((key, ChangeLogRow {
                    seq: 0,
                    reference: reference.to_string(),
                    kind: record.modification.kind().to_string(),
                    contig: contig.to_string(),
                    length: if contig.is_empty() {
                        None
                    } else {
                        length_of(reference, contig)
                    },
                    position: record.modification.position(),
                    timestamp: record.timestamp,
                    note: record.note.clone().unwrap_or_default(),
                }));
            }

            let keys = list_order_keys(workspace.chromosome_groups.iter().map(|g| g.created_at));
            for (group, key) in workspace.chromosome_groups.iter().zip(keys) {
                for (i, contig) in group.contigs.iter().enumerate() {
                    keyed.push((key, ChangeLogRow {
                        seq: 0,
                        reference: reference.to_string(),
                        kind: "group".to_string(),
                        contig: contig.clone(),
                        length: length_of(reference, contig),
                        position: Some(i as u64 + 1),
                        timestamp: group.created_at,
                        note: group.name.clone(),
                    }));
                }
            }
        }

        keyed.sort_by(|(a_key, a), (b_key, b)| {
            a_key.cmp(b_key).then_with(|| a.reference.cmp(&b.reference))
        });
        let rows = keyed
            .into_iter()
            .enumerate()
            .map(|(i, (_, row))| ChangeLogRow { seq: i + 1, ..row })
            .collect();

        Self { rows }
    }

    fn write<W: std::io::Write>(&self, out: W) -> Result<(), ChangeLogError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
        writer.write_record(CHANGELOG_COLUMNS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Render as CSV with a header line, even when there are no rows
    ///
    /// # Errors
    ///
    /// Returns an error if a row cannot be encoded.
    pub fn to_csv(&self) -> Result<String, ChangeLogError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<(), ChangeLogError> {
        let file = std::fs::File::create(path)?;
        self.write(std::io::BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::modification::{Modification, ModificationRecord};
    use crate::engine::modification::ContigOrder;
    use crate::workspace::state::ChromosomeGroup;

    fn lengths(_reference: &str, contig: &str) -> Option<u64> {
        match contig {
            "q1" => Some(1_000),
            "q2" => Some(2_000),
            _ => None,
        }
    }

    #[test]
    fn test_rows_and_numbering() {
        let base = Utc::now();
        let mut chr2 = Workspace::new("chr2", ContigOrder::new());
        let mut record = ModificationRecord::new(Modification::split("q2", 750)).with_note("misjoin");
        record.timestamp = base;
        chr2.modifications.push(record);

        let mut chr1 = Workspace::new("chr1", ContigOrder::new());
        let mut record = ModificationRecord::new(Modification::invert("q1"));
        record.timestamp = base;
        chr1.modifications.push(record);
        let mut group = ChromosomeGroup::new("chr1A", vec!["q1".to_string(), "x".to_string()], "chr1");
        group.created_at = base + chrono::Duration::seconds(5);
        chr1.chromosome_groups.push(group);

        let log = ChangeLog::from_workspaces([&chr2, &chr1], lengths);
        let summary: Vec<(usize, &str, &str, &str)> = log
            .rows
            .iter()
            .map(|r| (r.seq, r.reference.as_str(), r.kind.as_str(), r.contig.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "chr1", "invert", "q1"),
                (2, "chr2", "break", "q2"),
                (3, "chr1", "group", "q1"),
                (4, "chr1", "group", "x"),
            ]
        );
        assert_eq!(log.rows[1].position, Some(750));
        assert_eq!(log.rows[1].note, "misjoin");
        assert_eq!(log.rows[3].position, Some(2));
        assert_eq!(log.rows[3].length, None);
        assert_eq!(log.rows[3].note, "chr1A");
    }

    #[test]
    fn test_workspace_list_order_survives_clock_skew() {
        let base = Utc::now();
        let mut ws = Workspace::new("chr1", ContigOrder::new());
        let mut split = ModificationRecord::new(Modification::split("q1", 400));
        split.timestamp = base + chrono::Duration::seconds(30);
        let mut invert = ModificationRecord::new(Modification::invert("q1_2"));
        invert.timestamp = base;
        ws.modifications.extend([split, invert]);

        let log = ChangeLog::from_workspaces([&ws], lengths);
        let kinds: Vec<(usize, &str)> = log.rows.iter().map(|r| (r.seq, r.kind.as_str())).collect();
        assert_eq!(kinds, vec![(1, "break"), (2, "invert")]);
        // Timestamps are reported as recorded
        assert_eq!(log.rows[1].timestamp, base);
    }

    #[test]
    fn test_csv_output() {
        let empty = ChangeLog::default().to_csv().unwrap();
        assert_eq!(empty, "seq,reference,type,contig,length,position,timestamp,note\n");

        let mut ws = Workspace::new("chr1", ContigOrder::new());
        ws.modifications
            .push(ModificationRecord::new(Modification::invert("q1")));
        let csv = ChangeLog::from_workspaces([&ws], lengths).to_csv().unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert!(line.starts_with("1,chr1,invert,q1,1000,,"));
        assert!(line.ends_with(','));
    }
}
