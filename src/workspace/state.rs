use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::modification::ModificationRecord;
use crate::engine::modification::ContigOrder;

/// Maximum number of undo snapshots kept per workspace
pub const MAX_HISTORY: usize = 50;

fn default_true() -> bool {
    true
}

/// A named, ordered bundle of contigs forming one finished scaffold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromosomeGroup {
    pub name: String,

    /// Contigs in scaffold order
    pub contigs: Vec<String>,

    /// Reference the group was built against
    pub created_on: String,

    #[serde(default = "default_true")]
    pub visible: bool,

    pub created_at: DateTime<Utc>,
}

impl ChromosomeGroup {
    pub fn new(name: impl Into<String>, contigs: Vec<String>, created_on: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contigs,
            created_on: created_on.into(),
            visible: true,
            created_at: Utc::now(),
        }
    }

    pub fn contains(&self, contig: &str) -> bool {
        self.contigs.iter().any(|c| c == contig)
    }
}

/// Deep copy of the five mutable workspace fields, used for undo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub modifications: Vec<ModificationRecord>,
    pub chromosome_groups: Vec<ChromosomeGroup>,
    pub contig_order: ContigOrder,
    pub uninformative_contigs: BTreeSet<String>,
    pub selected_contigs: Vec<String>,
}

/// Editable state for one reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub reference: String,

    pub contig_order: ContigOrder,

    #[serde(default)]
    pub modifications: Vec<ModificationRecord>,

    #[serde(default)]
    pub chromosome_groups: Vec<ChromosomeGroup>,

    #[serde(default)]
    pub uninformative_contigs: BTreeSet<String>,

    #[serde(default)]
    pub selected_contigs: Vec<String>,

    #[serde(default = "default_true")]
    pub saved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    /// Undo stack, most recent last
    #[serde(default)]
    pub history: VecDeque<WorkspaceSnapshot>,
}

impl Workspace {
    /// Fresh workspace with the given default order and nothing else
    pub fn new(reference: impl Into<String>, contig_order: ContigOrder) -> Self {
        Self {
            reference: reference.into(),
            contig_order,
            modifications: Vec::new(),
            chromosome_groups: Vec::new(),
            uninformative_contigs: BTreeSet::new(),
            selected_contigs: Vec::new(),
            saved: true,
            last_modified: None,
            history: VecDeque::new(),
        }
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            modifications: self.modifications.clone(),
            chromosome_groups: self.chromosome_groups.clone(),
            contig_order: self.contig_order.clone(),
            uninformative_contigs: self.uninformative_contigs.clone(),
            selected_contigs: self.selected_contigs.clone(),
        }
    }

    /// Push a snapshot of the current state, evicting the oldest past [`MAX_HISTORY`]
    pub fn push_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.push_back(snapshot);
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// Restore all five fields from the most recent snapshot.
    /// Returns false when there is nothing to undo.
    pub fn pop_history(&mut self) -> bool {
        let Some(snapshot) = self.history.pop_back() else {
            return false;
        };
        let WorkspaceSnapshot {
            modifications,
            chromosome_groups,
            contig_order,
            uninformative_contigs,
            selected_contigs,
        } = snapshot;
        self.modifications = modifications;
        self.chromosome_groups = chromosome_groups;
        self.contig_order = contig_order;
        self.uninformative_contigs = uninformative_contigs;
        self.selected_contigs = selected_contigs;
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn group(&self, name: &str) -> Option<&ChromosomeGroup> {
        self.chromosome_groups.iter().find(|g| g.name == name)
    }

    /// Group holding `contig`, if any
    pub fn group_of(&self, contig: &str) -> Option<&ChromosomeGroup> {
        self.chromosome_groups.iter().find(|g| g.contains(contig))
    }

    /// True if `contig` (or the original contig it was cut from) is the target
    /// of any recorded modification
    pub fn is_modified(&self, contig: &str, source: &str) -> bool {
        self.modifications.iter().any(|record| {
            record
                .modification
                .query()
                .is_some_and(|q| q == contig || q == source)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::modification::Modification;

    fn order(names: &[&str]) -> ContigOrder {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| ((*n).to_string(), i))
            .collect()
    }

    #[test]
    fn test_history_is_bounded() {
        let mut ws = Workspace::new("chr1", order(&["a"]));
        for i in 0..(MAX_HISTORY + 10) {
            ws.push_history();
            ws.selected_contigs = vec![format!("c{i}")];
        }
        assert_eq!(ws.history.len(), MAX_HISTORY);
        // Oldest surviving snapshot is the 11th push, taken after selection c9
        assert_eq!(ws.history[0].selected_contigs, vec!["c9".to_string()]);
    }

    #[test]
    fn test_pop_history_restores_all_fields() {
        let mut ws = Workspace::new("chr1", order(&["a", "b"]));
        let before = ws.snapshot();

        ws.push_history();
        ws.modifications
            .push(ModificationRecord::new(Modification::invert("a")));
        ws.chromosome_groups
            .push(ChromosomeGroup::new("g1", vec!["a".to_string()], "chr1"));
        ws.contig_order = order(&["b", "a"]);
        ws.uninformative_contigs.insert("b".to_string());
        ws.selected_contigs = vec!["a".to_string()];

        assert!(ws.pop_history());
        assert_eq!(ws.snapshot(), before);
        assert!(!ws.pop_history());
    }

    #[test]
    fn test_is_modified_tracks_segments() {
        let mut ws = Workspace::new("chr1", ContigOrder::new());
        ws.modifications
            .push(ModificationRecord::new(Modification::split("q1", 10)));
        assert!(ws.is_modified("q1", "q1"));
        assert!(ws.is_modified("q1_2", "q1"));
        assert!(!ws.is_modified("q2", "q2"));
    }
}
