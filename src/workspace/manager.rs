use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::store::DataStore;
use crate::core::modification::{Modification, ModificationError, ModificationRecord};
use crate::engine::modification::{ContigOrder, ModificationEngine, WorkingDataset};
use crate::utils::validation::{validate_group_name, NameError};
use crate::workspace::state::{ChromosomeGroup, Workspace};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Unknown reference '{0}'")]
    UnknownReference(String),

    /// `index` counts from the start of the batch when adding, and from the
    /// start of the workspace list when a removal orphans a later entry
    #[error("Modification {index} was rejected: {source}")]
    Modification {
        index: usize,
        #[source]
        source: ModificationError,
    },

    #[error("No modifications given")]
    EmptyBatch,

    #[error("Modification index {index} out of range (workspace has {len})")]
    ModificationIndexOutOfRange { index: usize, len: usize },

    #[error("Invalid group name: {0}")]
    InvalidGroupName(#[from] NameError),

    #[error("A chromosome group named '{0}' already exists")]
    DuplicateGroupName(String),

    #[error("Chromosome group '{0}' not found")]
    GroupNotFound(String),

    #[error("A chromosome group needs at least one contig")]
    EmptyGroup,

    #[error("Unknown contig '{0}'")]
    UnknownContig(String),

    #[error("Contig '{contig}' already belongs to chromosome group '{group}'")]
    ContigAlreadyGrouped { contig: String, group: String },

    #[error("Chromosome group '{group}' conflicts with another group: {detail}")]
    GroupConflict { group: String, detail: String },

    #[error("No reference switch is waiting for a decision")]
    NoPendingSwitch,
}

/// A reference switch that needs the user to decide what happens to unsaved edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchDecision {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SwitchOutcome {
    Switched { reference: String },
    DecisionRequired(SwitchRequest),
    Cancelled,
}

/// Owns one isolated [`Workspace`] per reference.
///
/// Every mutating operation works on a copy of the workspace, pushes an undo
/// snapshot onto the copy, and swaps the copy in only after all validation
/// has passed, so a rejected edit leaves no trace.
#[derive(Debug)]
pub struct WorkspaceManager {
    store: DataStore,
    engine: ModificationEngine,
    workspaces: BTreeMap<String, Workspace>,
    active: Option<String>,
    pending_switch: Option<SwitchRequest>,
}

impl WorkspaceManager {
    pub fn new(store: DataStore) -> Self {
        let engine = ModificationEngine::new(store.shared());
        Self {
            store,
            engine,
            workspaces: BTreeMap::new(),
            active: None,
            pending_switch: None,
        }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Replace the dataset. All workspaces are dropped.
    pub fn reload(&mut self, store: DataStore) {
        info!("Reloading dataset; discarding {} workspaces", self.workspaces.len());
        *self = Self::new(store);
    }

    /// Order used for a new workspace: every contig aligned to `reference`,
    /// numbered by its position in the global contig list
    pub fn default_order(&self, reference: &str) -> ContigOrder {
        self.store
            .queries_for_reference(reference)
            .into_iter()
            .enumerate()
            .map(|(i, q)| (q.name.clone(), i))
            .collect()
    }

    /// Workspace for `reference`, created on first access
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` if the dataset has no such reference.
    pub fn workspace(&mut self, reference: &str) -> Result<&Workspace, WorkspaceError> {
        if !self.workspaces.contains_key(reference) {
            if !self.store.has_reference(reference) {
                return Err(WorkspaceError::UnknownReference(reference.to_string()));
            }
            debug!("Creating workspace for {reference}");
            let workspace = Workspace::new(reference, self.default_order(reference));
            self.workspaces.insert(reference.to_string(), workspace);
        }
        self.workspaces
            .get(reference)
            .ok_or_else(|| WorkspaceError::UnknownReference(reference.to_string()))
    }

    /// Workspace for `reference` if it has been created
    pub fn get(&self, reference: &str) -> Option<&Workspace> {
        self.workspaces.get(reference)
    }

    pub fn workspaces(&self) -> &BTreeMap<String, Workspace> {
        &self.workspaces
    }

    /// Working dataset for `reference` with its workspace's edits applied
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` for unknown references.
    pub fn working(&mut self, reference: &str) -> Result<Arc<WorkingDataset>, WorkspaceError> {
        let (modifications, order) = {
            let ws = self.workspace(reference)?;
            (ws.modifications.clone(), ws.contig_order.clone())
        };
        Ok(self.engine.derive(&modifications, &order))
    }

    fn update<F>(&mut self, reference: &str, mutate: F) -> Result<(), WorkspaceError>
    where
        F: FnOnce(&mut Workspace) -> Result<(), WorkspaceError>,
    {
        let mut draft = self.workspace(reference)?.clone();
        draft.push_history();
        mutate(&mut draft)?;
        draft.saved = false;
        draft.last_modified = Some(Utc::now());
        self.workspaces.insert(reference.to_string(), draft);
        Ok(())
    }

    /// Record a single modification
    ///
    /// # Errors
    ///
    /// See [`WorkspaceManager::add_modifications`].
    pub fn add_modification(
        &mut self,
        reference: &str,
        modification: Modification,
    ) -> Result<(), WorkspaceError> {
        self.add_modifications(reference, vec![modification])
    }

    /// Record several modifications as one update and one undo entry.
    ///
    /// The batch is applied to the current working dataset first; if any entry
    /// would be rejected nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::EmptyBatch`, `WorkspaceError::UnknownReference`,
    /// or `WorkspaceError::Modification` naming the first rejected entry.
    pub fn add_modifications(
        &mut self,
        reference: &str,
        modifications: Vec<Modification>,
    ) -> Result<(), WorkspaceError> {
        if modifications.is_empty() {
            return Err(WorkspaceError::EmptyBatch);
        }

        let (mut trial, order) = {
            let ws = self.workspace(reference)?;
            (ws.modifications.clone(), ws.contig_order.clone())
        };
        let base = trial.len();
        trial.extend(modifications.into_iter().map(ModificationRecord::new));

        let working = self.engine.derive(&trial, &order);
        if let Some(rejection) = working.rejections.iter().find(|r| r.index >= base) {
            return Err(WorkspaceError::Modification {
                index: rejection.index - base,
                source: rejection.error.clone(),
            });
        }

        let added = trial.split_off(base);
        let count = added.len();
        self.update(reference, |ws| {
            ws.modifications.extend(added);
            Ok(())
        })?;
        info!("Recorded {count} modification(s) on {reference}");
        Ok(())
    }

    /// Remove the modification at `index`.
    ///
    /// The shortened list is derived first; a removal that leaves a later entry
    /// without its target (e.g. dropping the break that created a segment the
    /// next entry inverts) is refused.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::ModificationIndexOutOfRange` for a bad index, or
    /// `WorkspaceError::Modification` naming the first entry that would no
    /// longer apply.
    pub fn remove_modification(&mut self, reference: &str, index: usize) -> Result<(), WorkspaceError> {
        let (mut trial, order) = {
            let ws = self.workspace(reference)?;
            (ws.modifications.clone(), ws.contig_order.clone())
        };
        let len = trial.len();
        if index >= len {
            return Err(WorkspaceError::ModificationIndexOutOfRange { index, len });
        }

        let already_rejected: HashSet<usize> = self
            .engine
            .derive(&trial, &order)
            .rejections
            .iter()
            .map(|r| r.index)
            .collect();
        trial.remove(index);
        let working = self.engine.derive(&trial, &order);
        // Entries after `index` shift down by one
        if let Some(rejection) = working
            .rejections
            .iter()
            .find(|r| r.index >= index && !already_rejected.contains(&(r.index + 1)))
        {
            return Err(WorkspaceError::Modification {
                index: rejection.index + 1,
                source: rejection.error.clone(),
            });
        }

        self.update(reference, |ws| {
            let removed = ws.modifications.remove(index);
            debug!("Removed modification {index} ({}) from {reference}", removed.modification);
            Ok(())
        })
    }

    /// Create a chromosome group from contigs of the working dataset
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::InvalidGroupName`, `DuplicateGroupName` (names are
    /// unique across all references), `EmptyGroup`, `UnknownContig`, or
    /// `ContigAlreadyGrouped` (a contig may belong to one group only).
    pub fn create_group(
        &mut self,
        reference: &str,
        name: &str,
        contigs: Vec<String>,
    ) -> Result<(), WorkspaceError> {
        let name = validate_group_name(name)?;
        if contigs.is_empty() {
            return Err(WorkspaceError::EmptyGroup);
        }
        if self
            .workspaces
            .values()
            .any(|ws| ws.group(&name).is_some())
        {
            return Err(WorkspaceError::DuplicateGroupName(name));
        }

        let working = self.working(reference)?;
        let mut seen = HashSet::new();
        for contig in &contigs {
            if working.query(contig).is_none() {
                return Err(WorkspaceError::UnknownContig(contig.clone()));
            }
            if !seen.insert(contig.as_str()) {
                return Err(WorkspaceError::ContigAlreadyGrouped {
                    contig: contig.clone(),
                    group: name,
                });
            }
            if let Some(group) = self.workspaces.values().find_map(|ws| ws.group_of(contig)) {
                return Err(WorkspaceError::ContigAlreadyGrouped {
                    contig: contig.clone(),
                    group: group.name.clone(),
                });
            }
        }

        let count = contigs.len();
        let group = ChromosomeGroup::new(name.clone(), contigs, reference);
        self.update(reference, |ws| {
            ws.chromosome_groups.push(group);
            Ok(())
        })?;
        info!("Created chromosome group {name} on {reference} with {count} contig(s)");
        Ok(())
    }

    /// Delete a chromosome group
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::GroupNotFound` if the workspace has no such group.
    pub fn delete_group(&mut self, reference: &str, name: &str) -> Result<(), WorkspaceError> {
        self.update(reference, |ws| {
            let before = ws.chromosome_groups.len();
            ws.chromosome_groups.retain(|g| g.name != name);
            if ws.chromosome_groups.len() == before {
                return Err(WorkspaceError::GroupNotFound(name.to_string()));
            }
            Ok(())
        })
    }

    /// Show or hide a chromosome group
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::GroupNotFound` if the workspace has no such group.
    pub fn set_group_visible(
        &mut self,
        reference: &str,
        name: &str,
        visible: bool,
    ) -> Result<(), WorkspaceError> {
        self.update(reference, |ws| {
            let group = ws
                .chromosome_groups
                .iter_mut()
                .find(|g| g.name == name)
                .ok_or_else(|| WorkspaceError::GroupNotFound(name.to_string()))?;
            group.visible = visible;
            Ok(())
        })
    }

    /// Replace the contig order; also records a `Reorder` modification
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` for unknown references.
    pub fn set_contig_order(&mut self, reference: &str, order: ContigOrder) -> Result<(), WorkspaceError> {
        self.update(reference, |ws| {
            ws.contig_order = order;
            ws.modifications
                .push(ModificationRecord::new(Modification::Reorder));
            Ok(())
        })
    }

    /// Replace the selection
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` for unknown references.
    pub fn set_selection(&mut self, reference: &str, selection: Vec<String>) -> Result<(), WorkspaceError> {
        self.update(reference, |ws| {
            ws.selected_contigs = selection;
            Ok(())
        })
    }

    /// Replace the set of contigs marked uninformative
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` for unknown references.
    pub fn set_uninformative(
        &mut self,
        reference: &str,
        contigs: BTreeSet<String>,
    ) -> Result<(), WorkspaceError> {
        self.update(reference, |ws| {
            ws.uninformative_contigs = contigs;
            Ok(())
        })
    }

    /// Undo the most recent operation. Returns false if there was nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` for unknown references, or
    /// `WorkspaceError::GroupConflict` when the restored groups would reuse a
    /// group name or contig that another workspace has claimed since; the
    /// workspace is left unchanged in that case.
    pub fn undo(&mut self, reference: &str) -> Result<bool, WorkspaceError> {
        let mut draft = self.workspace(reference)?.clone();
        if !draft.pop_history() {
            return Ok(false);
        }
        let others = self
            .workspaces
            .iter()
            .filter(|(name, _)| name.as_str() != reference)
            .flat_map(|(_, ws)| &ws.chromosome_groups);
        if let Some(conflict) = find_group_conflict(others.chain(&draft.chromosome_groups)) {
            debug!("Undo on {reference} refused: {conflict}");
            return Err(conflict);
        }
        draft.saved = false;
        draft.last_modified = Some(Utc::now());
        self.workspaces.insert(reference.to_string(), draft);
        debug!("Undo on {reference}");
        Ok(true)
    }

    /// Mark the workspace as saved
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` for unknown references.
    pub fn mark_saved(&mut self, reference: &str) -> Result<(), WorkspaceError> {
        self.workspace(reference)?;
        if let Some(ws) = self.workspaces.get_mut(reference) {
            ws.saved = true;
        }
        Ok(())
    }

    /// Return one workspace to the state it had when first created
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` for unknown references.
    pub fn reset_workspace(&mut self, reference: &str) -> Result<(), WorkspaceError> {
        if !self.store.has_reference(reference) {
            return Err(WorkspaceError::UnknownReference(reference.to_string()));
        }
        let fresh = Workspace::new(reference, self.default_order(reference));
        self.workspaces.insert(reference.to_string(), fresh);
        info!("Reset workspace for {reference}");
        Ok(())
    }

    /// Drop every workspace; each is recreated with its default order on next access
    pub fn reset_all(&mut self) {
        info!("Resetting all {} workspaces", self.workspaces.len());
        self.workspaces.clear();
        self.pending_switch = None;
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.workspaces.values().any(|ws| !ws.saved)
    }

    pub fn active_reference(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn pending_switch(&self) -> Option<&SwitchRequest> {
        self.pending_switch.as_ref()
    }

    /// Ask to make `target` the active reference.
    ///
    /// If the current workspace has unsaved edits the switch is parked and a
    /// decision is requested; see [`WorkspaceManager::resolve_switch`].
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` if `target` does not exist.
    pub fn request_switch(&mut self, target: &str) -> Result<SwitchOutcome, WorkspaceError> {
        self.workspace(target)?;

        if let Some(current) = self.active.clone() {
            let unsaved = self.workspaces.get(&current).is_some_and(|ws| !ws.saved);
            if current != target && unsaved {
                let request = SwitchRequest {
                    from: current,
                    to: target.to_string(),
                };
                self.pending_switch = Some(request.clone());
                return Ok(SwitchOutcome::DecisionRequired(request));
            }
        }

        self.pending_switch = None;
        self.active = Some(target.to_string());
        Ok(SwitchOutcome::Switched {
            reference: target.to_string(),
        })
    }

    /// Answer a pending switch request
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::NoPendingSwitch` if no request is waiting.
    pub fn resolve_switch(&mut self, decision: SwitchDecision) -> Result<SwitchOutcome, WorkspaceError> {
        let request = self
            .pending_switch
            .take()
            .ok_or(WorkspaceError::NoPendingSwitch)?;

        match decision {
            SwitchDecision::Save => self.mark_saved(&request.from)?,
            SwitchDecision::Discard => self.reset_workspace(&request.from)?,
            SwitchDecision::Cancel => return Ok(SwitchOutcome::Cancelled),
        }

        self.active = Some(request.to.clone());
        Ok(SwitchOutcome::Switched {
            reference: request.to,
        })
    }

    /// Replace the whole workspace map, e.g. from a session document
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` if any key or the active
    /// reference is not in the dataset, or `WorkspaceError::GroupConflict` if
    /// two groups share a name or a contig; nothing is replaced in either case.
    pub fn restore(
        &mut self,
        workspaces: BTreeMap<String, Workspace>,
        active: Option<String>,
    ) -> Result<(), WorkspaceError> {
        if let Some(unknown) = workspaces
            .keys()
            .chain(active.iter())
            .find(|name| !self.store.has_reference(name))
        {
            return Err(WorkspaceError::UnknownReference(unknown.clone()));
        }
        if let Some(conflict) =
            find_group_conflict(workspaces.values().flat_map(|ws| &ws.chromosome_groups))
        {
            return Err(conflict);
        }

        self.workspaces = workspaces
            .into_iter()
            .map(|(name, mut ws)| {
                ws.reference.clone_from(&name);
                (name, ws)
            })
            .collect();
        self.active = active;
        self.pending_switch = None;
        info!("Restored {} workspaces", self.workspaces.len());
        Ok(())
    }
}

/// First group that reuses a name or a contig of an earlier group in `groups`
fn find_group_conflict<'a>(
    groups: impl IntoIterator<Item = &'a ChromosomeGroup>,
) -> Option<WorkspaceError> {
    let mut names = HashSet::new();
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for group in groups {
        if !names.insert(group.name.as_str()) {
            return Some(WorkspaceError::GroupConflict {
                group: group.name.clone(),
                detail: "the name is already in use".to_string(),
            });
        }
        for contig in &group.contigs {
            if let Some(owner) = owners.insert(contig.as_str(), group.name.as_str()) {
                return Some(WorkspaceError::GroupConflict {
                    group: group.name.clone(),
                    detail: format!("contig '{contig}' also belongs to '{owner}'"),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::{Alignment, Dataset, Query, Reference};

    fn manager() -> WorkspaceManager {
        let dataset = Dataset::new(
            vec![Reference::new("chr1", 10_000), Reference::new("chr2", 5_000)],
            vec![
                Query::new("q1", 1_000),
                Query::new("q2", 2_000),
                Query::new("q3", 500),
            ],
            vec![
                Alignment::new("chr1", "q2", (0, 2_000), (0, 2_000)),
                Alignment::new("chr1", "q1", (3_000, 4_000), (0, 1_000)),
                Alignment::new("chr2", "q3", (0, 500), (0, 500)),
            ],
        );
        WorkspaceManager::new(DataStore::new(dataset).unwrap())
    }

    #[test]
    fn test_workspace_created_lazily_with_default_order() {
        let mut mgr = manager();
        assert!(mgr.get("chr1").is_none());
        let ws = mgr.workspace("chr1").unwrap();
        assert!(ws.saved);
        assert_eq!(ws.contig_order.get("q1"), Some(&0));
        assert_eq!(ws.contig_order.get("q2"), Some(&1));
        assert!(!ws.contig_order.contains_key("q3"));
        assert!(matches!(
            mgr.workspace("chrZ"),
            Err(WorkspaceError::UnknownReference(_))
        ));
    }

    #[test]
    fn test_batch_is_one_history_entry() {
        let mut mgr = manager();
        mgr.add_modifications(
            "chr1",
            vec![Modification::invert("q1"), Modification::invert("q2")],
        )
        .unwrap();
        let ws = mgr.get("chr1").unwrap();
        assert_eq!(ws.modifications.len(), 2);
        assert_eq!(ws.history.len(), 1);
        assert!(!ws.saved);
        assert!(ws.last_modified.is_some());
    }

    #[test]
    fn test_rejected_batch_leaves_state_unchanged() {
        let mut mgr = manager();
        mgr.add_modification("chr1", Modification::invert("q1")).unwrap();
        let before = mgr.get("chr1").unwrap().clone();

        let err = mgr
            .add_modifications(
                "chr1",
                vec![Modification::invert("q2"), Modification::split("q2", 5_000)],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WorkspaceError::Modification {
                index: 1,
                source: ModificationError::InvalidBreakPosition { .. }
            }
        ));
        assert_eq!(mgr.get("chr1").unwrap(), &before);

        let err = mgr
            .add_modification("chr1", Modification::invert("ghost"))
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Modification { index: 0, .. }));
        assert_eq!(mgr.get("chr1").unwrap(), &before);
    }

    #[test]
    fn test_undo_restores_each_step() {
        let mut mgr = manager();
        let initial = mgr.workspace("chr1").unwrap().snapshot();

        mgr.add_modification("chr1", Modification::split("q2", 800)).unwrap();
        mgr.create_group("chr1", "chr1A", vec!["q2_1".to_string(), "q1".to_string()])
            .unwrap();
        mgr.set_uninformative("chr1", ["q2_2".to_string()].into_iter().collect())
            .unwrap();
        mgr.set_selection("chr1", vec!["q1".to_string()]).unwrap();
        let reordered: ContigOrder = [("q1".to_string(), 5)].into_iter().collect();
        mgr.set_contig_order("chr1", reordered).unwrap();

        for _ in 0..5 {
            assert!(mgr.undo("chr1").unwrap());
        }
        assert_eq!(mgr.get("chr1").unwrap().snapshot(), initial);
        assert!(!mgr.undo("chr1").unwrap());
    }

    #[test]
    fn test_group_validation() {
        let mut mgr = manager();
        mgr.create_group("chr1", "g1", vec!["q1".to_string()]).unwrap();

        assert_eq!(
            mgr.create_group("chr2", "g1", vec!["q3".to_string()]),
            Err(WorkspaceError::DuplicateGroupName("g1".to_string()))
        );
        assert_eq!(
            mgr.create_group("chr1", "g2", vec!["q1".to_string()]),
            Err(WorkspaceError::ContigAlreadyGrouped {
                contig: "q1".to_string(),
                group: "g1".to_string()
            })
        );
        assert_eq!(
            mgr.create_group("chr1", "g2", vec!["nope".to_string()]),
            Err(WorkspaceError::UnknownContig("nope".to_string()))
        );
        assert_eq!(mgr.create_group("chr1", "g2", vec![]), Err(WorkspaceError::EmptyGroup));
        assert!(matches!(
            mgr.create_group("chr1", " ", vec!["q2".to_string()]),
            Err(WorkspaceError::InvalidGroupName(NameError::Empty))
        ));
        assert_eq!(mgr.get("chr1").unwrap().history.len(), 1);

        mgr.set_group_visible("chr1", "g1", false).unwrap();
        assert!(!mgr.get("chr1").unwrap().group("g1").unwrap().visible);
        mgr.delete_group("chr1", "g1").unwrap();
        assert_eq!(
            mgr.delete_group("chr1", "g1"),
            Err(WorkspaceError::GroupNotFound("g1".to_string()))
        );
    }

    #[test]
    fn test_workspaces_are_isolated() {
        let mut mgr = manager();
        mgr.add_modification("chr1", Modification::invert("q1")).unwrap();
        let chr2 = mgr.workspace("chr2").unwrap();
        assert!(chr2.modifications.is_empty());
        assert!(chr2.saved);

        let working = mgr.working("chr2").unwrap();
        assert!(!working.query("q1").unwrap().is_inverted());
        let working = mgr.working("chr1").unwrap();
        assert!(working.query("q1").unwrap().is_inverted());
    }

    #[test]
    fn test_remove_modification() {
        let mut mgr = manager();
        mgr.add_modification("chr1", Modification::invert("q1")).unwrap();
        assert_eq!(
            mgr.remove_modification("chr1", 3),
            Err(WorkspaceError::ModificationIndexOutOfRange { index: 3, len: 1 })
        );
        mgr.remove_modification("chr1", 0).unwrap();
        assert!(mgr.get("chr1").unwrap().modifications.is_empty());
        assert_eq!(mgr.get("chr1").unwrap().history.len(), 2);
    }

    #[test]
    fn test_remove_refuses_to_orphan_later_entries() {
        let mut mgr = manager();
        mgr.add_modification("chr1", Modification::split("q1", 400)).unwrap();
        mgr.add_modification("chr1", Modification::invert("q1_1")).unwrap();

        // The inversion targets a segment that only the split creates
        assert_eq!(
            mgr.remove_modification("chr1", 0),
            Err(WorkspaceError::Modification {
                index: 1,
                source: ModificationError::UnknownQuery("q1_1".to_string()),
            })
        );
        let ws = mgr.get("chr1").unwrap();
        assert_eq!(ws.modifications.len(), 2);
        assert_eq!(ws.history.len(), 2);
        assert!(mgr.working("chr1").unwrap().query("q1_1").unwrap().inverted);

        // Removing the dependent entry first is fine
        mgr.remove_modification("chr1", 1).unwrap();
        mgr.remove_modification("chr1", 0).unwrap();
        assert!(mgr.get("chr1").unwrap().modifications.is_empty());
    }

    #[test]
    fn test_switch_protocol() {
        let mut mgr = manager();
        assert_eq!(
            mgr.request_switch("chr1").unwrap(),
            SwitchOutcome::Switched {
                reference: "chr1".to_string()
            }
        );

        // Saved workspace switches straight away
        mgr.request_switch("chr2").unwrap();
        assert_eq!(mgr.active_reference(), Some("chr2"));
        mgr.request_switch("chr1").unwrap();

        mgr.add_modification("chr1", Modification::invert("q1")).unwrap();
        let outcome = mgr.request_switch("chr2").unwrap();
        assert!(matches!(outcome, SwitchOutcome::DecisionRequired(_)));
        assert_eq!(mgr.active_reference(), Some("chr1"));

        assert_eq!(mgr.resolve_switch(SwitchDecision::Cancel).unwrap(), SwitchOutcome::Cancelled);
        assert_eq!(mgr.active_reference(), Some("chr1"));
        assert_eq!(mgr.get("chr1").unwrap().modifications.len(), 1);
        assert_eq!(
            mgr.resolve_switch(SwitchDecision::Save),
            Err(WorkspaceError::NoPendingSwitch)
        );

        mgr.request_switch("chr2").unwrap();
        mgr.resolve_switch(SwitchDecision::Save).unwrap();
        assert_eq!(mgr.active_reference(), Some("chr2"));
        assert!(mgr.get("chr1").unwrap().saved);
        assert_eq!(mgr.get("chr1").unwrap().modifications.len(), 1);

        mgr.add_modification("chr2", Modification::invert("q3")).unwrap();
        mgr.request_switch("chr1").unwrap();
        mgr.resolve_switch(SwitchDecision::Discard).unwrap();
        assert_eq!(mgr.active_reference(), Some("chr1"));
        let chr2 = mgr.get("chr2").unwrap();
        assert!(chr2.modifications.is_empty());
        assert!(chr2.history.is_empty());
        assert!(chr2.saved);
    }

    #[test]
    fn test_reset_all_recomputes_default_order() {
        let mut mgr = manager();
        mgr.set_contig_order("chr1", [("q2".to_string(), 0)].into_iter().collect())
            .unwrap();
        mgr.create_group("chr1", "g", vec!["q1".to_string()]).unwrap();
        mgr.reset_all();
        assert!(mgr.get("chr1").is_none());
        let ws = mgr.workspace("chr1").unwrap().clone();
        assert_eq!(ws.contig_order, mgr.default_order("chr1"));
        assert!(ws.chromosome_groups.is_empty());
        assert!(ws.history.is_empty());
    }

    #[test]
    fn test_restore_rejects_unknown_reference() {
        let mut mgr = manager();
        let mut map = BTreeMap::new();
        map.insert("chrZ".to_string(), Workspace::new("chrZ", ContigOrder::new()));
        assert_eq!(
            mgr.restore(map, None),
            Err(WorkspaceError::UnknownReference("chrZ".to_string()))
        );
        assert!(mgr.workspaces().is_empty());
    }

    #[test]
    fn test_undo_refuses_group_name_claimed_elsewhere() {
        let mut mgr = manager();
        mgr.create_group("chr1", "g1", vec!["q1".to_string()]).unwrap();
        mgr.delete_group("chr1", "g1").unwrap();
        mgr.create_group("chr2", "g1", vec!["q3".to_string()]).unwrap();

        let err = mgr.undo("chr1").unwrap_err();
        assert!(matches!(err, WorkspaceError::GroupConflict { ref group, .. } if group == "g1"));
        let chr1 = mgr.get("chr1").unwrap();
        assert!(chr1.chromosome_groups.is_empty());
        assert_eq!(chr1.history.len(), 2);
        assert_eq!(mgr.get("chr2").unwrap().group("g1").unwrap().contigs, vec!["q3"]);

        // Once the other workspace lets go of the name, undo goes through
        mgr.delete_group("chr2", "g1").unwrap();
        assert!(mgr.undo("chr1").unwrap());
        assert_eq!(mgr.get("chr1").unwrap().group("g1").unwrap().contigs, vec!["q1"]);
    }

    #[test]
    fn test_restore_rejects_clashing_groups() {
        let mut mgr = manager();
        let mut chr1 = Workspace::new("chr1", ContigOrder::new());
        chr1.chromosome_groups
            .push(ChromosomeGroup::new("g1", vec!["q1".to_string()], "chr1"));
        let mut chr2 = Workspace::new("chr2", ContigOrder::new());
        chr2.chromosome_groups
            .push(ChromosomeGroup::new("g1", vec!["q3".to_string()], "chr2"));
        let map: BTreeMap<String, Workspace> =
            [("chr1".to_string(), chr1.clone()), ("chr2".to_string(), chr2)].into_iter().collect();
        assert!(matches!(
            mgr.restore(map, None),
            Err(WorkspaceError::GroupConflict { ref group, .. }) if group == "g1"
        ));

        let mut chr2 = Workspace::new("chr2", ContigOrder::new());
        chr2.chromosome_groups
            .push(ChromosomeGroup::new("g2", vec!["q1".to_string()], "chr2"));
        let map: BTreeMap<String, Workspace> =
            [("chr1".to_string(), chr1), ("chr2".to_string(), chr2)].into_iter().collect();
        let err = mgr.restore(map, None).unwrap_err();
        assert!(err.to_string().contains("contig 'q1' also belongs to 'g1'"));
        assert!(mgr.workspaces().is_empty());
    }
}
