//! One interactive curation session.
//!
//! [`CurationSession`] bundles the loaded [`DataStore`], the per-reference
//! workspaces, the interaction controller and the display settings, and answers
//! the renderer's single query, [`CurationSession::frame`].

use std::collections::HashMap;

use tracing::{debug, info};

use crate::catalog::store::DataStore;
use crate::engine::frame::{build_frame, Frame, FrameError};
use crate::engine::modification::apply;
use crate::export::changelog::ChangeLog;
use crate::export::scaffold::ScaffoldDocument;
use crate::export::session::{SessionDocument, SessionError};
use crate::view::interaction::InteractionController;
use crate::view::settings::ViewSettings;
use crate::workspace::manager::{
    SwitchDecision, SwitchOutcome, WorkspaceError, WorkspaceManager,
};

#[derive(Debug)]
pub struct CurationSession {
    manager: WorkspaceManager,
    controller: InteractionController,
    settings: ViewSettings,
}

impl CurationSession {
    pub fn new(store: DataStore) -> Self {
        Self {
            manager: WorkspaceManager::new(store),
            controller: InteractionController::new(),
            settings: ViewSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ViewSettings) -> Self {
        self.apply_settings(settings);
        self
    }

    pub fn store(&self) -> &DataStore {
        self.manager.store()
    }

    pub fn manager(&self) -> &WorkspaceManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut WorkspaceManager {
        &mut self.manager
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    /// Current settings with the controller's live mode and camera
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            mode: self.controller.mode(),
            camera: self.controller.camera(),
            ..self.settings.clone()
        }
    }

    /// Replace all display settings; mode and camera go to the controller
    pub fn apply_settings(&mut self, settings: ViewSettings) {
        self.controller.set_mode(settings.mode);
        self.controller.restore_camera(settings.camera);
        self.settings = settings;
    }

    /// Active reference, or the first reference of the dataset when none was selected
    pub fn active_reference(&self) -> Option<String> {
        self.manager
            .active_reference()
            .map(str::to_string)
            .or_else(|| self.store().references().first().map(|r| r.name.clone()))
    }

    /// Ask to switch the active reference; see [`WorkspaceManager::request_switch`]
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::UnknownReference` for unknown references.
    pub fn select(&mut self, reference: &str) -> Result<SwitchOutcome, WorkspaceError> {
        self.manager.request_switch(reference)
    }

    /// # Errors
    ///
    /// Returns `WorkspaceError::NoPendingSwitch` if nothing is waiting.
    pub fn resolve_switch(&mut self, decision: SwitchDecision) -> Result<SwitchOutcome, WorkspaceError> {
        self.manager.resolve_switch(decision)
    }

    /// Build the frame for `reference`, or the active reference when `None`
    ///
    /// # Errors
    ///
    /// Returns `FrameError::NoReference` for an empty dataset, or any error
    /// from deriving, filtering or laying out the reference.
    pub fn frame(&mut self, reference: Option<&str>) -> Result<Frame, FrameError> {
        let reference = match reference {
            Some(name) => name.to_string(),
            None => self.active_reference().ok_or(FrameError::NoReference)?,
        };
        let working = self.manager.working(&reference)?;
        let settings = self.view_settings();
        let workspace = self.manager.workspace(&reference)?;
        let frame = build_frame(&working, &reference, &settings, workspace)?;
        debug!(
            "Frame for {reference}: {} contigs, {} segments",
            frame.layout.contigs.len(),
            frame.segments.len()
        );
        Ok(frame)
    }

    /// Drop every workspace and reset the camera
    pub fn reset_all(&mut self) {
        self.manager.reset_all();
        self.controller.reset_camera();
    }

    /// Swap in a new dataset; all edits are discarded
    pub fn reload(&mut self, store: DataStore) {
        self.manager.reload(store);
        self.controller.reset_camera();
    }

    pub fn export_session(&self) -> SessionDocument {
        SessionDocument::capture(&self.manager, &self.view_settings())
    }

    /// Restore workspaces and settings from a session document
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not fit the loaded dataset; the
    /// session is unchanged in that case.
    pub fn restore_session(&mut self, document: SessionDocument) -> Result<(), SessionError> {
        let settings = document.restore(&mut self.manager)?;
        self.apply_settings(settings);
        info!("Session restored");
        Ok(())
    }

    pub fn scaffold(&self) -> ScaffoldDocument {
        ScaffoldDocument::from_workspaces(self.manager.workspaces().values())
    }

    pub fn changelog(&self) -> ChangeLog {
        let lengths = self.contig_lengths();
        ChangeLog::from_workspaces(self.manager.workspaces().values(), |reference, contig| {
            lengths
                .get(reference)
                .and_then(|by_name| by_name.get(contig))
                .copied()
        })
    }

    /// Length of every contig name that exists at any point while replaying
    /// each workspace's modifications, keyed by reference
    fn contig_lengths(&self) -> HashMap<String, HashMap<String, u64>> {
        let original = self.store().dataset();
        let mut result = HashMap::new();
        for (reference, workspace) in self.manager.workspaces() {
            let mut lengths: HashMap<String, u64> = original
                .queries
                .iter()
                .map(|q| (q.name.clone(), q.length))
                .collect();
            let mut working = original.clone();
            for record in &workspace.modifications {
                if apply(&mut working, &record.modification).is_ok() {
                    for query in &working.queries {
                        lengths.entry(query.name.clone()).or_insert(query.length);
                    }
                }
            }
            result.insert(reference.clone(), lengths);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::{Alignment, Dataset, Query, Reference};
    use crate::core::modification::Modification;
    use crate::view::interaction::{Mode, Point};

    fn session() -> CurationSession {
        let dataset = Dataset::new(
            vec![Reference::new("chr1", 10_000_000), Reference::new("chr2", 5_000_000)],
            vec![Query::new("q1", 2_000_000), Query::new("q2", 3_000_000)],
            vec![
                Alignment::new("chr1", "q1", (0, 1_500_000), (0, 1_500_000)),
                Alignment::new("chr1", "q2", (4_000_000, 4_100_000), (0, 100_000)),
                Alignment::new("chr2", "q2", (0, 3_000_000), (0, 3_000_000)),
            ],
        );
        CurationSession::new(DataStore::new(dataset).unwrap())
    }

    #[test]
    fn test_frame_defaults_to_first_reference() {
        let mut s = session();
        let frame = s.frame(None).unwrap();
        assert_eq!(frame.reference, "chr1");
        assert_eq!(frame.allowed.len(), 1);

        s.select("chr2").unwrap();
        assert_eq!(s.frame(None).unwrap().reference, "chr2");
        assert!(matches!(
            s.frame(Some("chrZ")),
            Err(FrameError::Workspace(WorkspaceError::UnknownReference(_)))
        ));
    }

    #[test]
    fn test_grouping_q2_makes_it_visible() {
        let mut s = session();
        s.manager_mut()
            .create_group("chr1", "chr1A", vec!["q2".to_string()])
            .unwrap();
        let frame = s.frame(Some("chr1")).unwrap();
        assert!(frame.allowed.contains("q2"));
    }

    #[test]
    fn test_view_settings_follow_controller() {
        let mut s = session();
        s.controller_mut().zoom_to(4.0, Point::default());
        s.controller_mut().set_mode(Mode::Scaffolding);
        let settings = s.view_settings();
        assert_eq!(settings.camera.zoom, 4.0);
        assert_eq!(settings.mode, Mode::Scaffolding);
        assert_eq!(s.frame(None).unwrap().camera.zoom, 4.0);
    }

    #[test]
    fn test_changelog_lengths_follow_replay() {
        let mut s = session();
        s.manager_mut()
            .add_modification("chr1", Modification::split("q1", 500_000))
            .unwrap();
        s.manager_mut()
            .add_modification("chr1", Modification::invert("q1_2"))
            .unwrap();
        let log = s.changelog();
        assert_eq!(log.rows.len(), 2);
        assert_eq!(log.rows[0].length, Some(2_000_000));
        assert_eq!(log.rows[1].length, Some(1_500_000));
    }

    #[test]
    fn test_session_round_trip_through_curation_session() {
        let mut s = session();
        s.manager_mut()
            .add_modification("chr2", Modification::invert("q2"))
            .unwrap();
        s.controller_mut().pan_by(10.0, 20.0);
        let doc = s.export_session();

        let mut restored = session();
        restored.restore_session(doc).unwrap();
        assert_eq!(restored.view_settings(), s.view_settings());
        assert_eq!(restored.manager().workspaces(), s.manager().workspaces());

        restored.reset_all();
        assert!(restored.manager().workspaces().is_empty());
        assert_eq!(restored.controller().camera().zoom, 1.0);
    }
}
