use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::engine::layout::{compute_layout, DrawSegment, Layout, LayoutError};
use crate::engine::modification::{Rejection, WorkingDataset};
use crate::engine::visibility::{compute_allowed, ContigVisibility};
use crate::view::interaction::{Camera, Mode};
use crate::view::settings::ViewSettings;
use crate::workspace::manager::WorkspaceError;
use crate::workspace::state::Workspace;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("No reference selected")]
    NoReference,

    #[error("Workspace belongs to '{workspace}', not '{reference}'")]
    WorkspaceMismatch { workspace: String, reference: String },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Everything the renderer needs to draw one reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub reference: String,
    pub allowed: BTreeSet<String>,
    pub contigs: Vec<ContigVisibility>,
    pub capped_count: usize,
    pub cap_applied: bool,
    pub layout: Layout,
    pub segments: Vec<DrawSegment>,
    pub mode: Mode,
    pub camera: Camera,

    /// Recorded modifications that could not be applied
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<Rejection>,
}

/// Filter, lay out and build the draw list for `reference`.
///
/// The same allowed set restricts both the layout's contigs and the draw list.
///
/// # Errors
///
/// Returns `FrameError::WorkspaceMismatch` when `workspace` is for another
/// reference, or any `LayoutError`.
pub fn build_frame(
    working: &WorkingDataset,
    reference: &str,
    settings: &ViewSettings,
    workspace: &Workspace,
) -> Result<Frame, FrameError> {
    if workspace.reference != reference {
        return Err(FrameError::WorkspaceMismatch {
            workspace: workspace.reference.clone(),
            reference: reference.to_string(),
        });
    }

    let report = compute_allowed(&working.dataset, reference, workspace, &settings.visibility);
    let layout = compute_layout(
        &working.dataset,
        reference,
        &report.allowed,
        &workspace.contig_order,
        settings.viewport,
        &settings.layout,
    )?;
    let segments = layout.segments(&working.dataset);

    Ok(Frame {
        reference: reference.to_string(),
        allowed: report.allowed,
        contigs: report.contigs,
        capped_count: report.capped_count,
        cap_applied: report.cap_applied,
        layout,
        segments,
        mode: settings.mode,
        camera: settings.camera,
        rejections: working.rejections.clone(),
    })
}
