//! Display state shared with the renderer.
//!
//! - [`interaction::InteractionController`]: exploration/scaffolding mode,
//!   camera zoom and pan
//! - [`settings::ViewSettings`]: filter thresholds, layout parameters,
//!   viewport, mode and camera as stored in a session document

pub mod interaction;
pub mod settings;
