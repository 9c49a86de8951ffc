use serde::{Deserialize, Serialize};

use crate::engine::layout::{LayoutConfig, Viewport};
use crate::engine::visibility::VisibilitySettings;
use crate::view::interaction::{Camera, Mode};

/// Everything about how the active reference is displayed.
///
/// Saved in session documents next to the workspaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub visibility: VisibilitySettings,
    pub layout: LayoutConfig,
    pub viewport: Viewport,
    pub mode: Mode,
    pub camera: Camera,
}

impl ViewSettings {
    #[must_use]
    pub fn with_visibility(mut self, visibility: VisibilitySettings) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_falls_back_to_defaults() {
        let json = r#"{"visibility": {"min_unique_ratio": 0.2}, "mode": "scaffolding"}"#;
        let settings: ViewSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.visibility.min_unique_ratio, 0.2);
        assert_eq!(settings.visibility.display_cap, 500);
        assert_eq!(settings.mode, Mode::Scaffolding);
        assert_eq!(settings.camera, Camera::default());
        assert_eq!(settings.layout, LayoutConfig::default());
    }
}
