use std::sync::mpsc::{channel, Receiver, Sender};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smallest allowed zoom factor
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor
pub const MAX_ZOOM: f64 = 10.0;

/// What pointer gestures do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Gestures move the camera
    #[default]
    Exploration,
    /// Gestures edit data; the camera is frozen
    Scaffolding,
}

/// A point in screen pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Zoom and pan applied by the renderer on top of the layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub zoom: f64,
    pub pan: Point,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::default(),
        }
    }
}

/// Zoom limits and wheel sensitivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,

    /// Zoom change per unit of wheel delta; the factor applied is `exp(-delta * sensitivity)`
    pub sensitivity: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            sensitivity: 0.001,
        }
    }
}

/// Mode flag plus camera state.
///
/// Camera operations return the new [`Camera`] when they change it and `None`
/// when they are ignored. Every change is also sent to each subscriber
/// registered with [`InteractionController::subscribe`].
#[derive(Debug, Default)]
pub struct InteractionController {
    mode: Mode,
    camera: Camera,
    config: ZoomConfig,
    drag_anchor: Option<Point>,
    subscribers: Vec<Sender<Camera>>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: ZoomConfig) -> Self {
        self.config = config;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Receive every camera change from now on
    pub fn subscribe(&mut self) -> Receiver<Camera> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Switch modes. Leaving exploration ends any drag in progress.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            debug!("Interaction mode: {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        if mode != Mode::Exploration {
            self.drag_anchor = None;
        }
    }

    /// Replace the camera (e.g. when restoring a session), clamping the zoom
    pub fn restore_camera(&mut self, camera: Camera) {
        self.camera = Camera {
            zoom: self.clamp(camera.zoom),
            pan: camera.pan,
        };
        self.drag_anchor = None;
    }

    fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.camera.zoom;
        }
        zoom.clamp(self.config.min_zoom, self.config.max_zoom)
    }

    fn publish(&mut self) -> Option<Camera> {
        let camera = self.camera;
        self.subscribers.retain(|tx| tx.send(camera).is_ok());
        Some(camera)
    }

    /// Zoom to `target`, keeping the point under `cursor` fixed on screen
    pub fn zoom_to(&mut self, target: f64, cursor: Point) -> Option<Camera> {
        if self.mode != Mode::Exploration {
            return None;
        }
        let old_zoom = self.camera.zoom;
        let new_zoom = self.clamp(target);
        if (new_zoom - old_zoom).abs() < f64::EPSILON {
            return None;
        }
        let ratio = new_zoom / old_zoom;
        let pan = self.camera.pan;
        self.camera = Camera {
            zoom: new_zoom,
            pan: Point::new(
                cursor.x - (cursor.x - pan.x) * ratio,
                cursor.y - (cursor.y - pan.y) * ratio,
            ),
        };
        self.publish()
    }

    /// Apply a wheel or pinch delta at `cursor`. Negative deltas zoom in.
    pub fn zoom_by(&mut self, delta: f64, cursor: Point) -> Option<Camera> {
        let factor = (-delta * self.config.sensitivity).exp();
        self.zoom_to(self.camera.zoom * factor, cursor)
    }

    /// Pointer pressed at `at`
    pub fn begin_drag(&mut self, at: Point) {
        if self.mode == Mode::Exploration {
            self.drag_anchor = Some(at);
        }
    }

    /// Pointer moved to `to` while held; pan accumulates the delta
    pub fn drag_to(&mut self, to: Point) -> Option<Camera> {
        if self.mode != Mode::Exploration {
            return None;
        }
        let from = self.drag_anchor.replace(to)?;
        self.pan_by(to.x - from.x, to.y - from.y)
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    /// Shift the camera by a pixel delta
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Option<Camera> {
        if self.mode != Mode::Exploration || (dx == 0.0 && dy == 0.0) {
            return None;
        }
        self.camera.pan.x += dx;
        self.camera.pan.y += dy;
        self.publish()
    }

    /// Back to zoom 1 with no pan. Allowed in either mode.
    pub fn reset_camera(&mut self) -> Option<Camera> {
        self.drag_anchor = None;
        if self.camera == Camera::default() {
            return None;
        }
        self.camera = Camera::default();
        self.publish()
    }
}
