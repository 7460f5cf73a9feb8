//! # Drawing surface
//!
//! The engine does not draw. It mutates the [`Scene`] a surface owns, flips the surface between
//! its interactive and performance settings, and asks it to render or rasterize.

mod memory;

pub use memory::MemorySurface;

use crate::scene::{Scene, TextBody};

#[derive(thiserror::Error, Debug)]
pub enum SurfaceError {
    #[error("surface has no area")]
    Empty,
    #[error("raster of {0}x{1} exceeds the size limit")]
    TooLarge(u32, u32),
}

/// Behavior toggles, swapped wholesale when the user starts or stops moving things.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SurfaceSettings {
    /// Re-render automatically when objects are added or removed.
    pub render_on_add_remove: bool,
    /// Skip hit-testing pointer events against objects.
    pub skip_target_find: bool,
    /// Allow marquee selection.
    pub selection: bool,
}
impl SurfaceSettings {
    #[must_use]
    pub fn interactive() -> Self {
        Self {
            render_on_add_remove: true,
            skip_target_find: false,
            selection: true,
        }
    }
    #[must_use]
    pub fn performance() -> Self {
        Self {
            render_on_add_remove: false,
            skip_target_find: true,
            selection: false,
        }
    }
}
impl Default for SurfaceSettings {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Zoom and pan of the view onto the scene.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Viewport {
    pub zoom: f64,
    pub pan: [f64; 2],
}
impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: [0.0; 2],
        }
    }
}
impl Viewport {
    /// Change zoom while keeping the scene point under `point` (view space) fixed.
    pub fn zoom_to_point(&mut self, point: [f64; 2], zoom: f64) {
        let ratio = zoom / self.zoom;
        self.pan = [
            point[0] - (point[0] - self.pan[0]) * ratio,
            point[1] - (point[1] - self.pan[1]) * ratio,
        ];
        self.zoom = zoom;
    }
    pub fn pan_by(&mut self, delta: [f64; 2]) {
        self.pan[0] += delta[0];
        self.pan[1] += delta[1];
    }
    /// View-space point to scene space.
    #[must_use]
    pub fn to_scene(&self, point: [f64; 2]) -> [f64; 2] {
        [
            (point[0] - self.pan[0]) / self.zoom,
            (point[1] - self.pan[1]) / self.zoom,
        ]
    }
}

pub trait Surface: Send {
    fn scene(&self) -> &Scene;
    fn scene_mut(&mut self) -> &mut Scene;
    fn replace_scene(&mut self, scene: Scene);

    fn settings(&self) -> SurfaceSettings;
    fn set_settings(&mut self, settings: SurfaceSettings);
    fn viewport(&self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);

    /// Canvas size in logical pixels.
    fn size(&self) -> [f64; 2];
    fn set_size(&mut self, size: [f64; 2]);
    fn device_pixel_ratio(&self) -> f64;

    /// Render synchronously.
    fn render_all(&mut self);
    /// Ask for a render at the next animation frame. Multiple requests coalesce.
    fn request_render(&mut self);
    /// Whether a requested render has not happened yet.
    fn render_pending(&self) -> bool;

    /// Laid-out `[width, height]` of a text body at scale 1.
    fn measure_text(&self, body: &TextBody) -> [f64; 2];
    /// Render the whole scene at `multiplier` times the logical canvas size.
    fn rasterize(&mut self, multiplier: f64) -> Result<image::RgbaImage, SurfaceError>;
}
