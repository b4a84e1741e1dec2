//! Projection and camera for the viewport scene.
//!
//! The viewport is drawn with an orthographic projection whose extents are
//! the viewport's half size in pixels, so one world unit maps to one pixel
//! and the origin sits at the centre of the panel.

use glam::{Mat4, Vec3};

/// Default near plane distance.
pub const DEFAULT_NEAR: f32 = 0.0;
/// Default far plane distance. Deep enough for the debug sphere at z = -600.
pub const DEFAULT_FAR: f32 = 1000.0;

/// Orthographic projection described by its top/bottom/left/right planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoProjection {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthoProjection {
    /// Projection centred on the origin covering a `width` x `height` region.
    pub fn from_size(width: u32, height: u32) -> Self {
        let mut proj = Self {
            top: 0.0,
            bottom: 0.0,
            left: 0.0,
            right: 0.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        };
        proj.set_size(width, height);
        proj
    }

    /// Set the four side planes at once.
    pub fn set_tblr(&mut self, top: f32, bottom: f32, left: f32, right: f32) {
        self.top = top;
        self.bottom = bottom;
        self.left = left;
        self.right = right;
    }

    /// Recompute the side planes from a pixel size.
    pub fn set_size(&mut self, width: u32, height: u32) {
        let half_w = width as f32 * 0.5;
        let half_h = height as f32 * 0.5;
        self.set_tblr(half_h, -half_h, -half_w, half_w);
    }

    /// Horizontal half-extents as `(right, left)`.
    pub fn half_width(&self) -> (f32, f32) {
        (self.right, self.left)
    }

    /// Vertical half-extents as `(top, bottom)`.
    pub fn half_height(&self) -> (f32, f32) {
        (self.top, self.bottom)
    }

    /// Projection matrix with a `[0, 1]` depth range.
    pub fn matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(self.left, self.right, self.bottom, self.top, self.near, self.far)
    }
}

impl Default for OrthoProjection {
    fn default() -> Self {
        Self::from_size(1, 1)
    }
}

/// Fixed camera looking down -Z from the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneCamera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
}

impl SceneCamera {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
        }
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self::new()
    }
}
