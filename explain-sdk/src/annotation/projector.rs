//! World-to-screen projection and label layout
//!
//! Positions are in CSS-style pixels: origin at the top-left of the canvas,
//! y growing downwards.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Offset from the anchor to the connector's elbow
pub const ELBOW_OFFSET: Vec2 = Vec2::new(40.0, -40.0);

/// Offset from the anchor to the label's origin
pub const LABEL_OFFSET: Vec2 = Vec2::new(120.0, -40.0);

/// View and projection matrices of the scene camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Camera {
    /// Right-handed perspective camera looking from `eye` at `target`
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, up),
            projection: Mat4::perspective_rh_gl(fov_y_degrees.to_radians(), aspect, near, far),
        }
    }

    pub fn from_matrices(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space ray through a point in normalized device coordinates.
    ///
    /// Returns `(origin, direction)` with a unit direction, or `None` when the
    /// matrices are degenerate.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<(Vec3, Vec3)> {
        let inverse = self.view_projection().inverse();
        let near = inverse * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
        let far = inverse * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);

        if near.w == 0.0 || far.w == 0.0 {
            return None;
        }

        let origin = near.truncate() / near.w;
        let direction = (far.truncate() / far.w - origin).normalize();
        direction.is_finite().then_some((origin, direction))
    }
}

/// Rendered (client) size of the canvas in CSS pixels.
///
/// Not the drawing-buffer size, which is larger by the device pixel ratio on
/// HiDPI screens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// On-page bounding rectangle of an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ElementRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    /// Whether a client-space point lies inside (edges included)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + self.height
    }
}

/// Project a world point to canvas pixels.
///
/// `None` when the point is behind the camera.
pub fn project(world: Vec3, camera: &Camera, canvas: CanvasSize) -> Option<Vec2> {
    let clip = camera.view_projection() * world.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }

    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x + 1.0) / 2.0 * canvas.width,
        (1.0 - ndc.y) / 2.0 * canvas.height,
    ))
}

/// Convert a pointer position to normalized device coordinates of `rect`
pub fn pointer_to_ndc(client_x: f32, client_y: f32, rect: ElementRect) -> Vec2 {
    Vec2::new(
        (client_x - rect.left) / rect.width * 2.0 - 1.0,
        -(client_y - rect.top) / rect.height * 2.0 + 1.0,
    )
}

/// Connector and label placement for one anchor
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    pub anchor: Vec2,
    pub elbow: Vec2,
    pub label_origin: Vec2,
    /// Anchor, elbow, label origin
    pub polyline: Vec<Vec2>,
}

pub fn label_layout(anchor: Vec2) -> LabelLayout {
    let elbow = anchor + ELBOW_OFFSET;
    let label_origin = anchor + LABEL_OFFSET;

    LabelLayout {
        anchor,
        elbow,
        label_origin,
        polyline: vec![anchor, elbow, label_origin],
    }
}
