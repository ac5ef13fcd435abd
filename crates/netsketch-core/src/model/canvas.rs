//! Canvas view transform and display toggles.

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest zoom factor the view accepts.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom factor the view accepts.
pub const MAX_ZOOM: f64 = 5.0;
/// Default grid spacing in world units.
pub const GRID_SIZE: f64 = 20.0;

/// View state of the drawing surface.
///
/// `panX`/`panY` are the screen-space translation, `zoom` the uniform scale.
/// A world point `p` lands on screen at `pan + p * zoom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasView {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    /// Viewport width in screen pixels.
    pub width: f64,
    /// Viewport height in screen pixels.
    pub height: f64,
    pub grid_visible: bool,
    pub snap_to_grid: bool,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            width: 1280.0,
            height: 800.0,
            grid_visible: true,
            snap_to_grid: false,
        }
    }
}

impl CanvasView {
    fn offset(&self) -> Vec2 {
        Vec2::new(self.pan_x, self.pan_y)
    }

    /// World to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset()) * Affine::scale(self.zoom)
    }

    /// Screen to world transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset())
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// The view after zooming by `factor` while keeping `screen_point` fixed.
    pub fn zoomed_at(&self, screen_point: Point, factor: f64) -> Self {
        let mut next = self.clone();
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return next;
        }

        let world_point = self.screen_to_world(screen_point);
        next.zoom = new_zoom;

        let new_screen = next.world_to_screen(world_point);
        next.pan_x += screen_point.x - new_screen.x;
        next.pan_y += screen_point.y - new_screen.y;
        next
    }

    /// The view that frames `bounds` inside the viewport with `padding` pixels
    /// on each side. Zero-area bounds reset zoom and pan.
    pub fn fitted_to(&self, bounds: Rect, padding: f64) -> Self {
        let mut next = self.clone();
        if bounds.is_zero_area() {
            next.zoom = 1.0;
            next.pan_x = 0.0;
            next.pan_y = 0.0;
            return next;
        }

        let usable_width = (self.width - padding * 2.0).max(1.0);
        let usable_height = (self.height - padding * 2.0).max(1.0);
        let scale_x = usable_width / bounds.width();
        let scale_y = usable_height / bounds.height();
        next.zoom = scale_x.min(scale_y).clamp(MIN_ZOOM, MAX_ZOOM);

        let center = bounds.center();
        next.pan_x = self.width / 2.0 - center.x * next.zoom;
        next.pan_y = self.height / 2.0 - center.y * next.zoom;
        next
    }
}

/// Snap a point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    if grid_size <= 0.0 {
        return point;
    }
    Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}
