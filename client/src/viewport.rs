//! Pan/zoom state and the controller that drives it from input events.
//!
//! Rendering convention: the canvas element is placed so its unscaled center
//! sits at `offset`, then scaled from its top-left corner. The rendered rect
//! is therefore `left = offset_x - width / 2`, `top = offset_y - height / 2`,
//! sized `width * scale` by `height * scale`.

use crate::coords::{Point, Rect};
use crate::input::{InputEvent, InputPort, InputSubscription};

pub const MAX_SCALE: f64 = 40.0;

/// Lower bound on `min_scale` regardless of layout.
pub const MIN_SCALE_FLOOR: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Fixed dimensions the viewport is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportLayout {
    pub container: Size,
    pub canvas: Size,
    /// Size of each neighbouring world drawn around the center canvas.
    pub surrounding: Size,
}

impl Default for ViewportLayout {
    fn default() -> Self {
        Self {
            container: Size::new(1072.0, 804.0),
            canvas: Size::new(518.0, 396.0),
            surrounding: Size::new(256.0, 192.0),
        }
    }
}

impl ViewportLayout {
    /// Smallest scale at which the canvas plus its neighbours fill the container.
    pub fn min_scale(&self) -> f64 {
        let width_scale = self.container.width / (self.canvas.width + self.surrounding.width * 2.0);
        let height_scale =
            self.container.height / (self.canvas.height + self.surrounding.height * 2.0);
        width_scale.max(height_scale).max(MIN_SCALE_FLOOR)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    offset_x: f64,
    offset_y: f64,
    scale: f64,
    min_scale: f64,
    max_scale: f64,
    layout: ViewportLayout,
}

impl Viewport {
    /// Starts at the minimum scale, centered in the container.
    pub fn new(layout: ViewportLayout) -> Self {
        let min_scale = layout.min_scale();
        let mut viewport = Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: min_scale,
            min_scale,
            max_scale: MAX_SCALE,
            layout,
        };
        viewport.center();
        viewport
    }

    pub fn offset(&self) -> Point {
        Point::new(self.offset_x, self.offset_y)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    pub fn layout(&self) -> &ViewportLayout {
        &self.layout
    }

    /// Restore a transform, e.g. from a previous session. Scale is clamped.
    pub fn set_transform(&mut self, offset: Point, scale: f64) {
        self.offset_x = offset.x;
        self.offset_y = offset.y;
        self.scale = self.clamp_scale(scale);
    }

    /// Center the canvas in the container, compensating for the scale.
    pub fn center(&mut self) {
        let ViewportLayout {
            container, canvas, ..
        } = self.layout;
        self.offset_x = container.width / 2.0 - (self.scale - 1.0) * canvas.width / 2.0;
        self.offset_y = container.height / 2.0 - (self.scale - 1.0) * canvas.height / 2.0;
    }

    /// Switch to a canvas of a different size and re-center.
    pub fn resize_canvas(&mut self, canvas: Size) {
        self.layout.canvas = canvas;
        self.min_scale = self.layout.min_scale();
        self.scale = self.clamp_scale(self.scale);
        self.center();
    }

    /// Bounding box of the rendered canvas in container coordinates.
    pub fn canvas_rect(&self) -> Rect {
        let canvas = self.layout.canvas;
        Rect {
            left: self.offset_x - canvas.width / 2.0,
            top: self.offset_y - canvas.height / 2.0,
            width: canvas.width * self.scale,
            height: canvas.height * self.scale,
        }
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Change scale keeping the canvas point under `anchor` fixed on screen.
    /// The anchor is clamped to the canvas rect first.
    pub fn zoom_at(&mut self, new_scale: f64, anchor: Point) {
        let new_scale = self.clamp_scale(new_scale);
        let rect = self.canvas_rect();
        let anchor_x = anchor.x.clamp(rect.left, rect.right());
        let anchor_y = anchor.y.clamp(rect.top, rect.bottom());

        // Fraction of the unscaled canvas under the anchor.
        let frac_x = (anchor_x - rect.left) / rect.width;
        let frac_y = (anchor_y - rect.top) / rect.height;

        let canvas = self.layout.canvas;
        let new_left = anchor_x - frac_x * canvas.width * new_scale;
        let new_top = anchor_y - frac_y * canvas.height * new_scale;

        self.scale = new_scale;
        self.offset_x = new_left + canvas.width / 2.0;
        self.offset_y = new_top + canvas.height / 2.0;
    }

    /// Wheel zoom with a logarithmic response, anchored on the cursor.
    pub fn wheel(&mut self, delta_y: f64, cursor: Point) {
        let direction = if delta_y > 0.0 { 1.0 } else { -1.0 };
        let scaler = (1.0 + delta_y.abs() * 2.0).log2() * direction;
        let new_scale = self.scale * (1.0 - 0.01 * scaler);
        self.zoom_at(new_scale, cursor);
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        if !scale.is_finite() {
            return self.scale;
        }
        scale.clamp(self.min_scale, self.max_scale)
    }
}

#[derive(Debug, Clone, Copy)]
struct Pinch {
    initial_distance: f64,
    start_scale: f64,
}

/// Owns the viewport and the input port; every dispatched event first
/// updates pan/zoom, then reaches the port's subscribers.
pub struct ViewportController {
    viewport: Viewport,
    port: InputPort,
    drag: Option<Point>,
    pinch: Option<Pinch>,
    drag_intercept: bool,
}

impl ViewportController {
    pub fn new(layout: ViewportLayout) -> Self {
        Self {
            viewport: Viewport::new(layout),
            port: InputPort::new(),
            drag: None,
            pinch: None,
            drag_intercept: false,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn subscribe(&self) -> InputSubscription {
        self.port.subscribe()
    }

    pub fn port(&self) -> &InputPort {
        &self.port
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// While set, a pointer-down does not start a drag-pan (eraser, or a
    /// creation mode waiting for a position).
    pub fn set_drag_intercept(&mut self, intercept: bool) {
        self.drag_intercept = intercept;
        if intercept {
            self.drag = None;
        }
    }

    pub fn dispatch(&mut self, event: InputEvent) {
        self.apply(&event);
        self.port.publish(event);
    }

    fn apply(&mut self, event: &InputEvent) {
        match event {
            InputEvent::PointerDown(at) => {
                if !self.drag_intercept {
                    self.drag = Some(*at);
                }
            }
            InputEvent::PointerMove(at) => {
                if let Some(previous) = self.drag {
                    self.viewport.pan(at.x - previous.x, at.y - previous.y);
                    self.drag = Some(*at);
                }
            }
            InputEvent::PointerUp(_) => {
                self.drag = None;
            }
            InputEvent::Wheel { delta_y, at } => {
                self.viewport.wheel(*delta_y, *at);
            }
            InputEvent::TouchStart(touches) => {
                if let [a, b] = touches.as_slice() {
                    self.pinch = Some(Pinch {
                        initial_distance: a.distance(*b),
                        start_scale: self.viewport.scale(),
                    });
                }
            }
            InputEvent::TouchMove(touches) => {
                if let [a, b] = touches.as_slice() {
                    self.pinch_move(*a, *b);
                }
            }
            InputEvent::Click(_) | InputEvent::Hover(_) => {}
        }
    }

    fn pinch_move(&mut self, a: Point, b: Point) {
        let Some(pinch) = self.pinch else {
            return;
        };
        if pinch.initial_distance <= 0.0 {
            return;
        }
        let new_scale = a.distance(b) / pinch.initial_distance * pinch.start_scale;
        self.viewport.zoom_at(new_scale, a.midpoint(b));
        // Whole pixels avoid seams between neighbouring canvases.
        let offset = self.viewport.offset();
        self.viewport.offset_x = offset.x.round();
        self.viewport.offset_y = offset.y.round();
    }
}
