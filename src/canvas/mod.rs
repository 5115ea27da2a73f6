//! Headless drawing surface.
//!
//! Strokes are recorded as pointer samples and rasterized on demand with a
//! round brush, white ink on black, which is the layout MNIST models expect.

pub mod bitmap;

pub use bitmap::DrawingBitmap;

use crate::config::schema::CanvasConfig;
use image::{GrayImage, Luma};

/// A pointer position in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One continuous touch, from pointer down to pointer up
pub type Stroke = Vec<Point>;

/// In-memory drawing canvas
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    brush_radius: f32,
    strokes: Vec<Stroke>,
    current: Option<Stroke>,
}

impl Canvas {
    #[must_use]
    pub const fn new(config: &CanvasConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            brush_radius: config.brush_radius,
            strokes: Vec::new(),
            current: None,
        }
    }

    /// Start a stroke. An unfinished stroke is committed first.
    pub fn pointer_down(&mut self, point: Point) {
        if !point.is_finite() {
            return;
        }
        if let Some(stroke) = self.current.take() {
            self.strokes.push(stroke);
        }
        self.current = Some(vec![point]);
    }

    /// Extend the active stroke; ignored without a preceding `pointer_down`
    pub fn pointer_move(&mut self, point: Point) {
        if !point.is_finite() {
            return;
        }
        if let Some(stroke) = self.current.as_mut() {
            stroke.push(point);
        }
    }

    /// Finish the active stroke. Returns true when a gesture was completed.
    pub fn pointer_up(&mut self) -> bool {
        match self.current.take() {
            Some(stroke) => {
                self.strokes.push(stroke);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.current = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.current.is_none()
    }

    #[must_use]
    pub fn stroke_count(&self) -> usize {
        self.strokes.len() + usize::from(self.current.is_some())
    }

    /// Rasterize every stroke, including one still in progress
    #[must_use]
    pub fn snapshot(&self) -> DrawingBitmap {
        let mut image = GrayImage::new(self.width, self.height);
        for stroke in self.strokes.iter().chain(self.current.as_ref()) {
            self.draw_stroke(&mut image, stroke);
        }
        DrawingBitmap::new(image)
    }

    fn draw_stroke(&self, image: &mut GrayImage, stroke: &[Point]) {
        let Some(first) = stroke.first() else {
            return;
        };
        self.stamp(image, *first);

        // Stamp spacing of half a radius keeps the line solid
        let step = (self.brush_radius * 0.5).max(0.5);
        for pair in stroke.windows(2) {
            // Only the part that can leave ink is stepped, so stamp count is
            // bounded by the canvas size however far the pointer went
            let Some((a, b)) = self.clip_segment(pair[0], pair[1]) else {
                continue;
            };
            let length = (b.x - a.x).hypot(b.y - a.y);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let steps = (length / step).ceil().max(1.0) as u32;
            for i in 0..=steps {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f32 / steps as f32;
                self.stamp(
                    image,
                    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t),
                );
            }
        }
    }

    /// Liang-Barsky clip against the canvas grown by the brush radius
    fn clip_segment(&self, a: Point, b: Point) -> Option<(Point, Point)> {
        let r = self.brush_radius.max(0.5);
        #[allow(clippy::cast_precision_loss)]
        let (max_x, max_y) = (self.width as f32 + r, self.height as f32 + r);
        let (dx, dy) = (b.x - a.x, b.y - a.y);

        let mut t0 = 0.0_f32;
        let mut t1 = 1.0_f32;
        for (p, q) in [
            (-dx, a.x + r),
            (dx, max_x - a.x),
            (-dy, a.y + r),
            (dy, max_y - a.y),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let t = q / p;
                if p < 0.0 {
                    t0 = t0.max(t);
                } else {
                    t1 = t1.min(t);
                }
            }
        }

        if t0 > t1 {
            return None;
        }
        let at = |t: f32| Point::new(a.x + dx * t, a.y + dy * t);
        Some((at(t0), at(t1)))
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn stamp(&self, image: &mut GrayImage, center: Point) {
        let r = self.brush_radius.max(0.5);
        let min_x = (center.x - r).floor().max(0.0) as u32;
        let min_y = (center.y - r).floor().max(0.0) as u32;
        let max_x = ((center.x + r).ceil().max(0.0) as u32).min(self.width.saturating_sub(1));
        let max_y = ((center.y + r).ceil().max(0.0) as u32).min(self.height.saturating_sub(1));

        if center.x + r < 0.0 || center.y + r < 0.0 || min_x > max_x || min_y > max_y {
            return;
        }

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                if dx * dx + dy * dy <= r * r {
                    image.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }
}
