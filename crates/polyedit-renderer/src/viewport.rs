use serde::{Deserialize, Serialize};

use polyedit_core::{BBox, Point};

/// Pan/zoom state of the editing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Center X in image coordinates.
    pub center_x: f64,
    /// Center Y in image coordinates.
    pub center_y: f64,
    /// Screen pixels per image pixel.
    pub zoom: f64,
    /// Canvas width in screen pixels.
    pub canvas_width: f64,
    /// Canvas height in screen pixels.
    pub canvas_height: f64,
}

impl Viewport {
    pub const MIN_ZOOM: f64 = 0.01;
    pub const MAX_ZOOM: f64 = 1000.0;

    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            center_x: canvas_width / 2.0,
            center_y: canvas_height / 2.0,
            zoom: 1.0,
            canvas_width,
            canvas_height,
        }
    }

    /// Pan the viewport by a delta in screen pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center_x -= dx / self.zoom;
        self.center_y -= dy / self.zoom;
    }

    /// Zoom by `factor`, keeping the image point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: &Point, factor: f64) {
        let before = self.screen_to_image(screen);
        self.zoom = (self.zoom * factor).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        let after = self.screen_to_image(screen);
        self.center_x -= after.x - before.x;
        self.center_y -= after.y - before.y;
    }

    /// Center on `bbox` and zoom so it fills the canvas with a 10% margin.
    pub fn fit_bbox(&mut self, bbox: &BBox) {
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return;
        }
        let center = bbox.center();
        self.center_x = center.x;
        self.center_y = center.y;

        let zoom_x = self.canvas_width / bbox.width() * 0.9;
        let zoom_y = self.canvas_height / bbox.height() * 0.9;
        self.zoom = zoom_x.min(zoom_y).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
    }

    pub fn screen_to_image(&self, screen: &Point) -> Point {
        Point::new(
            (screen.x - self.canvas_width / 2.0) / self.zoom + self.center_x,
            (screen.y - self.canvas_height / 2.0) / self.zoom + self.center_y,
        )
    }

    pub fn image_to_screen(&self, image: &Point) -> Point {
        Point::new(
            (image.x - self.center_x) * self.zoom + self.canvas_width / 2.0,
            (image.y - self.center_y) * self.zoom + self.canvas_height / 2.0,
        )
    }

    /// Visible region in image coordinates.
    pub fn visible_bbox(&self) -> BBox {
        let half_w = self.canvas_width / (2.0 * self.zoom);
        let half_h = self.canvas_height / (2.0 * self.zoom);
        BBox::from_corners(
            self.center_x - half_w,
            self.center_y - half_h,
            self.center_x + half_w,
            self.center_y + half_h,
        )
    }

    /// Convert a length in screen pixels to image units.
    pub fn screen_to_image_distance(&self, pixels: f64) -> f64 {
        pixels / self.zoom
    }
}
