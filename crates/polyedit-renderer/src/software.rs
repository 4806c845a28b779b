use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

use polyedit_core::kernel::simplify;
use polyedit_core::{Point, Polygon};

use crate::backend::{BackendCapabilities, FrameReport, RenderBackend, RendererError};
use crate::batch::{RenderBatch, RenderLevel};
use crate::color::Rgb;
use crate::instance::VertexInstance;
use crate::viewport::Viewport;

const FILL_ALPHA: f32 = 0.25;

/// CPU rasterizer backed by tiny-skia pixmaps.
///
/// Batches accumulate on a scene layer that is only cleared when a pass
/// starts, so a pass drawn over several frames builds up one picture. Each
/// frame's output is the scene layer with that frame's vertex markers on top.
pub struct SoftwareBackend {
    pixmap: Pixmap,
    scene: Pixmap,
    composited: bool,
    background: Color,
    transform: Transform,
    zoom: f32,
    frame: Option<FrameReport>,
    last_frame: FrameReport,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Result<Self, RendererError> {
        let pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSurface { width, height })?;
        let background = Color::from_rgba8(24, 24, 24, 255);
        let mut scene = pixmap.clone();
        scene.fill(background);
        Ok(Self {
            pixmap,
            scene,
            composited: false,
            background,
            transform: Transform::identity(),
            zoom: 1.0,
            frame: None,
            last_frame: FrameReport::default(),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Demultiplied RGBA at a device pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    pub fn last_frame(&self) -> FrameReport {
        self.last_frame
    }

    fn frame_mut(&mut self) -> Result<&mut FrameReport, RendererError> {
        self.frame.as_mut().ok_or(RendererError::FrameNotStarted)
    }

    /// Copy the scene layer to the output once per frame.
    fn composite(&mut self) {
        if !self.composited {
            self.pixmap.data_mut().copy_from_slice(self.scene.data());
            self.composited = true;
        }
    }
}

fn outline_path(points: &[Point]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    pb.close();
    pb.finish()
}

fn paint(rgb: Rgb, alpha: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    let [r, g, b] = rgb.to_f32_array();
    if let Some(color) = Color::from_rgba(r, g, b, alpha.clamp(0.0, 1.0)) {
        paint.set_color(color);
    }
    paint.anti_alias = true;
    paint
}

impl SoftwareBackend {
    fn draw_polygon(&mut self, polygon: &Polygon, batch: &RenderBatch, fallback: Rgb) {
        let hints = &batch.render_hints;
        let simplified;
        let points: &[Point] = if hints.use_simplification {
            simplified = simplify(&polygon.points, hints.simplification_tolerance, true);
            &simplified
        } else {
            &polygon.points
        };
        let Some(path) = outline_path(points) else {
            return;
        };

        let rgb = Rgb::parse_or(&polygon.color, fallback);
        // Device-space stroke widths; the transform scales by zoom.
        let zoom = self.zoom;
        let line = |px: f32| Stroke {
            width: px / zoom,
            ..Default::default()
        };
        let fill = !polygon.is_hole() && hints.render_level >= RenderLevel::Reduced;
        if fill {
            let alpha = FILL_ALPHA * polygon.confidence as f32;
            self.scene
                .fill_path(&path, &paint(rgb, alpha), FillRule::Winding, self.transform, None);
        }
        let stroke = match hints.render_level {
            RenderLevel::Minimal | RenderLevel::Reduced => line(1.0),
            RenderLevel::Normal => line(1.5),
            RenderLevel::Detailed => line(2.5),
        };
        if hints.render_level != RenderLevel::Reduced || !fill {
            self.scene
                .stroke_path(&path, &paint(rgb, 1.0), &stroke, self.transform, None);
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            instancing: true,
            max_instances: usize::MAX,
        }
    }

    fn begin_frame(&mut self, viewport: &Viewport, clear: bool) -> Result<(), RendererError> {
        let zoom = viewport.zoom as f32;
        let tx = (viewport.canvas_width / 2.0 - viewport.center_x * viewport.zoom) as f32;
        let ty = (viewport.canvas_height / 2.0 - viewport.center_y * viewport.zoom) as f32;
        self.transform = Transform::from_row(zoom, 0.0, 0.0, zoom, tx, ty);
        self.zoom = zoom.max(f32::EPSILON);
        if clear {
            self.scene.fill(self.background);
        }
        self.composited = false;
        self.frame = Some(FrameReport::default());
        Ok(())
    }

    fn draw_batch(&mut self, batch: &RenderBatch, fallback: Rgb) -> Result<(), RendererError> {
        self.frame_mut()?;
        for polygon in &batch.polygons {
            self.draw_polygon(polygon, batch, fallback);
        }
        let frame = self.frame_mut()?;
        frame.batches_drawn += 1;
        frame.polygons_drawn += batch.polygons.len();
        Ok(())
    }

    fn draw_instanced(&mut self, instances: &[VertexInstance]) -> Result<(), RendererError> {
        self.frame_mut()?;
        self.composite();
        let mut paint = Paint::default();
        paint.anti_alias = true;
        for instance in instances {
            let [r, g, b] = instance.color;
            let Some(color) = Color::from_rgba(r, g, b, instance.opacity) else {
                continue;
            };
            let [x, y] = instance.position;
            let Some(circle) = PathBuilder::from_circle(x, y, instance.radius) else {
                continue;
            };
            paint.set_color(color);
            self.pixmap
                .fill_path(&circle, &paint, FillRule::Winding, self.transform, None);
        }
        let frame = self.frame_mut()?;
        frame.instanced_draw_calls += 1;
        frame.instances_drawn += instances.len();
        Ok(())
    }

    fn end_frame(&mut self) -> Result<FrameReport, RendererError> {
        let frame = self.frame.take().ok_or(RendererError::FrameNotStarted)?;
        self.composite();
        self.last_frame = frame;
        Ok(frame)
    }

    fn read_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixel(x, y)
    }
}
