use polyedit_core::{Point, Polygon, SpatialIndex};

use crate::backend::{FrameReport, RenderBackend, RendererError};
use crate::batch::RenderBatch;
use crate::color::Rgb;
use crate::config::{RendererConfig, StateStyle};
use crate::instance::{VertexInstance, VertexInteraction, VertexRef, VertexState};
use crate::viewport::Viewport;

/// Draws batches and vertex markers through a backend, and answers which
/// vertex sits under the pointer.
///
/// Vertex instances are rebuilt from scratch every frame, so state styling is
/// never compounded across frames.
pub struct VertexRenderer {
    backend: Box<dyn RenderBackend>,
    config: RendererConfig,
    fallback_color: Rgb,
    instances: Vec<VertexInstance>,
    /// Per instance: slot in `owners` and vertex index.
    targets: Vec<(usize, usize)>,
    owners: Vec<String>,
    positions: Vec<Point>,
    index: SpatialIndex,
    index_stale: bool,
    frame_open: bool,
}

impl VertexRenderer {
    pub fn new(backend: Box<dyn RenderBackend>, config: RendererConfig) -> Result<Self, RendererError> {
        let capabilities = backend.capabilities();
        if !capabilities.instancing {
            log::warn!("Backend {} cannot draw instanced geometry", backend.name());
            return Err(RendererError::CapabilityUnavailable("instanced drawing"));
        }
        let (min, max) = (config.min_radius, config.max_radius);
        if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max) {
            return Err(RendererError::InvalidConfig(format!(
                "marker radius range {min}..{max}"
            )));
        }
        log::info!("Vertex renderer using the {} backend", backend.name());
        let fallback_color = Rgb::parse_or(&config.default_color, Rgb::default());
        Ok(Self {
            backend,
            config,
            fallback_color,
            instances: Vec::new(),
            targets: Vec::new(),
            owners: Vec::new(),
            positions: Vec::new(),
            index: SpatialIndex::new(),
            index_stale: false,
            frame_open: false,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Marker radius in image units: constant on screen, clamped.
    pub fn vertex_radius(&self, zoom: f64) -> f32 {
        let zoom = if zoom > 0.0 { zoom as f32 } else { 1.0 };
        (self.config.base_radius / zoom)
            .max(self.config.min_radius)
            .min(self.config.max_radius)
    }

    pub fn clear_vertices(&mut self) {
        self.instances.clear();
        self.targets.clear();
        self.owners.clear();
        self.positions.clear();
        self.index_stale = true;
    }

    /// Append markers for `polygon`'s vertices at `indices`. Out-of-range
    /// indices are ignored.
    pub fn push_polygon_vertices(
        &mut self,
        polygon: &Polygon,
        indices: impl IntoIterator<Item = usize>,
        interaction: &VertexInteraction,
        zoom: f64,
    ) {
        let base_radius = self.vertex_radius(zoom);
        let color = Rgb::parse_or(&polygon.color, self.fallback_color).to_f32_array();
        let owner = self.owners.len();
        let mut pushed = false;

        for vertex_index in indices {
            let Some(stored) = polygon.points.get(vertex_index) else {
                continue;
            };
            let state = interaction.state_of(&polygon.id, vertex_index);
            let position = match interaction.drag_offset {
                Some(offset) if state.contains(VertexState::DRAGGING) => {
                    stored.translate(offset.x, offset.y)
                }
                _ => *stored,
            };

            let style = self.style_for(state);
            self.instances.push(VertexInstance {
                position: [position.x as f32, position.y as f32],
                radius: base_radius * style.radius_scale,
                color: color.map(|c| (c * style.brightness).min(1.0)),
                opacity: (self.config.base_opacity * style.opacity).clamp(0.0, 1.0),
                flags: state.bits(),
            });
            self.targets.push((owner, vertex_index));
            self.positions.push(position);
            pushed = true;
        }

        if pushed {
            self.owners.push(polygon.id.clone());
            self.index_stale = true;
        }
    }

    /// Replace all markers with every vertex of `polygons`.
    pub fn prepare_vertices(&mut self, polygons: &[Polygon], interaction: &VertexInteraction, zoom: f64) {
        self.clear_vertices();
        for polygon in polygons {
            self.push_polygon_vertices(polygon, 0..polygon.points.len(), interaction, zoom);
        }
    }

    /// Product of the multipliers of every active state.
    fn style_for(&self, state: VertexState) -> StateStyle {
        let mut style = StateStyle::default();
        for (flag, s) in [
            (VertexState::SELECTED, &self.config.selected),
            (VertexState::HOVERED, &self.config.hovered),
            (VertexState::DRAGGING, &self.config.dragging),
        ] {
            if state.contains(flag) {
                style.radius_scale *= s.radius_scale;
                style.brightness *= s.brightness;
                style.opacity *= s.opacity;
            }
        }
        style
    }

    pub fn instances(&self) -> &[VertexInstance] {
        &self.instances
    }

    /// The instance buffer as uploaded to the device.
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Open a frame. `clear` starts a new pass; without it, batches drawn
    /// by earlier frames stay on the surface.
    pub fn begin_frame(&mut self, viewport: &Viewport, clear: bool) -> Result<(), RendererError> {
        self.backend.begin_frame(viewport, clear)?;
        self.frame_open = true;
        Ok(())
    }

    pub fn draw_batch(&mut self, batch: &RenderBatch) -> Result<(), RendererError> {
        if !self.frame_open {
            return Err(RendererError::FrameNotStarted);
        }
        self.backend.draw_batch(batch, self.fallback_color)
    }

    /// Draw all markers in one instanced call and close the frame.
    pub fn finish_frame(&mut self) -> Result<FrameReport, RendererError> {
        if !self.frame_open {
            return Err(RendererError::FrameNotStarted);
        }
        self.frame_open = false;
        self.backend.draw_instanced(&self.instances)?;
        self.backend.end_frame()
    }

    /// Draw `batches` and the current markers as one frame.
    pub fn render_frame(&mut self, viewport: &Viewport, batches: &[RenderBatch]) -> Result<FrameReport, RendererError> {
        self.begin_frame(viewport, true)?;
        for batch in batches {
            self.draw_batch(batch)?;
        }
        self.finish_frame()
    }

    /// Nearest marker within the hit radius of a device-space point.
    pub fn hit_test(&mut self, screen: &Point, viewport: &Viewport) -> Option<VertexRef> {
        let point = viewport.screen_to_image(screen);
        let radius = viewport.screen_to_image_distance(self.config.hit_radius);
        if self.positions.len() >= self.config.indexed_hit_threshold {
            self.hit_test_indexed(&point, radius)
        } else {
            self.hit_test_linear(&point, radius)
        }
    }

    /// Scan every marker. `point` and `radius` are in image units.
    pub fn hit_test_linear(&self, point: &Point, radius: f64) -> Option<VertexRef> {
        self.nearest(0..self.positions.len(), point, radius)
    }

    /// Narrow candidates with a spatial index before the exact check.
    pub fn hit_test_indexed(&mut self, point: &Point, radius: f64) -> Option<VertexRef> {
        if self.index_stale {
            self.index.update(&self.positions);
            self.index_stale = false;
        }
        let candidates = self.index.query_radius(point, radius);
        self.nearest(candidates, point, radius)
    }

    fn nearest(&self, candidates: impl IntoIterator<Item = usize>, point: &Point, radius: f64) -> Option<VertexRef> {
        let mut best: Option<(f64, usize)> = None;
        for i in candidates {
            let d = self.positions[i].distance_to(point);
            if d <= radius && best.map_or(true, |(bd, bi)| d < bd || (d == bd && i < bi)) {
                best = Some((d, i));
            }
        }
        let (_, i) = best?;
        let (owner, vertex_index) = self.targets[i];
        Some(VertexRef::new(self.owners[owner].clone(), vertex_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyedit_core::{BBox, PolygonType};

    use crate::backend::BackendCapabilities;
    use crate::batch::{RenderHints, RenderLevel};
    use crate::software::SoftwareBackend;

    struct NoInstancing;

    impl RenderBackend for NoInstancing {
        fn name(&self) -> &str {
            "no-instancing"
        }
        fn capabilities(&self) -> BackendCapabilities {
            BackendCapabilities {
                instancing: false,
                max_instances: 0,
            }
        }
        fn begin_frame(&mut self, _: &Viewport, _: bool) -> Result<(), RendererError> {
            Ok(())
        }
        fn draw_batch(&mut self, _: &RenderBatch, _: Rgb) -> Result<(), RendererError> {
            Ok(())
        }
        fn draw_instanced(&mut self, _: &[VertexInstance]) -> Result<(), RendererError> {
            Ok(())
        }
        fn end_frame(&mut self) -> Result<FrameReport, RendererError> {
            Ok(FrameReport::default())
        }
    }

    fn renderer() -> VertexRenderer {
        let backend = SoftwareBackend::new(200, 200).unwrap();
        VertexRenderer::new(Box::new(backend), RendererConfig::default()).unwrap()
    }

    fn square(id: &str, offset: f64) -> Polygon {
        Polygon::new(
            id,
            vec![
                Point::new(offset, offset),
                Point::new(offset + 50.0, offset),
                Point::new(offset + 50.0, offset + 50.0),
                Point::new(offset, offset + 50.0),
            ],
            PolygonType::External,
        )
    }

    #[test]
    fn test_missing_instancing_is_fatal() {
        assert!(matches!(
            VertexRenderer::new(Box::new(NoInstancing), RendererConfig::default()),
            Err(RendererError::CapabilityUnavailable(_))
        ));
    }

    #[test]
    fn test_inverted_radius_range_is_rejected() {
        let config: RendererConfig =
            serde_json::from_str(r#"{"minRadius": 10.0, "maxRadius": 2.0}"#).unwrap();
        let backend = SoftwareBackend::new(50, 50).unwrap();
        assert!(matches!(
            VertexRenderer::new(Box::new(backend), config),
            Err(RendererError::InvalidConfig(_))
        ));

        let config = RendererConfig {
            min_radius: f32::NAN,
            ..RendererConfig::default()
        };
        let backend = SoftwareBackend::new(50, 50).unwrap();
        assert!(VertexRenderer::new(Box::new(backend), config).is_err());
    }

    #[test]
    fn test_radius_scales_with_zoom() {
        let r = renderer();
        assert_eq!(r.vertex_radius(1.0), 5.0);
        assert_eq!(r.vertex_radius(2.0), 2.5);
        assert_eq!(r.vertex_radius(100.0), 0.5);
        assert_eq!(r.vertex_radius(0.01), 25.0);
    }

    #[test]
    fn test_state_multipliers_do_not_accumulate() {
        let mut r = renderer();
        let polygons = vec![square("a", 0.0)];
        let interaction = VertexInteraction {
            hovered: Some(VertexRef::new("a", 1)),
            ..Default::default()
        };
        for _ in 0..3 {
            r.prepare_vertices(&polygons, &interaction, 1.0);
        }
        let hovered = r.instances()[1];
        assert!((hovered.radius - 5.0 * 1.4).abs() < 1e-6);
        assert_eq!(hovered.state(), VertexState::HOVERED);
        assert_eq!(r.instances()[0].radius, 5.0);
        assert_eq!(r.instance_bytes().len(), 4 * 32);
    }

    #[test]
    fn test_drag_offset_moves_marker() {
        let mut r = renderer();
        let interaction = VertexInteraction {
            selected_polygon_id: Some("a".to_string()),
            dragging: Some(VertexRef::new("a", 2)),
            drag_offset: Some(Point::new(10.0, -5.0)),
            ..Default::default()
        };
        r.prepare_vertices(&[square("a", 0.0)], &interaction, 1.0);
        assert_eq!(r.instances()[2].position, [60.0, 45.0]);
        assert_eq!(r.instances()[2].state(), VertexState::SELECTED | VertexState::DRAGGING);
        let hit = r.hit_test_linear(&Point::new(59.0, 45.0), 3.0);
        assert_eq!(hit, Some(VertexRef::new("a", 2)));
    }

    #[test]
    fn test_one_instanced_draw_per_frame() {
        let mut r = renderer();
        let polygons = vec![square("a", 0.0), square("b", 100.0)];
        r.prepare_vertices(&polygons, &VertexInteraction::default(), 1.0);
        let mut viewport = Viewport::new(200.0, 200.0);
        viewport.fit_bbox(&BBox::from_corners(0.0, 0.0, 150.0, 150.0));
        let report = r.render_frame(&viewport, &[]).unwrap();
        assert_eq!(report.instanced_draw_calls, 1);
        assert_eq!(report.instances_drawn, 8);
        let batch = RenderBatch {
            id: "late".to_string(),
            polygons: Vec::new(),
            bounding_box: BBox::from_corners(0.0, 0.0, 0.0, 0.0),
            complexity: 0.0,
            priority: 0.0,
            render_hints: RenderHints {
                use_simplification: false,
                simplification_tolerance: 1.0,
                render_vertices: false,
                render_level: RenderLevel::Minimal,
                batch_size: 0,
            },
        };
        assert!(matches!(r.draw_batch(&batch), Err(RendererError::FrameNotStarted)));
    }

    #[test]
    fn test_hit_test_paths_agree() {
        let mut r = renderer();
        let polygons: Vec<Polygon> = (0..30).map(|i| square(&format!("p{i}"), i as f64 * 7.0)).collect();
        r.prepare_vertices(&polygons, &VertexInteraction::default(), 1.0);
        for target in [Point::new(7.5, 7.2), Point::new(120.0, 121.0), Point::new(-40.0, 0.0)] {
            let linear = r.hit_test_linear(&target, 4.0);
            let indexed = r.hit_test_indexed(&target, 4.0);
            assert_eq!(linear, indexed);
        }
        assert_eq!(r.hit_test_linear(&Point::new(7.5, 7.2), 4.0), Some(VertexRef::new("p1", 0)));
        assert_eq!(r.hit_test_linear(&Point::new(-40.0, 0.0), 4.0), None);
    }

    #[test]
    fn test_hit_test_from_screen() {
        let mut r = renderer();
        r.prepare_vertices(&[square("a", 0.0)], &VertexInteraction::default(), 2.0);
        let mut viewport = Viewport::new(200.0, 200.0);
        viewport.zoom_at(&Point::new(0.0, 0.0), 2.0);
        let screen = viewport.image_to_screen(&Point::new(50.0, 50.0));
        let nudged = Point::new(screen.x + 6.0, screen.y);
        assert_eq!(r.hit_test(&nudged, &viewport), Some(VertexRef::new("a", 2)));
        let far = Point::new(screen.x + 20.0, screen.y);
        assert_eq!(r.hit_test(&far, &viewport), None);
    }
}
