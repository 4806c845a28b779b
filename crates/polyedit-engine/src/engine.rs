use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use polyedit_core::{Point, Polygon, PolygonIndex, SpatialIndex};
use polyedit_renderer::{
    BatchCacheStats, FrameScheduler, RenderBackend, RenderBatchManager, RenderContext,
    SoftwareBackend, VertexRef, VertexRenderer, Viewport,
};
use polyedit_workers::{
    GeometryOperation, GeometryResult, PoolError, PoolStats, TaskHandle, TaskId, WorkerPool,
};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::EngineEvent;
use crate::snapshot::{EditorSnapshot, FrameStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Slice,
    Simplify,
}

struct PendingRequest {
    kind: RequestKind,
    source_id: String,
    handle: TaskHandle<GeometryResult>,
}

/// Owns the frame pipeline and the background workers for one canvas.
///
/// All methods run on the interactive thread and none of them block, except
/// [`shutdown`](Self::shutdown), which only signals the workers.
pub struct EditorEngine {
    config: EngineConfig,
    batches: RenderBatchManager,
    scheduler: FrameScheduler,
    renderer: VertexRenderer,
    pool: WorkerPool,
    polygon_index: PolygonIndex,
    vertex_index: SpatialIndex,
    /// Per indexed vertex: polygon position in the snapshot and vertex index.
    vertex_owners: Vec<(usize, usize)>,
    indexed_revision: Option<u64>,
    last_viewport: Option<Viewport>,
    requests: HashMap<TaskId, PendingRequest>,
}

impl EditorEngine {
    /// Build an engine drawing into a software surface.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let backend = SoftwareBackend::new(config.surface_width, config.surface_height)?;
        Self::with_backend(config, Box::new(backend))
    }

    pub fn with_backend(config: EngineConfig, backend: Box<dyn RenderBackend>) -> Result<Self, EngineError> {
        let renderer = VertexRenderer::new(backend, config.renderer.clone())?;
        log::info!(
            "Editor engine ready: {} workers max, {}x{} surface",
            config.pool.worker_limit(),
            config.surface_width,
            config.surface_height
        );
        Ok(Self {
            batches: RenderBatchManager::new(config.batching.clone()),
            scheduler: FrameScheduler::new(&config.batching),
            renderer,
            pool: WorkerPool::new(config.pool.clone()),
            polygon_index: PolygonIndex::new(),
            vertex_index: SpatialIndex::new(),
            vertex_owners: Vec::new(),
            indexed_revision: None,
            last_viewport: None,
            requests: HashMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn renderer(&self) -> &VertexRenderer {
        &self.renderer
    }

    fn rebuild_indices(&mut self, polygons: &[Polygon]) {
        self.polygon_index = PolygonIndex::build(polygons);
        let total: usize = polygons.iter().map(|p| p.points.len()).sum();
        let mut points = Vec::with_capacity(total);
        self.vertex_owners.clear();
        self.vertex_owners.reserve(total);
        for (polygon_index, polygon) in polygons.iter().enumerate() {
            for (vertex_index, point) in polygon.points.iter().enumerate() {
                points.push(*point);
                self.vertex_owners.push((polygon_index, vertex_index));
            }
        }
        self.vertex_index.update(&points);
        log::debug!(
            "Indexed {} polygons, {} vertices",
            self.polygon_index.len(),
            points.len()
        );
    }

    /// Draw the next frame of `snapshot`.
    ///
    /// Culls to the viewport, batches the visible polygons, draws as many
    /// batches as the frame budget allows and then every visible vertex
    /// marker of the batches that show vertices, in one instanced call.
    pub fn render_frame(&mut self, snapshot: &EditorSnapshot<'_>) -> Result<FrameStats, EngineError> {
        let indices_rebuilt = self.indexed_revision != Some(snapshot.revision);
        if indices_rebuilt {
            self.rebuild_indices(snapshot.polygons);
            self.indexed_revision = Some(snapshot.revision);
        }

        let viewport = snapshot.viewport;
        let visible_bbox = viewport.visible_bbox();
        let mut visible_ids = self.polygon_index.query_viewport(&visible_bbox);
        visible_ids.sort_unstable();
        let visible: Vec<Polygon> = visible_ids
            .iter()
            .filter_map(|&i| snapshot.polygons.get(i).cloned())
            .collect();

        let context = RenderContext {
            zoom: viewport.zoom,
            viewport: visible_bbox,
            selected_polygon_id: snapshot.interaction.selected_polygon_id.clone(),
            is_animating: snapshot.is_animating,
            data_revision: snapshot.revision,
        };
        let batches = self.batches.create_batches(&visible, &context);

        // Vertex markers for every batch that asks for them, culled by the index.
        let marked: BTreeSet<&str> = batches
            .iter()
            .filter(|b| b.render_hints.render_vertices)
            .flat_map(|b| b.polygons.iter().map(|p| p.id.as_str()))
            .collect();
        let mut candidates: Vec<(usize, usize)> = if marked.is_empty() {
            Vec::new()
        } else {
            self.vertex_index
                .query_bbox(&visible_bbox, self.config.vertex_cull_buffer)
                .into_iter()
                .filter_map(|i| self.vertex_owners.get(i).copied())
                .filter(|&(p, _)| {
                    snapshot
                        .polygons
                        .get(p)
                        .is_some_and(|polygon| marked.contains(polygon.id.as_str()))
                })
                .collect()
        };
        candidates.sort_unstable();

        self.renderer.clear_vertices();
        for group in candidates.chunk_by(|a, b| a.0 == b.0) {
            if let Some(polygon) = snapshot.polygons.get(group[0].0) {
                self.renderer.push_polygon_vertices(
                    polygon,
                    group.iter().map(|&(_, v)| v),
                    &snapshot.interaction,
                    viewport.zoom,
                );
            }
        }

        // A pass continues only while the view holds still.
        if self.scheduler.is_complete() || self.last_viewport != Some(viewport) {
            self.scheduler.restart();
        }
        self.scheduler.replace(Arc::clone(&batches));

        let new_pass = self.scheduler.is_at_start();
        self.renderer.begin_frame(&viewport, new_pass)?;
        let renderer = &mut self.renderer;
        let progress = self.scheduler.run_frame(|batch| renderer.draw_batch(batch))?;
        let report = self.renderer.finish_frame()?;
        self.last_viewport = Some(viewport);

        Ok(FrameStats {
            indices_rebuilt,
            pass_started: new_pass,
            visible_polygons: visible.len(),
            batches_total: batches.len(),
            batches_drawn: progress.drawn,
            batches_remaining: progress.remaining,
            vertex_instances: report.instances_drawn,
            instanced_draw_calls: report.instanced_draw_calls,
            cache: self.batches.cache_stats(),
        })
    }

    /// The vertex marker under a device-space point in the last drawn frame.
    pub fn hit_test(&mut self, screen: &Point) -> Option<VertexRef> {
        let viewport = self.last_viewport?;
        self.renderer.hit_test(screen, &viewport)
    }

    fn submit(&mut self, kind: RequestKind, source_id: &str, operation: GeometryOperation) -> Result<TaskId, EngineError> {
        let handle = self.pool.execute(operation)?;
        let task = handle.id();
        log::debug!("Submitted {kind:?} request {task} for polygon {source_id}");
        self.requests.insert(
            task,
            PendingRequest {
                kind,
                source_id: source_id.to_string(),
                handle,
            },
        );
        Ok(task)
    }

    /// Split `polygon` along a line in the background.
    pub fn request_slice(&mut self, polygon: &Polygon, line_start: Point, line_end: Point) -> Result<TaskId, EngineError> {
        self.submit(
            RequestKind::Slice,
            &polygon.id,
            GeometryOperation::Slice {
                polygon: polygon.clone(),
                line_start,
                line_end,
            },
        )
    }

    /// Split `polygon` into two parts of near-equal area in the background.
    pub fn request_balanced_slice(&mut self, polygon: &Polygon) -> Result<TaskId, EngineError> {
        self.submit(
            RequestKind::Slice,
            &polygon.id,
            GeometryOperation::BalancedSlice {
                polygon: polygon.clone(),
                precision: self.config.balanced_slice_precision,
            },
        )
    }

    /// Simplify `polygon`'s outline in the background.
    pub fn request_simplify(&mut self, polygon: &Polygon, tolerance: f64) -> Result<TaskId, EngineError> {
        self.submit(
            RequestKind::Simplify,
            &polygon.id,
            GeometryOperation::Simplify {
                points: polygon.points.clone(),
                tolerance,
                preserve_topology: true,
            },
        )
    }

    /// Forget a request. Its result is dropped when it arrives.
    pub fn cancel_request(&mut self, task: TaskId) -> bool {
        self.requests.remove(&task).is_some()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Collect finished requests without blocking.
    pub fn poll_results(&mut self) -> Vec<EngineEvent> {
        self.pool.poll();
        let finished: Vec<(TaskId, Result<GeometryResult, PoolError>)> = self
            .requests
            .iter()
            .filter_map(|(task, request)| Some((*task, request.handle.try_take()?)))
            .collect();

        let mut events: Vec<EngineEvent> = finished
            .into_iter()
            .filter_map(|(task, outcome)| {
                let request = self.requests.remove(&task)?;
                Some(to_event(task, request.kind, request.source_id, outcome))
            })
            .collect();
        events.sort_by_key(EngineEvent::task);
        events
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn cache_stats(&self) -> BatchCacheStats {
        self.batches.cache_stats()
    }

    /// Stop the workers. Outstanding requests come back as
    /// [`EngineEvent::Failed`] from the next poll.
    pub fn shutdown(&mut self) {
        self.pool.terminate();
    }
}

fn to_event(
    task: TaskId,
    kind: RequestKind,
    source_id: String,
    outcome: Result<GeometryResult, PoolError>,
) -> EngineEvent {
    let error = match (kind, outcome) {
        (RequestKind::Slice, Ok(GeometryResult::Slice(a, b))) => {
            return EngineEvent::Sliced {
                task,
                source_id,
                parts: (a, b),
            };
        }
        (RequestKind::Slice, Ok(GeometryResult::BalancedSlice(slice))) => {
            return EngineEvent::Sliced {
                task,
                source_id,
                parts: slice.parts,
            };
        }
        (RequestKind::Simplify, Ok(GeometryResult::Points(points))) => {
            return EngineEvent::Simplified {
                task,
                source_id,
                points,
            };
        }
        (_, Ok(other)) => format!("unexpected result {other:?}"),
        (_, Err(err)) => err.to_string(),
    };
    log::debug!("Request {task} for polygon {source_id} failed: {error}");
    EngineEvent::Failed {
        task,
        source_id,
        error,
    }
}
