//! Renders a synthetic segmentation scene and runs a few background edits.
//!
//! Usage: `polyedit-demo [config.json]`

use std::error::Error;
use std::time::{Duration, Instant};

use polyedit_core::{Point, Polygon, PolygonType};
use polyedit_engine::{EditorEngine, EditorSnapshot, EngineConfig, EngineEvent};
use polyedit_renderer::{VertexInteraction, VertexRef, Viewport};

fn cell(id: usize, cx: f64, cy: f64, vertices: usize) -> Polygon {
    let points = (0..vertices)
        .map(|i| {
            let t = i as f64 / vertices as f64 * std::f64::consts::TAU;
            let r = 18.0 + 4.0 * (3.0 * t + id as f64).sin() + 1.5 * (11.0 * t).cos();
            Point::new(cx + r * t.cos(), cy + r * t.sin())
        })
        .collect();
    let (polygon_type, color) = if id % 13 == 0 {
        (PolygonType::Internal, "#3080ff")
    } else {
        (PolygonType::External, "#ff4040")
    };
    Polygon::new(format!("cell-{id}"), points, polygon_type)
        .with_color(color)
        .with_confidence(0.6 + (id % 4) as f64 * 0.1)
}

fn scene() -> Vec<Polygon> {
    let mut polygons: Vec<Polygon> = (0..1500)
        .map(|i| cell(i, (i % 50) as f64 * 50.0 + 25.0, (i / 50) as f64 * 50.0 + 25.0, 40 + i % 80))
        .collect();
    polygons.push(cell(9999, 1250.0, 750.0, 12_000).with_color("#ffd000"));
    polygons
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let mut engine = EditorEngine::new(config.clone())?;
    let polygons = scene();
    let big = polygons.len() - 1;

    let mut viewport = Viewport::new(config.surface_width as f64, config.surface_height as f64);
    viewport.fit_bbox(&polygons[big].bbox().ok_or("empty scene")?.expand(200.0));
    let mut interaction = VertexInteraction {
        selected_polygon_id: Some(polygons[big].id.clone()),
        ..Default::default()
    };

    for frame in 0..30 {
        viewport.pan(4.0, 2.0);
        interaction.hovered = Some(VertexRef::new(polygons[big].id.clone(), frame * 100));
        let snapshot = EditorSnapshot {
            polygons: &polygons,
            revision: 1,
            viewport,
            interaction: interaction.clone(),
            is_animating: frame < 10,
        };
        let started = Instant::now();
        let stats = engine.render_frame(&snapshot)?;
        log::debug!("Frame {frame} in {:?}: {}", started.elapsed(), serde_json::to_string(&stats)?);
        if frame == 29 {
            log::info!(
                "Last frame: {} visible polygons, {}/{} batches, {} vertex markers",
                stats.visible_polygons,
                stats.batches_drawn,
                stats.batches_total,
                stats.vertex_instances
            );
        }
    }

    let center = viewport.image_to_screen(&polygons[big].points[0]);
    log::info!("Hit test at the first vertex: {:?}", engine.hit_test(&center));

    let target = &polygons[big];
    let bbox = target.bbox().ok_or("empty polygon")?;
    let mid_y = bbox.center().y;
    engine.request_slice(target, Point::new(bbox.min.x - 10.0, mid_y), Point::new(bbox.max.x + 10.0, mid_y))?;
    engine.request_simplify(target, 0.75)?;
    engine.request_balanced_slice(&polygons[7])?;
    engine.request_slice(&polygons[3], Point::new(0.0, 0.0), Point::new(0.5, 0.0))?;

    let deadline = Instant::now() + Duration::from_secs(30);
    while engine.pending_requests() > 0 && Instant::now() < deadline {
        for event in engine.poll_results() {
            match event {
                EngineEvent::Sliced { source_id, parts, .. } => log::info!(
                    "Sliced {source_id}: areas {:.1} and {:.1}",
                    parts.0.area(),
                    parts.1.area()
                ),
                EngineEvent::Simplified { source_id, points, .. } => {
                    log::info!("Simplified {source_id} to {} points", points.len())
                }
                EngineEvent::Failed { source_id, error, .. } => {
                    log::warn!("Request for {source_id} failed: {error}")
                }
            }
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    log::info!("Pool: {}", serde_json::to_string(&engine.pool_stats())?);
    log::info!("Batch cache: {}", serde_json::to_string(&engine.cache_stats())?);
    engine.shutdown();
    Ok(())
}
