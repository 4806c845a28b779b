use std::thread;
use std::time::{Duration, Instant};

use polyedit_core::{Point, Polygon, PolygonType};
use polyedit_engine::{EditorEngine, EditorSnapshot, EngineConfig, EngineError, EngineEvent};
use polyedit_renderer::{RendererError, VertexInteraction, VertexRef, Viewport};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn square(id: &str, x: f64, y: f64, side: f64) -> Polygon {
    Polygon::new(
        id,
        vec![
            Point::new(x, y),
            Point::new(x, y + side),
            Point::new(x + side, y + side),
            Point::new(x + side, y),
        ],
        PolygonType::External,
    )
}

fn engine() -> EditorEngine {
    let mut config = EngineConfig::default();
    config.surface_width = 400;
    config.surface_height = 300;
    config.pool.max_workers = 2;
    EditorEngine::new(config).unwrap()
}

fn scene() -> Vec<Polygon> {
    let mut polygons: Vec<Polygon> = (0..50)
        .map(|i| square(&format!("p{i}"), (i % 10) as f64 * 40.0, (i / 10) as f64 * 40.0, 30.0))
        .collect();
    polygons.push(square("far", 5000.0, 5000.0, 30.0));
    polygons
}

fn drain(engine: &mut EditorEngine) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(20);
    let mut events = Vec::new();
    while engine.pending_requests() > 0 {
        assert!(Instant::now() < deadline, "requests never finished");
        events.extend(engine.poll_results());
        thread::sleep(Duration::from_millis(1));
    }
    events
}

#[test]
fn frame_culls_and_marks_selected_vertices() {
    init();
    let mut engine = engine();
    let polygons = scene();
    let viewport = Viewport::new(400.0, 300.0);
    let mut snapshot = EditorSnapshot::new(&polygons, 1, viewport);
    snapshot.interaction = VertexInteraction {
        selected_polygon_id: Some("p12".to_string()),
        ..Default::default()
    };

    let stats = engine.render_frame(&snapshot).unwrap();
    assert!(stats.indices_rebuilt);
    assert_eq!(stats.visible_polygons, 50);
    assert_eq!(stats.instanced_draw_calls, 1);
    assert_eq!(stats.vertex_instances, 4);

    let again = engine.render_frame(&snapshot).unwrap();
    assert!(!again.indices_rebuilt);
    assert_eq!(again.cache.misses, 1);

    // p12 spans (80, 40)..(110, 70); its third vertex is (110, 70).
    let screen = viewport.image_to_screen(&Point::new(110.0, 70.0));
    let hit = engine.hit_test(&Point::new(screen.x + 2.0, screen.y - 1.0));
    assert_eq!(hit, Some(VertexRef::new("p12", 2)));
    assert_eq!(engine.hit_test(&Point::new(390.0, 290.0)), None);

    snapshot.revision = 2;
    assert!(engine.render_frame(&snapshot).unwrap().indices_rebuilt);
}

#[test]
fn inverted_marker_radius_range_fails_construction() {
    init();
    let config = EngineConfig::from_json(r#"{"renderer": {"minRadius": 10.0, "maxRadius": 2.0}}"#).unwrap();
    assert!(matches!(
        EditorEngine::new(config),
        Err(EngineError::Renderer(RendererError::InvalidConfig(_)))
    ));
}

#[test]
fn progressive_pass_accumulates_on_the_surface() {
    init();
    let mut config = EngineConfig::default();
    config.surface_width = 400;
    config.surface_height = 300;
    config.pool.max_workers = 1;
    config.batching.frame_budget_ms = 0.0;
    let mut engine = EditorEngine::new(config).unwrap();

    let polygons = scene();
    let viewport = Viewport::new(400.0, 300.0);
    let mut snapshot = EditorSnapshot::new(&polygons, 1, viewport);
    snapshot.interaction.selected_polygon_id = Some("p12".to_string());

    // The selected polygon sits alone in the top tier and is drawn first.
    let first = engine.render_frame(&snapshot).unwrap();
    assert!(first.pass_started);
    assert_eq!(first.batches_drawn, 1);
    assert!(first.batches_total > 1);
    let inside = viewport.image_to_screen(&Point::new(95.0, 55.0));
    let (x, y) = (inside.x as u32, inside.y as u32);
    let read = |engine: &EditorEngine| engine.renderer().backend().read_pixel(x, y).unwrap();
    let filled = read(&engine);
    assert!(filled[0] > filled[1]);

    let mut drawn = first.batches_drawn;
    let mut remaining = first.batches_remaining;
    while remaining > 0 {
        let stats = engine.render_frame(&snapshot).unwrap();
        assert!(!stats.pass_started);
        assert_eq!(read(&engine), filled);
        drawn += stats.batches_drawn;
        remaining = stats.batches_remaining;
    }
    assert_eq!(drawn, first.batches_total);

    assert!(engine.render_frame(&snapshot).unwrap().pass_started);

    let mut panned = viewport;
    panned.pan(100.0, 0.0);
    snapshot.viewport = panned;
    assert!(engine.render_frame(&snapshot).unwrap().pass_started);
    snapshot.viewport = viewport;
    assert!(engine.render_frame(&snapshot).unwrap().pass_started);
}

#[test]
fn slice_and_simplify_round_trip() {
    init();
    let mut engine = engine();
    let target = square("cell", 0.0, 0.0, 100.0);
    let slice = engine
        .request_slice(&target, Point::new(-10.0, 50.0), Point::new(110.0, 50.0))
        .unwrap();
    let mut noisy = target.clone();
    noisy.points = (0..400)
        .map(|i| {
            let t = i as f64 / 400.0 * std::f64::consts::TAU;
            Point::new(50.0 * t.cos(), 50.0 * t.sin() + if i % 2 == 0 { 0.01 } else { -0.01 })
        })
        .collect();
    let simplify = engine.request_simplify(&noisy, 0.5).unwrap();
    let balanced = engine.request_balanced_slice(&target).unwrap();

    let events = drain(&mut engine);
    assert_eq!(events.len(), 3);
    for event in events {
        match event {
            EngineEvent::Sliced { task, source_id, parts } => {
                assert!(task == slice || task == balanced);
                assert_eq!(source_id, "cell");
                let total = parts.0.area() + parts.1.area();
                assert!((total - 10_000.0).abs() < 10.0);
                assert_ne!(parts.0.id, "cell");
                if task == slice {
                    assert!((parts.0.area() - 5000.0).abs() < 1e-6);
                }
            }
            EngineEvent::Simplified { task, points, .. } => {
                assert_eq!(task, simplify);
                assert!(points.len() < 400);
            }
            EngineEvent::Failed { error, .. } => panic!("unexpected failure: {error}"),
        }
    }
}

#[test]
fn rejected_and_cancelled_requests() {
    init();
    let mut engine = engine();
    let target = square("cell", 0.0, 0.0, 100.0);
    let bad = engine
        .request_slice(&target, Point::new(-10.0, 50.0), Point::new(50.0, 50.0))
        .unwrap();
    let dropped = engine
        .request_slice(&target, Point::new(-10.0, 50.0), Point::new(110.0, 50.0))
        .unwrap();
    assert!(engine.cancel_request(dropped));
    assert!(!engine.cancel_request(dropped));

    let events = drain(&mut engine);
    assert_eq!(events.len(), 1);
    match &events[0] {
        EngineEvent::Failed { task, error, .. } => {
            assert_eq!(*task, bad);
            assert!(error.contains("expected 2 intersections, found 1"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn shutdown_fails_outstanding_requests() {
    init();
    let mut engine = engine();
    let mut heavy = square("heavy", 0.0, 0.0, 100.0);
    heavy.points = (0..300_000)
        .map(|i| {
            let t = i as f64 / 300_000.0 * std::f64::consts::TAU;
            Point::new(1000.0 * t.cos(), 1000.0 * t.sin())
        })
        .collect();
    for _ in 0..4 {
        engine.request_simplify(&heavy, 0.01).unwrap();
    }
    engine.shutdown();
    let events = drain(&mut engine);
    assert_eq!(events.len(), 4);
    assert!(events
        .iter()
        .all(|e| matches!(e, EngineEvent::Failed { error, .. } if error.contains("terminated"))));
    assert!(engine.request_simplify(&heavy, 1.0).is_err());
}
