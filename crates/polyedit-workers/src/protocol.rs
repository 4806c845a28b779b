use serde::{Deserialize, Serialize};

use polyedit_core::kernel::{self, BalancedSlice, EdgeHit};
use polyedit_core::{Point, Polygon, ShapeMetrics};

use crate::job::Job;

/// Correlates a request with its response.
pub type TaskId = u64;

/// Identifies one worker thread for the lifetime of the pool.
pub type WorkerId = usize;

/// Geometry kernel operations that can run off the interactive thread.
///
/// Serialized as `{"type": ..., "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum GeometryOperation {
    #[serde(rename_all = "camelCase")]
    Simplify {
        points: Vec<Point>,
        tolerance: f64,
        preserve_topology: bool,
    },
    #[serde(rename_all = "camelCase")]
    Intersections {
        polygon: Vec<Point>,
        line_start: Point,
        line_end: Point,
    },
    #[serde(rename_all = "camelCase")]
    Slice {
        polygon: Polygon,
        line_start: Point,
        line_end: Point,
    },
    #[serde(rename_all = "camelCase")]
    BalancedSlice { polygon: Polygon, precision: usize },
    Area { points: Vec<Point> },
    ConvexHull { points: Vec<Point> },
    Buffer {
        points: Vec<Point>,
        distance: f64,
        segments: usize,
    },
    PointInPolygon { point: Point, polygon: Vec<Point> },
    Metrics {
        outline: Vec<Point>,
        holes: Vec<Vec<Point>>,
    },
}

/// Result payloads, tagged by kind so a response can be decoded on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum GeometryResult {
    Points(Vec<Point>),
    Intersections(Vec<EdgeHit>),
    Slice(Polygon, Polygon),
    BalancedSlice(Box<BalancedSlice>),
    Area(f64),
    Contains(bool),
    Metrics(ShapeMetrics),
}

const POINT_BYTES: usize = std::mem::size_of::<Point>();

impl Job for GeometryOperation {
    type Output = GeometryResult;

    fn kind(&self) -> &'static str {
        match self {
            Self::Simplify { .. } => "simplify",
            Self::Intersections { .. } => "intersections",
            Self::Slice { .. } => "slice",
            Self::BalancedSlice { .. } => "balancedSlice",
            Self::Area { .. } => "area",
            Self::ConvexHull { .. } => "convexHull",
            Self::Buffer { .. } => "buffer",
            Self::PointInPolygon { .. } => "pointInPolygon",
            Self::Metrics { .. } => "metrics",
        }
    }

    fn payload_size(&self) -> usize {
        let points = match self {
            Self::Simplify { points, .. }
            | Self::Area { points }
            | Self::ConvexHull { points }
            | Self::Buffer { points, .. } => points.len(),
            Self::Intersections { polygon, .. } => polygon.len() + 2,
            Self::Slice { polygon, .. } => polygon.points.len() + 2,
            Self::BalancedSlice { polygon, .. } => polygon.points.len(),
            Self::PointInPolygon { polygon, .. } => polygon.len() + 1,
            Self::Metrics { outline, holes } => {
                outline.len() + holes.iter().map(Vec::len).sum::<usize>()
            }
        };
        points * POINT_BYTES
    }

    fn run(self) -> Result<GeometryResult, String> {
        match self {
            Self::Simplify {
                points,
                tolerance,
                preserve_topology,
            } => Ok(GeometryResult::Points(kernel::simplify(
                &points,
                tolerance,
                preserve_topology,
            ))),
            Self::Intersections {
                polygon,
                line_start,
                line_end,
            } => Ok(GeometryResult::Intersections(kernel::segment_intersections(
                &polygon,
                &line_start,
                &line_end,
            ))),
            Self::Slice {
                polygon,
                line_start,
                line_end,
            } => kernel::try_slice_polygon(&polygon, &line_start, &line_end)
                .map(|(a, b)| GeometryResult::Slice(a, b))
                .map_err(|reason| reason.to_string()),
            Self::BalancedSlice { polygon, precision } => {
                kernel::find_balanced_slice(&polygon, precision)
                    .map(|s| GeometryResult::BalancedSlice(Box::new(s)))
                    .ok_or_else(|| "no valid slice found".to_string())
            }
            Self::Area { points } => Ok(GeometryResult::Area(kernel::area(&points))),
            Self::ConvexHull { points } => Ok(GeometryResult::Points(kernel::convex_hull(&points))),
            Self::Buffer {
                points,
                distance,
                segments,
            } => Ok(GeometryResult::Points(kernel::buffer_polygon(
                &points, distance, segments,
            ))),
            Self::PointInPolygon { point, polygon } => Ok(GeometryResult::Contains(
                kernel::point_in_polygon(&point, &polygon),
            )),
            Self::Metrics { outline, holes } => {
                let holes: Vec<&[Point]> = holes.iter().map(Vec::as_slice).collect();
                Ok(GeometryResult::Metrics(ShapeMetrics::compute(&outline, &holes)))
            }
        }
    }
}

/// A task as handed to a worker: `{id, type, payload, transferablePayloadSize}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest<J> {
    pub id: TaskId,
    #[serde(flatten)]
    pub operation: J,
    pub transferable_payload_size: usize,
}

/// A worker's answer: `{id, success, result | error, executionTimeMs}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse<O> {
    pub id: TaskId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<O>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: f64,
}

impl<O> WorkerResponse<O> {
    pub fn from_outcome(id: TaskId, outcome: Result<O, String>, execution_time_ms: f64) -> Self {
        match outcome {
            Ok(result) => Self {
                id,
                success: true,
                result: Some(result),
                error: None,
                execution_time_ms,
            },
            Err(error) => Self {
                id,
                success: false,
                result: None,
                error: Some(error),
                execution_time_ms,
            },
        }
    }
}
