//! # polyedit Core
//!
//! Polygon data model for segmentation outlines, the stateless geometry
//! kernel (area, simplification, hulls, buffering, slicing), morphometric
//! shape metrics, and the spatial indices used for viewport culling.
//!
//! Nothing in this crate mutates caller-owned polygons: every operation
//! returns new points or new polygons for the editor to commit.

pub mod geometry;
pub mod kernel;
pub mod metrics;
pub mod spatial;

pub use geometry::{dedup_consecutive, filter_polygons, BBox, Point, Polygon, PolygonType};
pub use metrics::ShapeMetrics;
pub use spatial::{PolygonIndex, SpatialIndex};
