//! The geometry kernel: pure functions over point sequences.
//!
//! Nothing in here holds state or performs I/O, so every function can run on a
//! worker thread against an owned copy of the input. Degenerate or non-finite
//! input never panics; it yields a sentinel (`0.0`, `None`, an unchanged copy)
//! or lets NaN flow through the arithmetic.

mod buffer;
mod hull;
mod intersect;
mod measure;
mod simplify;
mod slice;

pub use buffer::buffer_polygon;
pub use hull::convex_hull;
pub use intersect::{line_intersection, segment_intersections, EdgeHit};
pub use measure::{area, centroid, is_clockwise, perimeter, point_in_polygon, signed_area};
pub use simplify::simplify;
pub use slice::{
    find_balanced_slice, slice_polygon, try_slice_polygon, validate_slice_line, BalancedSlice,
    SliceRejection, SliceValidation, MIN_SLICE_LENGTH,
};

/// Tolerance used to decide whether an open point list is actually closed.
pub const CLOSURE_EPSILON: f64 = 1e-3;

/// Determinant magnitude below which two segments are treated as parallel.
pub const PARALLEL_EPSILON: f64 = 1e-10;
