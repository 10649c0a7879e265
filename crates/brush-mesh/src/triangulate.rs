//! Fan triangulation of convex face polygons.
//!
//! Only valid for convex, consistently wound polygons such as the ones
//! produced by [`crate::extract`]. Concave input gives overlapping triangles.

use crate::{Polygon, Triangle};

/// Splits a convex polygon into `len - 2` triangles sharing its first vertex.
///
/// Triangle `i` is `(v0, v[i], v[i + 1])`, which keeps the polygon's winding.
/// Polygons with fewer than three vertices yield no triangles.
pub fn fan(polygon: &Polygon) -> Vec<Triangle> {
    if !polygon.is_renderable() {
        return Vec::new();
    }
    let verts = polygon.vertices();

    (1..verts.len() - 1)
        .map(|i| Triangle::new(verts[0], verts[i], verts[i + 1]))
        .collect()
}
