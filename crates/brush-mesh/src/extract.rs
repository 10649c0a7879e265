//! Face polygon extraction for convex brushes.
//!
//! A brush is the intersection of the half-spaces behind its face planes.
//! The polygon of one face is found by intersecting its plane with every
//! pair of other planes, keeping the points that lie inside all remaining
//! half-spaces, and ordering them counter-clockwise around the face normal.
//!
//! The search is O(p³) per face for a brush with p planes, which is fine for
//! hand-authored geometry but not meant for brushes with hundreds of faces.

use nalgebra::Point3;

use crate::{Plane, PolygonizeConfig, Polygon};

/// Computes the ordered boundary polygon of face `subject` of a brush.
///
/// Every vertex of a convex polytope is shared by at least three planes, so a
/// corner can be found once per pair of neighbouring planes. These near
/// duplicates are kept; use [`Polygon::welded`] to merge them.
///
/// Returns an empty polygon when the face is clipped away by the other planes,
/// when `subject` is out of range, or when the brush is empty or unbounded
/// around this face.
pub fn face_polygon(planes: &[Plane], subject: usize, config: &PolygonizeConfig) -> Polygon {
    let Some(face) = planes.get(subject) else {
        return Polygon::empty();
    };

    let mut points = Vec::new();
    for i in 0..planes.len() {
        if i == subject {
            continue;
        }
        for j in (i + 1)..planes.len() {
            if j == subject {
                continue;
            }

            let Some(point) =
                Plane::intersect_three(face, &planes[i], &planes[j], config.parallel_epsilon)
            else {
                continue;
            };

            let inside = planes
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != subject)
                .all(|(_, plane)| plane.contains(point, config.inside_epsilon));
            if inside {
                points.push(point);
            }
        }
    }

    Polygon::new(order_points(points, face))
}

/// Sorts coplanar points counter-clockwise around the plane's normal.
///
/// Points are projected into the plane basis and sorted by their angle
/// around the centroid. Equal angles keep their input order.
pub fn order_points(points: Vec<Point3<f32>>, plane: &Plane) -> Vec<Point3<f32>> {
    let unordered = Polygon::new(points);
    let centroid = match unordered.centroid() {
        Some(centroid) if unordered.is_renderable() => centroid,
        _ => return unordered.into_vertices(),
    };
    let (u, v) = plane.basis();

    let mut keyed: Vec<(f32, Point3<f32>)> = unordered
        .into_vertices()
        .into_iter()
        .map(|point| {
            let offset = point - centroid;
            (offset.dot(&v).atan2(offset.dot(&u)), point)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    keyed.into_iter().map(|(_, point)| point).collect()
}

/// Computes the polygon of every face of a brush, in plane order.
pub fn brush_polygons(planes: &[Plane], config: &PolygonizeConfig) -> Vec<Polygon> {
    (0..planes.len())
        .map(|subject| face_polygon(planes, subject, config))
        .collect()
}
