//! Ordered face polygons.

use nalgebra::{Point3, Vector3};

use crate::Plane;

/// A polygon in 3D space, defined by an ordered list of vertices.
///
/// Face polygons produced by the extractor are convex, coplanar and wound
/// counter-clockwise when viewed from the front (the direction the face
/// normal points). An empty polygon is valid and means the face is clipped
/// away entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point3<f32>>,
}

impl Polygon {
    /// Creates a new polygon from an ordered list of vertices.
    pub fn new(vertices: Vec<Point3<f32>>) -> Self {
        Self { vertices }
    }

    /// Creates a polygon with no vertices.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the vertices of the polygon.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    /// Consumes the polygon and returns its vertices.
    #[inline]
    pub fn into_vertices(self) -> Vec<Point3<f32>> {
        self.vertices
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the polygon has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns true if the polygon has enough vertices to enclose an area.
    #[inline]
    pub fn is_renderable(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// Computes the mean of the vertices, or `None` for an empty polygon.
    pub fn centroid(&self) -> Option<Point3<f32>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum: Vector3<f32> = self.vertices.iter().map(|p| p.coords).sum();
        Some(Point3::from(sum / self.vertices.len() as f32))
    }

    /// Computes the area vector (normal scaled by area) of the polygon.
    ///
    /// Its direction follows the right-hand rule based on vertex winding.
    pub fn area_vector(&self) -> Vector3<f32> {
        let n = self.vertices.len();
        let mut sum = Vector3::zeros();
        for i in 0..n {
            let a = self.vertices[i].coords;
            let b = self.vertices[(i + 1) % n].coords;
            sum += a.cross(&b);
        }
        sum * 0.5
    }

    /// Computes the unsigned area of the polygon.
    pub fn area(&self) -> f32 {
        self.area_vector().norm()
    }

    /// Computes the signed area in the plane's 2D basis (shoelace formula).
    ///
    /// Positive when the vertices run counter-clockwise seen from the front
    /// of `plane`.
    pub fn signed_area(&self, plane: &Plane) -> f32 {
        let projected: Vec<_> = self.vertices.iter().map(|p| plane.project(*p)).collect();
        let n = projected.len();
        let mut twice_area = 0.0;
        for i in 0..n {
            let a = projected[i];
            let b = projected[(i + 1) % n];
            twice_area += a.x * b.y - b.x * a.y;
        }
        twice_area * 0.5
    }

    /// Returns a copy without consecutive vertices closer than `epsilon`.
    ///
    /// The polygon is treated as closed, so a last vertex that coincides with
    /// the first one is dropped too.
    pub fn welded(&self, epsilon: f32) -> Polygon {
        let mut kept: Vec<Point3<f32>> = Vec::with_capacity(self.vertices.len());
        for vertex in &self.vertices {
            match kept.last() {
                Some(last) if (vertex - last).norm() <= epsilon => {}
                _ => kept.push(*vertex),
            }
        }
        while kept.len() > 1 && (kept[kept.len() - 1] - kept[0]).norm() <= epsilon {
            kept.pop();
        }
        Polygon::new(kept)
    }
}
