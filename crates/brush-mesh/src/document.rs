//! In-memory representation of a parsed map file.
//!
//! Ownership is a plain tree: a [`Document`] owns its entities, each
//! [`Entity`] owns its brushes and each [`Brush`] owns its faces. Values are
//! built once by the parser and only read afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::config::COLLINEAR_EPSILON;
use crate::{parser, Plane, Result};

/// One face line of a brush.
///
/// Only `points` is used for geometry. The texture fields are carried
/// through untouched for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Three points on the face plane, in file order.
    pub points: [Point3<f32>; 3],
    pub texture: String,
    pub u_axis: Vector3<f32>,
    pub u_offset: f32,
    pub v_axis: Vector3<f32>,
    pub v_offset: f32,
    pub rotation: f32,
    pub u_scale: f32,
    pub v_scale: f32,
    pub surface_flags: Option<i32>,
    pub contents_flags: Option<i32>,
    pub value: Option<i32>,
}

impl Face {
    /// Creates a face with default texture axes (world X and -Z, no offset, unit scale).
    pub fn new(points: [Point3<f32>; 3], texture: impl Into<String>) -> Self {
        Self {
            points,
            texture: texture.into(),
            u_axis: Vector3::x(),
            u_offset: 0.0,
            v_axis: -Vector3::z(),
            v_offset: 0.0,
            rotation: 0.0,
            u_scale: 1.0,
            v_scale: 1.0,
            surface_flags: None,
            contents_flags: None,
            value: None,
        }
    }

    /// Builds the outward-facing plane of this face.
    pub fn plane(&self) -> Result<Plane> {
        self.plane_with_epsilon(COLLINEAR_EPSILON)
    }

    /// Builds the face plane with a custom collinearity tolerance.
    ///
    /// Map files list the points clockwise when seen from outside the brush,
    /// so they are passed as `(p1, p3, p2)` to get an outward normal.
    pub fn plane_with_epsilon(&self, epsilon: f32) -> Result<Plane> {
        let [p1, p2, p3] = self.points;
        Plane::from_points_with_epsilon(p1, p3, p2, epsilon)
    }
}

/// A convex solid, one face per bounding plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Brush {
    pub faces: Vec<Face>,
}

impl Brush {
    pub fn new(faces: Vec<Face>) -> Self {
        Self { faces }
    }
}

/// Key/value properties plus the brushes owned by an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    pub properties: BTreeMap<String, String>,
    pub brushes: Vec<Brush>,
}

impl Entity {
    /// Creates an entity with no properties and no brushes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Sets a property, replacing any previous value for the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Returns the `classname` property.
    pub fn classname(&self) -> Option<&str> {
        self.get("classname")
    }
}

/// All entities of a map file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub entities: Vec<Entity>,
}

impl Document {
    /// Parses map text. Malformed lines are dropped, see [`parser::parse_document`].
    pub fn parse(text: &str) -> Self {
        parser::parse_document(text)
    }

    /// Reads and parses a map file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let document = parser::parse_document(&text);
        log::info!(
            "Loaded {}: {} entities, {} brushes, {} faces",
            path.display(),
            document.entities.len(),
            document.brush_count(),
            document.face_count()
        );
        Ok(document)
    }

    /// Returns the first entity whose classname is `worldspawn`.
    pub fn worldspawn(&self) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|entity| entity.classname() == Some("worldspawn"))
    }

    /// Total number of brushes across all entities.
    pub fn brush_count(&self) -> usize {
        self.entities.iter().map(|e| e.brushes.len()).sum()
    }

    /// Total number of faces across all brushes.
    pub fn face_count(&self) -> usize {
        self.entities
            .iter()
            .flat_map(|e| &e.brushes)
            .map(|b| b.faces.len())
            .sum()
    }
}
