//! Convex brush polygonization for id-Tech style `.map` files.
//!
//! A map is parsed into a [`Document`] of entities, brushes and faces. Every
//! face plane of a brush is clipped against the brush's other planes to get
//! its boundary [`Polygon`], which is then fan triangulated. [`MeshBuilder`]
//! runs this over a whole document and collects a [`MeshBuffer`] for the
//! renderer.
//!
//! # Example
//!
//! ```ignore
//! use brush_mesh::{Document, MeshBuilder, PolygonizeConfig};
//!
//! let document = Document::from_path("start.map")?;
//! let mesh = MeshBuilder::new(PolygonizeConfig::default()).build_parallel(&document);
//!
//! for (texture, surfaces) in mesh.batches() {
//!     // one draw call per texture
//! }
//! ```

mod config;
mod document;
mod error;
mod plane;
mod polygon;
mod triangle;

pub mod extract;
pub mod mesh;
pub mod parser;
pub mod triangulate;

pub use config::{
    PolygonizeConfig, COLLINEAR_EPSILON, INSIDE_EPSILON, PARALLEL_EPSILON, WELD_EPSILON,
};
pub use document::{Brush, Document, Entity, Face};
pub use error::{Error, Result};
pub use mesh::{build_mesh, FaceId, MeshBuffer, MeshBuilder, MeshStats, Surface};
pub use plane::Plane;
pub use polygon::Polygon;
pub use triangle::Triangle;
