//! Turns a whole map document into one triangle buffer.
//!
//! Faces are visited in document order: entity, then brush, then face. Each
//! brush first gets its plane list, then every face is extracted and fan
//! triangulated on its own, so [`MeshBuilder::build_parallel`] can spread
//! faces across threads and still produce the same buffer as
//! [`MeshBuilder::build`].

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use nalgebra::Point3;
use rayon::prelude::*;

use crate::{extract, triangulate, Brush, Document, Plane, PolygonizeConfig, Triangle};

/// Location of a face in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId {
    pub entity: usize,
    pub brush: usize,
    pub face: usize,
}

/// The triangles of one face, with the texture they are drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub face: FaceId,
    pub texture: String,
    /// Range into [`MeshBuffer::triangles`].
    pub triangles: Range<usize>,
}

/// Counters collected during a pass. None of these conditions stop the pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Faces in the document.
    pub faces: usize,
    /// Faces whose three points were collinear.
    pub degenerate_planes: usize,
    /// Faces with a valid plane that produced no triangles.
    pub empty_faces: usize,
    /// Triangles in the buffer.
    pub triangles: usize,
}

/// Triangulated surfaces of a document, ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    triangles: Vec<Triangle>,
    surfaces: Vec<Surface>,
    stats: MeshStats,
}

impl MeshBuffer {
    /// Returns all triangles in document order.
    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Returns one surface per face that produced triangles, in document order.
    #[inline]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    #[inline]
    pub fn stats(&self) -> MeshStats {
        self.stats
    }

    /// Returns `true` if no face produced a triangle.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Returns the triangles of one surface.
    pub fn surface_triangles(&self, surface: &Surface) -> &[Triangle] {
        &self.triangles[surface.triangles.clone()]
    }

    /// Flattens the buffer to `x, y, z` floats, three vertices per triangle.
    pub fn interleaved_positions(&self) -> Vec<f32> {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices().iter())
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }

    /// Groups surfaces by texture name, for one draw call per material.
    pub fn batches(&self) -> BTreeMap<&str, Vec<&Surface>> {
        let mut batches: BTreeMap<&str, Vec<&Surface>> = BTreeMap::new();
        for surface in &self.surfaces {
            batches.entry(surface.texture.as_str()).or_default().push(surface);
        }
        batches
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty buffer.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let mut points = self.triangles.iter().flat_map(|t| t.vertices().iter());
        let first = *points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.inf(p), max.sup(p))))
    }
}

/// Runs plane construction, face extraction and triangulation over a document.
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    config: PolygonizeConfig,
}

/// Valid planes of one brush and the face each one came from.
struct BrushPlanes<'a> {
    entity: usize,
    brush: usize,
    source: &'a Brush,
    planes: Vec<Plane>,
    faces: Vec<usize>,
}

/// Triangles of one face before they are merged into the buffer.
struct FaceOutput<'a> {
    face: FaceId,
    texture: &'a str,
    triangles: Vec<Triangle>,
}

impl MeshBuilder {
    pub fn new(config: PolygonizeConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &PolygonizeConfig {
        &self.config
    }

    /// Builds the buffer on the current thread.
    pub fn build(&self, document: &Document) -> MeshBuffer {
        let brushes: Vec<BrushPlanes> = brush_refs(document)
            .into_iter()
            .map(|(entity, index, brush)| self.brush_planes(entity, index, brush))
            .collect();

        let outputs = face_jobs(&brushes)
            .into_iter()
            .map(|(brush, slot)| self.polygonize_face(&brushes[brush], slot))
            .collect();

        self.assemble(document, &brushes, outputs)
    }

    /// Builds the buffer with one rayon task per brush and per face.
    ///
    /// Results are collected through indexed iterators, so every face lands
    /// at its document position and the output equals [`MeshBuilder::build`].
    pub fn build_parallel(&self, document: &Document) -> MeshBuffer {
        let brushes: Vec<BrushPlanes> = brush_refs(document)
            .into_par_iter()
            .map(|(entity, index, brush)| self.brush_planes(entity, index, brush))
            .collect();

        let outputs = face_jobs(&brushes)
            .into_par_iter()
            .map(|(brush, slot)| self.polygonize_face(&brushes[brush], slot))
            .collect();

        self.assemble(document, &brushes, outputs)
    }

    fn brush_planes<'a>(&self, entity: usize, brush: usize, source: &'a Brush) -> BrushPlanes<'a> {
        let mut planes = Vec::with_capacity(source.faces.len());
        let mut faces = Vec::with_capacity(source.faces.len());

        for (index, face) in source.faces.iter().enumerate() {
            match face.plane_with_epsilon(self.config.collinear_epsilon) {
                Ok(plane) => {
                    planes.push(plane);
                    faces.push(index);
                }
                Err(err) => {
                    log::warn!(
                        "Entity {} brush {} face {}: skipping face ({})",
                        entity,
                        brush,
                        index,
                        err
                    );
                }
            }
        }

        BrushPlanes {
            entity,
            brush,
            source,
            planes,
            faces,
        }
    }

    fn polygonize_face<'a>(&self, brush: &BrushPlanes<'a>, slot: usize) -> FaceOutput<'a> {
        let face = FaceId {
            entity: brush.entity,
            brush: brush.brush,
            face: brush.faces[slot],
        };

        let mut polygon = extract::face_polygon(&brush.planes, slot, &self.config);
        if let Some(epsilon) = self.config.weld_epsilon {
            polygon = polygon.welded(epsilon);
        }

        let triangles = triangulate::fan(&polygon);
        if triangles.is_empty() {
            log::debug!(
                "Entity {} brush {} face {}: no visible polygon",
                face.entity,
                face.brush,
                face.face
            );
        }

        let source: &'a Brush = brush.source;
        FaceOutput {
            face,
            texture: &source.faces[face.face].texture,
            triangles,
        }
    }

    fn assemble(
        &self,
        document: &Document,
        brushes: &[BrushPlanes],
        outputs: Vec<FaceOutput>,
    ) -> MeshBuffer {
        let mut buffer = MeshBuffer::default();
        buffer.stats.faces = document.face_count();
        buffer.stats.degenerate_planes = brushes
            .iter()
            .map(|b| b.source.faces.len() - b.planes.len())
            .sum();

        let mut emitted = HashSet::new();
        for output in outputs {
            if output.triangles.is_empty() {
                buffer.stats.empty_faces += 1;
                continue;
            }
            emitted.insert((output.face.entity, output.face.brush));
            let start = buffer.triangles.len();
            buffer.triangles.extend(output.triangles);
            buffer.surfaces.push(Surface {
                face: output.face,
                texture: output.texture.to_string(),
                triangles: start..buffer.triangles.len(),
            });
        }
        buffer.stats.triangles = buffer.triangles.len();

        for brush in brushes {
            if !emitted.contains(&(brush.entity, brush.brush)) && !brush.source.faces.is_empty() {
                log::debug!(
                    "Entity {} brush {}: no geometry, brush is empty or unbounded",
                    brush.entity,
                    brush.brush
                );
            }
        }

        log::info!(
            "Polygonized {} faces into {} triangles ({} degenerate planes, {} empty faces)",
            buffer.stats.faces,
            buffer.stats.triangles,
            buffer.stats.degenerate_planes,
            buffer.stats.empty_faces
        );
        buffer
    }
}

/// Builds the buffer for a document with the default tolerances.
pub fn build_mesh(document: &Document) -> MeshBuffer {
    MeshBuilder::default().build(document)
}

fn brush_refs(document: &Document) -> Vec<(usize, usize, &Brush)> {
    document
        .entities
        .iter()
        .enumerate()
        .flat_map(|(entity, e)| {
            e.brushes
                .iter()
                .enumerate()
                .map(move |(index, brush)| (entity, index, brush))
        })
        .collect()
}

/// `(brush, plane slot)` pairs in document order.
fn face_jobs(brushes: &[BrushPlanes]) -> Vec<(usize, usize)> {
    brushes
        .iter()
        .enumerate()
        .flat_map(|(index, brush)| (0..brush.planes.len()).map(move |slot| (index, slot)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, Face};
    use approx::assert_relative_eq;

    const UNIT_CUBE: &str = "\
( -1 -1 -1 ) ( -1 0 -1 ) ( -1 -1 0 ) west [ 0 -1 0 0 ] [ 0 0 -1 0 ] 0 1 1
( -1 -1 -1 ) ( -1 -1 0 ) ( 0 -1 -1 ) south [ 1 0 0 0 ] [ 0 0 -1 0 ] 0 1 1
( -1 -1 -1 ) ( 0 -1 -1 ) ( -1 0 -1 ) floor [ -1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1
( 1 1 1 ) ( 1 2 1 ) ( 2 1 1 ) ceiling [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1
( 1 1 1 ) ( 2 1 1 ) ( 1 1 2 ) north [ -1 0 0 0 ] [ 0 0 -1 0 ] 0 1 1
( 1 1 1 ) ( 1 1 2 ) ( 1 2 1 ) east [ 0 1 0 0 ] [ 0 0 -1 0 ] 0 1 1
";

    fn cube_document() -> Document {
        Document::parse(&format!("{{\n\"classname\" \"worldspawn\"\n{{\n{}}}\n}}\n", UNIT_CUBE))
    }

    /// Face whose points `a, b, c` run counter-clockwise seen from outside.
    fn outward_face(a: [f32; 3], b: [f32; 3], c: [f32; 3], texture: &str) -> Face {
        let p = |v: [f32; 3]| Point3::new(v[0], v[1], v[2]);
        Face::new([p(a), p(c), p(b)], texture)
    }

    fn pyramid() -> Brush {
        let apex = [0.0, 0.0, 1.0];
        Brush::new(vec![
            outward_face([-1.0, -1.0, 0.0], [-1.0, 1.0, 0.0], [1.0, 1.0, 0.0], "base"),
            outward_face([1.0, -1.0, 0.0], [1.0, 1.0, 0.0], apex, "side"),
            outward_face([1.0, 1.0, 0.0], [-1.0, 1.0, 0.0], apex, "side"),
            outward_face([-1.0, 1.0, 0.0], [-1.0, -1.0, 0.0], apex, "side"),
            outward_face([-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], apex, "side"),
        ])
    }

    fn single_brush_document(brush: Brush) -> Document {
        let mut entity = Entity::new();
        entity.set("classname", "worldspawn");
        entity.brushes.push(brush);
        Document {
            entities: vec![entity],
        }
    }

    #[test]
    fn cube_yields_twelve_triangles() {
        let document = cube_document();
        let mesh = build_mesh(&document);

        assert_eq!(mesh.triangles().len(), 12);
        assert_eq!(mesh.surfaces().len(), 6);
        for triangle in mesh.triangles() {
            for vertex in triangle.vertices() {
                for coord in vertex.iter() {
                    assert!((coord.abs() - 1.0).abs() < 1e-6, "coordinate {}", coord);
                }
            }
        }

        let total: f32 = mesh.triangles().iter().map(|t| t.area()).sum();
        assert_relative_eq!(total, 24.0, epsilon = 1e-4);
        assert_eq!(
            mesh.stats(),
            MeshStats {
                faces: 6,
                degenerate_planes: 0,
                empty_faces: 0,
                triangles: 12
            }
        );
    }

    #[test]
    fn triangles_face_outward() {
        let document = cube_document();
        let mesh = build_mesh(&document);
        let brush = &document.entities[0].brushes[0];

        for surface in mesh.surfaces() {
            let plane = brush.faces[surface.face.face].plane().unwrap();
            for triangle in mesh.surface_triangles(surface) {
                let normal = triangle.unit_normal().unwrap();
                assert_relative_eq!(normal, plane.normal(), epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn surfaces_follow_face_order() {
        let mesh = build_mesh(&cube_document());
        let textures: Vec<&str> = mesh.surfaces().iter().map(|s| s.texture.as_str()).collect();
        assert_eq!(textures, ["west", "south", "floor", "ceiling", "north", "east"]);

        for (index, surface) in mesh.surfaces().iter().enumerate() {
            assert_eq!(surface.face, FaceId { entity: 0, brush: 0, face: index });
            assert_eq!(surface.triangles, index * 2..index * 2 + 2);
        }
    }

    #[test]
    fn empty_brush_is_skipped_without_error() {
        let mut document = cube_document();
        let mut inverted = document.entities[0].brushes[0].clone();
        // Swap the west and east faces so x <= -1 and x >= 1 must both hold
        inverted.faces.swap(0, 5);
        for (face, shift) in [(0, -2.0), (5, 2.0)] {
            for point in &mut inverted.faces[face].points {
                point.x += shift;
            }
        }
        document.entities[0].brushes.push(inverted);

        let mesh = build_mesh(&document);
        assert_eq!(mesh.triangles().len(), 12);
        assert_eq!(mesh.stats().empty_faces, 6);
        assert!(mesh.surfaces().iter().all(|s| s.face.brush == 0));
    }

    #[test]
    fn degenerate_face_is_skipped() {
        let mut document = cube_document();
        let brush = &mut document.entities[0].brushes[0];
        // Collinear points on the ceiling leave the brush open at the top
        brush.faces[3].points = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
        ];

        let mesh = build_mesh(&document);
        let stats = mesh.stats();
        assert_eq!(stats.degenerate_planes, 1);
        assert_eq!(stats.empty_faces, 4);
        assert_eq!(stats.triangles, 2);
        assert_eq!(mesh.surfaces()[0].texture, "floor");
    }

    #[test]
    fn non_finite_face_leaves_siblings_intact() {
        let mut document = cube_document();
        let brush = &mut document.entities[0].brushes[0];
        brush.faces.push(Face::new(
            [
                Point3::new(5.0, 5.0, f32::NAN),
                Point3::new(5.0, 6.0, 5.0),
                Point3::new(6.0, 5.0, 5.0),
            ],
            "bogus",
        ));

        let mesh = build_mesh(&document);
        let stats = mesh.stats();
        assert_eq!(stats.faces, 7);
        assert_eq!(stats.degenerate_planes, 1);
        assert_eq!(stats.empty_faces, 0);
        assert_eq!(stats.triangles, 12);
        assert!(mesh.surfaces().iter().all(|s| s.texture != "bogus"));
    }

    #[test]
    fn welding_removes_zero_area_triangles() {
        let document = single_brush_document(pyramid());

        let welded = build_mesh(&document);
        assert_eq!(welded.triangles().len(), 6);
        assert!(welded.triangles().iter().all(|t| t.area() > 1e-3));

        let raw = MeshBuilder::new(PolygonizeConfig::default().with_weld_epsilon(None))
            .build(&document);
        assert_eq!(raw.triangles().len(), 14);

        let expected = 4.0 + 4.0 * 2.0_f32.sqrt();
        for mesh in [&welded, &raw] {
            let total: f32 = mesh.triangles().iter().map(|t| t.area()).sum();
            assert_relative_eq!(total, expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn parallel_build_matches_sequential() {
        let mut document = cube_document();
        let mut brushes = vec![pyramid()];
        for offset in 1..8 {
            let mut brush = document.entities[0].brushes[0].clone();
            for face in &mut brush.faces {
                for point in &mut face.points {
                    point.x += offset as f32 * 3.0;
                }
            }
            brushes.push(brush);
        }
        document.entities[0].brushes.extend(brushes);
        document.entities.push(single_brush_document(pyramid()).entities.remove(0));

        let builder = MeshBuilder::default();
        let sequential = builder.build(&document);
        let parallel = builder.build_parallel(&document);
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.triangles().len(), 12 * 8 + 6 * 2);
    }

    #[test]
    fn build_is_repeatable() {
        let document = single_brush_document(pyramid());
        let builder = MeshBuilder::default();
        assert_eq!(builder.build(&document), builder.build(&document));
    }

    #[test]
    fn interleaved_positions_layout() {
        let mesh = build_mesh(&cube_document());
        let positions = mesh.interleaved_positions();
        assert_eq!(positions.len(), 12 * 9);

        let first = mesh.triangles()[0].vertices()[0];
        assert_eq!(&positions[..3], &[first.x, first.y, first.z]);
    }

    #[test]
    fn batches_group_by_texture() {
        let document = single_brush_document(pyramid());
        let mesh = build_mesh(&document);
        let batches = mesh.batches();

        assert_eq!(batches.keys().copied().collect::<Vec<_>>(), ["base", "side"]);
        assert_eq!(batches["base"].len(), 1);
        assert_eq!(batches["side"].len(), 4);
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let (min, max) = build_mesh(&cube_document()).bounds().unwrap();
        assert_relative_eq!(min, Point3::new(-1.0, -1.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(max, Point3::new(1.0, 1.0, 1.0), epsilon = 1e-6);

        assert!(MeshBuffer::default().bounds().is_none());
    }

    #[test]
    fn empty_document() {
        let mesh = build_mesh(&Document::default());
        assert!(mesh.is_empty());
        assert_eq!(mesh.stats(), MeshStats::default());
    }
}
