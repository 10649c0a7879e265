//! Retained-mode rendering of polygonized map brushes.

use std::hash::{Hash, Hasher};

use brush_mesh::{MeshBuffer, Triangle};
use macroquad::models::{Mesh, Vertex};
use macroquad::prelude::*;
use nalgebra::Point3;

pub mod navigator;
pub use navigator::EntityNavigator;

/// Vertices per uploaded mesh. Stays under macroquad's default draw call
/// capacity of 5000 indices and is a whole number of triangles.
pub const MAX_MESH_VERTICES: usize = 4998;

/// Map units are Z-up, macroquad is Y-up.
pub fn to_view(point: Point3<f32>) -> Vec3 {
    vec3(point.x, point.z, -point.y)
}

/// Generates a deterministic color from a texture name using hashing.
/// Surfaces sharing a texture get the same color across frames and runs.
pub fn texture_color(texture: &str) -> Color {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    texture.hash(&mut hasher);
    let hash = hasher.finish();

    let r = ((hash >> 16) & 0xFF) as u8;
    let g = ((hash >> 8) & 0xFF) as u8;
    let b = (hash & 0xFF) as u8;

    // Ensure colors aren't too dark by adding a minimum brightness
    Color::from_rgba(r.max(60), g.max(60), b.max(60), 255)
}

/// Darkens a color by how far the triangle faces away from a fixed light.
pub fn shade(color: Color, triangle: &Triangle) -> Color {
    let light = nalgebra::Vector3::new(0.3, 0.5, 0.8).normalize();
    let factor = triangle
        .unit_normal()
        .map_or(1.0, |n| 0.55 + 0.45 * n.dot(&light).abs());
    Color::new(color.r * factor, color.g * factor, color.b * factor, color.a)
}

/// Uploads every texture batch of the buffer into macroquad meshes.
///
/// Meshes are built once and drawn every frame. A batch larger than
/// [`MAX_MESH_VERTICES`] is split over several meshes.
pub fn build_meshes(buffer: &MeshBuffer) -> Vec<Mesh> {
    let mut meshes = Vec::new();

    for (texture, surfaces) in buffer.batches() {
        let color = texture_color(texture);
        let triangles = surfaces
            .iter()
            .flat_map(|surface| buffer.surface_triangles(surface));

        let mut vertices: Vec<Vertex> = Vec::new();
        for triangle in triangles {
            if vertices.len() + 3 > MAX_MESH_VERTICES {
                meshes.push(finish_mesh(std::mem::take(&mut vertices)));
            }
            let color = shade(color, triangle);
            vertices.extend(
                triangle
                    .vertices()
                    .iter()
                    .map(|p| Vertex::new2(to_view(*p), vec2(0.0, 0.0), color)),
            );
        }
        if !vertices.is_empty() {
            meshes.push(finish_mesh(vertices));
        }
    }

    log::debug!("Uploaded {} meshes", meshes.len());
    meshes
}

fn finish_mesh(vertices: Vec<Vertex>) -> Mesh {
    let indices = (0..vertices.len()).map(|i| i as u16).collect();
    Mesh {
        vertices,
        indices,
        texture: None,
    }
}

/// Draws triangle outlines, used to highlight a selection.
pub fn draw_wireframe<'a>(triangles: impl IntoIterator<Item = &'a Triangle>, color: Color) {
    for triangle in triangles {
        let [a, b, c] = triangle.vertices().map(to_view);
        draw_line_3d(a, b, color);
        draw_line_3d(b, c, color);
        draw_line_3d(c, a, color);
    }
}

/// Scroll step as a fraction of the camera's far limit.
const ZOOM_STEP: f32 = 0.01;

/// Radians turned per frame while an arrow key is held.
const KEY_TURN_RATE: f32 = 0.02;

/// Camera circling a point of the map, driven by mouse and arrow keys.
///
/// Angles are in radians: `yaw` turns around the view-space up axis and
/// `pitch` tilts towards it.
pub struct OrbitCamera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Orbit center in view space (see [`to_view`]).
    pub target: Vec3,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, yaw: f32, pitch: f32) -> Self {
        Self {
            distance,
            yaw,
            pitch,
            target: Vec3::ZERO,
            zoom_speed: 5.0,
            min_distance: 10.0,
            max_distance: 200.0,
        }
    }

    /// Creates a camera looking at the center of the buffer's bounds from
    /// far enough away to see all of it.
    pub fn framing(buffer: &MeshBuffer) -> Self {
        let Some((min, max)) = buffer.bounds() else {
            return Self::new(256.0, 0.6, 0.5).with_distance_range(16.0, 4096.0);
        };
        let (min, max) = (to_view(min), to_view(max));
        let radius = ((max - min).length() * 0.5).max(1.0);

        Self::new(radius * 2.5, 0.6, 0.5)
            .with_distance_range(radius * 0.2, radius * 10.0)
            .looking_at((min + max) * 0.5)
    }

    /// Bounds the orbit distance and scales the scroll step to the far limit,
    /// so a large map zooms in as few wheel clicks as a small one.
    pub fn with_distance_range(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self.zoom_speed = max * ZOOM_STEP;
        self.distance = self.distance.clamp(min, max);
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Applies one frame of input: left drag or arrow keys orbit, the wheel
    /// zooms.
    pub fn update(&mut self) {
        let mut turn = if is_mouse_button_down(MouseButton::Left) {
            -mouse_delta_position() * 2.0
        } else {
            Vec2::ZERO
        };
        if is_key_down(KeyCode::Left) {
            turn.x += KEY_TURN_RATE;
        }
        if is_key_down(KeyCode::Right) {
            turn.x -= KEY_TURN_RATE;
        }
        if is_key_down(KeyCode::Up) {
            turn.y += KEY_TURN_RATE;
        }
        if is_key_down(KeyCode::Down) {
            turn.y -= KEY_TURN_RATE;
        }
        self.orbit(turn.x, turn.y);
        self.zoom(mouse_wheel().1);
    }

    /// Turns around the target. Pitch stops short of the poles, where the
    /// up vector would flip.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        self.yaw += yaw;
        self.pitch = (self.pitch + pitch).clamp(-1.5, 1.5);
    }

    /// Moves towards the target by `steps` scroll steps, within the range.
    pub fn zoom(&mut self, steps: f32) {
        self.distance =
            (self.distance - steps * self.zoom_speed).clamp(self.min_distance, self.max_distance);
    }

    /// Eye position in view space.
    pub fn position(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.target + self.distance * vec3(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn to_camera3d(&self) -> Camera3D {
        Camera3D {
            position: self.position(),
            up: Vec3::Y,
            target: self.target,
            ..Default::default()
        }
    }
}
