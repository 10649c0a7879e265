//! Entity selection for interactive inspection of a loaded map.

use std::collections::BTreeSet;

use brush_mesh::{Document, MeshBuffer, Triangle};
use macroquad::prelude::*;

use crate::draw_wireframe;

/// Steps through the entities that produced geometry and highlights one.
pub struct EntityNavigator {
    /// Entities with at least one surface, in document order.
    candidates: Vec<usize>,
    /// Index into `candidates`, `None` when nothing is selected.
    cursor: Option<usize>,
}

impl EntityNavigator {
    /// Creates a navigator over the entities that own surfaces in `buffer`.
    pub fn new(buffer: &MeshBuffer) -> Self {
        let candidates: BTreeSet<usize> = buffer.surfaces().iter().map(|s| s.face.entity).collect();
        Self {
            candidates: candidates.into_iter().collect(),
            cursor: None,
        }
    }

    /// Returns the selected entity index.
    pub fn selected(&self) -> Option<usize> {
        self.cursor.map(|c| self.candidates[c])
    }

    /// Selects the next entity, wrapping around. Returns true if the selection changed.
    pub fn select_next(&mut self) -> bool {
        if self.candidates.is_empty() {
            return false;
        }
        let next = self.cursor.map_or(0, |c| (c + 1) % self.candidates.len());
        let changed = self.cursor != Some(next);
        self.cursor = Some(next);
        changed
    }

    /// Selects the previous entity, wrapping around. Returns true if the selection changed.
    pub fn select_previous(&mut self) -> bool {
        if self.candidates.is_empty() {
            return false;
        }
        let len = self.candidates.len();
        let previous = self.cursor.map_or(len - 1, |c| (c + len - 1) % len);
        let changed = self.cursor != Some(previous);
        self.cursor = Some(previous);
        changed
    }

    /// Clears the selection. Returns true if something was selected.
    pub fn clear(&mut self) -> bool {
        self.cursor.take().is_some()
    }

    /// Handles keyboard input for navigation.
    /// Returns true if navigation state changed.
    pub fn update(&mut self) -> bool {
        let mut changed = false;

        if is_key_pressed(KeyCode::N) {
            changed = self.select_next();
        }
        if is_key_pressed(KeyCode::P) {
            changed = self.select_previous();
        }
        if is_key_pressed(KeyCode::Escape) {
            changed = self.clear();
        }

        changed
    }

    /// Triangles of the selected entity.
    pub fn selected_triangles<'a>(
        &self,
        buffer: &'a MeshBuffer,
    ) -> impl Iterator<Item = &'a Triangle> + 'a {
        let entity = self.selected();
        buffer
            .surfaces()
            .iter()
            .filter(move |s| Some(s.face.entity) == entity)
            .flat_map(move |s| buffer.surface_triangles(s))
    }

    /// Outlines the selected entity's triangles.
    pub fn render(&self, buffer: &MeshBuffer) {
        draw_wireframe(self.selected_triangles(buffer), YELLOW);
    }

    /// Draws the navigation UI overlay.
    pub fn draw_ui(&self, document: &Document, buffer: &MeshBuffer, y_offset: f32) {
        let Some(entity) = self.selected() else {
            draw_text("No entity selected", 10.0, y_offset, 18.0, WHITE);
            draw_text("[N]ext | [P]revious", 10.0, y_offset + 20.0, 16.0, DARKGRAY);
            return;
        };

        let classname = document
            .entities
            .get(entity)
            .and_then(|e| e.classname())
            .unwrap_or("(no classname)");
        let brushes = document.entities.get(entity).map_or(0, |e| e.brushes.len());
        let triangles = self.selected_triangles(buffer).count();

        draw_text(
            &format!("Entity {}: {}", entity, classname),
            10.0,
            y_offset,
            18.0,
            YELLOW,
        );
        draw_text(
            &format!("{} brushes, {} triangles", brushes, triangles),
            10.0,
            y_offset + 20.0,
            18.0,
            WHITE,
        );
        draw_text(
            "[N]ext | [P]revious | [Esc] clear",
            10.0,
            y_offset + 40.0,
            16.0,
            DARKGRAY,
        );
    }
}
