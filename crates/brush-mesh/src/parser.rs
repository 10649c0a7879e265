//! Line-based reader for id-Tech style `.map` text.
//!
//! ```text
//! // entity 0
//! {
//! "classname" "worldspawn"
//! {
//! ( -64 -64 -16 ) ( -64 -63 -16 ) ( -64 -64 -15 ) base/wall [ 0 -1 0 0 ] [ 0 0 -1 0 ] 0 1 1
//! ...
//! }
//! }
//! ```
//!
//! Parsing never fails as a whole. A face or property line that cannot be
//! read is dropped with a warning and the rest of the file is kept.

use nalgebra::{Point3, Vector3};
use thiserror::Error;

use crate::{Brush, Document, Entity, Face};

/// Why a single face line was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FaceError {
    #[error("missing {0}")]
    MissingToken(&'static str),

    #[error("invalid {field}: {token:?}")]
    InvalidNumber { field: &'static str, token: String },

    #[error("non-finite {field}: {token:?}")]
    NonFinite { field: &'static str, token: String },
}

/// Position of the reader inside the entity/brush tree.
///
/// `depth` counts open braces. Depth 1 is inside an entity, depth 2 inside a
/// brush, anything deeper is a block this reader skips (patch definitions).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseState {
    pub entity: Option<usize>,
    pub brush: Option<usize>,
    pub depth: usize,
}

/// Parses a whole map document.
pub fn parse_document(text: &str) -> Document {
    let (document, state) = text.lines().enumerate().fold(
        (Document::default(), ParseState::default()),
        |(mut document, state), (index, line)| {
            let state = parse_line(&mut document, state, index + 1, line);
            (document, state)
        },
    );

    if state.depth > 0 {
        log::warn!("Map ended with {} unclosed block(s)", state.depth);
    }
    document
}

/// Applies one line to the document and returns the next state.
pub fn parse_line(
    document: &mut Document,
    state: ParseState,
    line_number: usize,
    line: &str,
) -> ParseState {
    let line = line.trim();
    if line.is_empty() || line.starts_with('/') {
        return state;
    }

    match line {
        "{" => open_block(document, state, line_number),
        "}" => close_block(state, line_number),
        _ => {
            match (state.depth, state.entity, state.brush) {
                (2, Some(entity), Some(brush)) => {
                    match parse_face(line) {
                        Ok(face) => {
                            if let Some(brush) = document
                                .entities
                                .get_mut(entity)
                                .and_then(|e| e.brushes.get_mut(brush))
                            {
                                brush.faces.push(face);
                            }
                        }
                        Err(err) => {
                            log::warn!("Line {}: dropping face ({})", line_number, err);
                        }
                    }
                }
                (1, Some(entity), None) => match parse_key_value(line) {
                    Some((key, value)) => {
                        if let Some(entity) = document.entities.get_mut(entity) {
                            entity.set(key, value);
                        }
                    }
                    None => {
                        log::warn!("Line {}: dropping malformed property {:?}", line_number, line);
                    }
                },
                (0, _, _) => {
                    log::warn!("Line {}: text outside of any entity", line_number);
                }
                _ => {}
            }
            state
        }
    }
}

fn open_block(document: &mut Document, state: ParseState, line_number: usize) -> ParseState {
    match (state.depth, state.entity) {
        (0, _) => {
            document.entities.push(Entity::new());
            ParseState {
                entity: Some(document.entities.len() - 1),
                brush: None,
                depth: 1,
            }
        }
        (1, Some(entity)) => match document.entities.get_mut(entity) {
            Some(owner) => {
                owner.brushes.push(Brush::default());
                ParseState {
                    entity: Some(entity),
                    brush: Some(owner.brushes.len() - 1),
                    depth: 2,
                }
            }
            None => ParseState {
                depth: state.depth + 1,
                ..state
            },
        },
        _ => {
            log::debug!("Line {}: skipping nested block", line_number);
            ParseState {
                depth: state.depth + 1,
                ..state
            }
        }
    }
}

fn close_block(state: ParseState, line_number: usize) -> ParseState {
    match state.depth {
        0 => {
            log::warn!("Line {}: unmatched closing brace", line_number);
            state
        }
        1 => ParseState::default(),
        2 => ParseState {
            brush: None,
            depth: 1,
            ..state
        },
        depth => ParseState {
            depth: depth - 1,
            ..state
        },
    }
}

/// Reads a `"key" "value"` line. Text between the first two quotes is the
/// key, text between the third and fourth is the value.
pub fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let mut quotes = line.match_indices('"').map(|(index, _)| index);
    let (q1, q2, q3, q4) = (quotes.next()?, quotes.next()?, quotes.next()?, quotes.next()?);
    Some((&line[q1 + 1..q2], &line[q3 + 1..q4]))
}

/// Reads one face line of a brush.
///
/// Layout: three `( x y z )` points, texture name, `[ ux uy uz u_offset ]`,
/// `[ vx vy vz v_offset ]`, rotation, U scale, V scale, then optionally
/// surface flags, contents flags and value. Bracket tokens are skipped.
pub fn parse_face(line: &str) -> Result<Face, FaceError> {
    let mut tokens = Tokens::new(line);

    let mut points = [Point3::origin(); 3];
    for point in &mut points {
        *point = Point3::new(
            tokens.float("point x")?,
            tokens.float("point y")?,
            tokens.float("point z")?,
        );
    }

    let texture = tokens.required("texture name")?.to_string();
    let u_axis = Vector3::new(
        tokens.float("u axis")?,
        tokens.float("u axis")?,
        tokens.float("u axis")?,
    );
    let u_offset = tokens.float("u offset")?;
    let v_axis = Vector3::new(
        tokens.float("v axis")?,
        tokens.float("v axis")?,
        tokens.float("v axis")?,
    );
    let v_offset = tokens.float("v offset")?;
    let rotation = tokens.float("rotation")?;
    let u_scale = tokens.float("u scale")?;
    let v_scale = tokens.float("v scale")?;

    let surface_flags = tokens.optional_int("surface flags")?;
    let contents_flags = tokens.optional_int("contents flags")?;
    let value = tokens.optional_int("value")?;

    Ok(Face {
        points,
        texture,
        u_axis,
        u_offset,
        v_axis,
        v_offset,
        rotation,
        u_scale,
        v_scale,
        surface_flags,
        contents_flags,
        value,
    })
}

/// Whitespace tokens of a face line, without the bracket punctuation.
struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = &'a str> + 'a>,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            inner: Box::new(
                line.split_whitespace()
                    .filter(|token| !matches!(*token, "(" | ")" | "[" | "]")),
            ),
        }
    }

    fn required(&mut self, field: &'static str) -> Result<&'a str, FaceError> {
        self.inner.next().ok_or(FaceError::MissingToken(field))
    }

    fn float(&mut self, field: &'static str) -> Result<f32, FaceError> {
        let token = self.required(field)?;
        let value: f32 = token.parse().map_err(|_| FaceError::InvalidNumber {
            field,
            token: token.to_string(),
        })?;
        if !value.is_finite() {
            return Err(FaceError::NonFinite {
                field,
                token: token.to_string(),
            });
        }
        Ok(value)
    }

    fn optional_int(&mut self, field: &'static str) -> Result<Option<i32>, FaceError> {
        match self.inner.next() {
            None => Ok(None),
            Some(token) => token.parse().map(Some).map_err(|_| FaceError::InvalidNumber {
                field,
                token: token.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_MAP: &str = r#"
// Game: Quake
// Format: Valve
// entity 0
{
"classname" "worldspawn"
"wad" "quake.wad"
// brush 0
{
( -64 -64 -16 ) ( -64 -63 -16 ) ( -64 -64 -15 ) base/wall [ 0 -1 0 0 ] [ 0 0 -1 0 ] 0 1 1
( -64 -64 -16 ) ( -64 -64 -15 ) ( -63 -64 -16 ) base/wall [ 1 0 0 0 ] [ 0 0 -1 0 ] 0 1 1
( -64 -64 -16 ) ( -63 -64 -16 ) ( -64 -63 -16 ) base/floor [ -1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1
( 64 64 16 ) ( 64 65 16 ) ( 65 64 16 ) base/ceiling [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1
( 64 64 16 ) ( 65 64 16 ) ( 64 64 17 ) base/wall [ -1 0 0 0 ] [ 0 0 -1 0 ] 0 1 1
( 64 64 16 ) ( 64 64 17 ) ( 64 65 16 ) base/wall [ 0 1 0 0 ] [ 0 0 -1 0 ] 0 1 1
}
}
// entity 1
{
"classname" "info_player_start"
"origin" "0 0 40"
}
"#;

    #[test]
    fn parses_entities_and_brushes() {
        let document = parse_document(CUBE_MAP);
        assert_eq!(document.entities.len(), 2);

        let world = &document.entities[0];
        assert_eq!(world.classname(), Some("worldspawn"));
        assert_eq!(world.get("wad"), Some("quake.wad"));
        assert_eq!(world.brushes.len(), 1);
        assert_eq!(world.brushes[0].faces.len(), 6);

        let start = &document.entities[1];
        assert_eq!(start.classname(), Some("info_player_start"));
        assert_eq!(start.get("origin"), Some("0 0 40"));
        assert!(start.brushes.is_empty());
    }

    #[test]
    fn parses_face_fields() {
        let face = parse_face(
            "( -64 -64 -16 ) ( -64 -63 -16 ) ( -64 -64 -15 ) base/wall [ 0 -1 0 8 ] [ 0 0 -1 4 ] 45 0.5 2",
        )
        .unwrap();

        assert_eq!(face.points[0], Point3::new(-64.0, -64.0, -16.0));
        assert_eq!(face.points[1], Point3::new(-64.0, -63.0, -16.0));
        assert_eq!(face.points[2], Point3::new(-64.0, -64.0, -15.0));
        assert_eq!(face.texture, "base/wall");
        assert_eq!(face.u_axis, Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(face.u_offset, 8.0);
        assert_eq!(face.v_axis, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(face.v_offset, 4.0);
        assert_eq!(face.rotation, 45.0);
        assert_eq!(face.u_scale, 0.5);
        assert_eq!(face.v_scale, 2.0);
        assert_eq!(face.surface_flags, None);
        assert_eq!(face.contents_flags, None);
        assert_eq!(face.value, None);
    }

    #[test]
    fn parses_optional_flags() {
        let face = parse_face(
            "( 0 0 0 ) ( 0 1 0 ) ( 1 0 0 ) *water [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1 8 32 100",
        )
        .unwrap();
        assert_eq!(face.texture, "*water");
        assert_eq!(face.surface_flags, Some(8));
        assert_eq!(face.contents_flags, Some(32));
        assert_eq!(face.value, Some(100));

        let partial =
            parse_face("( 0 0 0 ) ( 0 1 0 ) ( 1 0 0 ) sky [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1 4").unwrap();
        assert_eq!(partial.surface_flags, Some(4));
        assert_eq!(partial.contents_flags, None);
    }

    #[test]
    fn rejects_short_face() {
        let result = parse_face("( 0 0 0 ) ( 0 1 0 ) ( 1 0 0 ) sky [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1");
        assert_eq!(result, Err(FaceError::MissingToken("v scale")));
    }

    #[test]
    fn rejects_bad_numbers() {
        let result = parse_face("( 0 zero 0 ) ( 0 1 0 ) ( 1 0 0 ) sky [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1");
        assert_eq!(
            result,
            Err(FaceError::InvalidNumber {
                field: "point y",
                token: "zero".to_string()
            })
        );

        let result =
            parse_face("( 0 0 0 ) ( 0 1 0 ) ( 1 0 0 ) sky [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1 x");
        assert!(matches!(result, Err(FaceError::InvalidNumber { field: "surface flags", .. })));
    }

    #[test]
    fn rejects_non_finite_numbers() {
        let result = parse_face("( 5 5 nan ) ( 5 6 5 ) ( 6 5 5 ) sky [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1");
        assert_eq!(
            result,
            Err(FaceError::NonFinite {
                field: "point z",
                token: "nan".to_string()
            })
        );

        for token in ["inf", "-infinity", "NaN"] {
            let line = format!("( 0 0 0 ) ( 0 1 0 ) ( 1 0 0 ) sky [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 {token} 1");
            assert!(matches!(parse_face(&line), Err(FaceError::NonFinite { field: "u scale", .. })));
        }
    }

    #[test]
    fn non_finite_face_line_is_dropped() {
        let text = CUBE_MAP.replacen(
            "( 64 64 16 ) ( 64 65 16 ) ( 65 64 16 ) base/ceiling",
            "( 5 5 nan ) ( 5 6 5 ) ( 6 5 5 ) bogus [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1\n( 64 64 16 ) ( 64 65 16 ) ( 65 64 16 ) base/ceiling",
            1,
        );
        let document = parse_document(&text);
        let faces = &document.entities[0].brushes[0].faces;
        assert_eq!(faces.len(), 6);
        assert!(faces.iter().all(|face| face.texture != "bogus"));
    }

    #[test]
    fn malformed_face_line_is_dropped() {
        let text = "{\n{\n( 0 0 0 ) ( 0 1 0 ) ( 1 0 0 ) a [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1\n( 0 0 oops ) broken\n( 0 0 0 ) ( 1 0 0 ) ( 0 0 1 ) b [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1\n}\n}\n";
        let document = parse_document(text);
        let faces = &document.entities[0].brushes[0].faces;
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].texture, "a");
        assert_eq!(faces[1].texture, "b");
    }

    #[test]
    fn key_values() {
        assert_eq!(parse_key_value(r#""classname" "light""#), Some(("classname", "light")));
        assert_eq!(parse_key_value(r#""message" """#), Some(("message", "")));
        assert_eq!(parse_key_value(r#""broken" "value"#), None);
        assert_eq!(parse_key_value("no quotes"), None);
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let document = parse_document("{\n\"light\" \"200\"\n\"light\" \"300\"\n}\n");
        assert_eq!(document.entities[0].get("light"), Some("300"));
    }

    #[test]
    fn state_tracks_nesting() {
        let mut document = Document::default();
        let state = parse_line(&mut document, ParseState::default(), 1, "{");
        assert_eq!(
            state,
            ParseState {
                entity: Some(0),
                brush: None,
                depth: 1
            }
        );

        let state = parse_line(&mut document, state, 2, "  {  ");
        assert_eq!(state.brush, Some(0));
        assert_eq!(state.depth, 2);

        let state = parse_line(&mut document, state, 3, "}");
        assert_eq!(state.brush, None);
        assert_eq!(state.entity, Some(0));

        let state = parse_line(&mut document, state, 4, "}");
        assert_eq!(state, ParseState::default());
    }

    #[test]
    fn nested_blocks_are_skipped() {
        let text = "{\n\"classname\" \"worldspawn\"\n{\npatchDef2\n{\ncommon/caulk\n( 3 3 0 0 0 )\n}\n}\n{\n( 0 0 0 ) ( 0 1 0 ) ( 1 0 0 ) a [ 1 0 0 0 ] [ 0 -1 0 0 ] 0 1 1\n}\n}\n";
        let document = parse_document(text);
        assert_eq!(document.entities.len(), 1);

        let world = &document.entities[0];
        assert_eq!(world.brushes.len(), 2);
        assert!(world.brushes[0].faces.is_empty());
        assert_eq!(world.brushes[1].faces.len(), 1);
    }

    #[test]
    fn stray_lines_are_ignored() {
        let text = "}\n\"orphan\" \"value\"\n\n   \n/ single slash comment\n{\n\"classname\" \"worldspawn\"\n}\n";
        let document = parse_document(text);
        assert_eq!(document.entities.len(), 1);
        assert_eq!(document.entities[0].properties.len(), 1);
    }

    #[test]
    fn unclosed_entity_is_kept() {
        let document = parse_document("{\n\"classname\" \"worldspawn\"\n{\n");
        assert_eq!(document.entities.len(), 1);
        assert_eq!(document.entities[0].brushes.len(), 1);
    }
}
