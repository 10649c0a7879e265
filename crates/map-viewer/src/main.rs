use brush_mesh::{Document, MeshBuilder, PolygonizeConfig};
use macroquad::models::draw_mesh;
use macroquad::prelude::*;
use map_viewer::{build_meshes, EntityNavigator, OrbitCamera};

const SAMPLE_MAP: &str = include_str!("../maps/sample.map");

/// Loads the map named on the command line, or the bundled sample room.
fn load_document() -> Option<(String, Document)> {
    match std::env::args().nth(1) {
        Some(path) => match Document::from_path(&path) {
            Ok(document) => Some((path, document)),
            Err(err) => {
                log::error!("{}", err);
                None
            }
        },
        None => {
            log::info!("No map given, showing the bundled sample");
            Some(("sample.map".to_string(), Document::parse(SAMPLE_MAP)))
        }
    }
}

#[macroquad::main("Map Viewer")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some((name, document)) = load_document() else {
        std::process::exit(1);
    };

    let builder = MeshBuilder::new(PolygonizeConfig::default());
    let buffer = builder.build_parallel(&document);
    let stats = buffer.stats();
    let meshes = build_meshes(&buffer);

    let mut camera = OrbitCamera::framing(&buffer);
    let mut navigator = EntityNavigator::new(&buffer);

    loop {
        camera.update();
        navigator.update();

        clear_background(Color::from_rgba(20, 20, 30, 255));
        set_camera(&camera.to_camera3d());

        for mesh in &meshes {
            draw_mesh(mesh);
        }
        navigator.render(&buffer);

        set_default_camera();

        draw_text(&format!("{} - {} entities", name, document.entities.len()), 10.0, 25.0, 20.0, WHITE);
        draw_text(
            &format!(
                "{} faces -> {} triangles | {} degenerate, {} empty",
                stats.faces, stats.triangles, stats.degenerate_planes, stats.empty_faces
            ),
            10.0,
            45.0,
            18.0,
            GRAY,
        );

        navigator.draw_ui(&document, &buffer, 70.0);

        draw_text("Drag mouse to rotate, scroll to zoom", 10.0, 155.0, 16.0, DARKGRAY);
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 175.0, 16.0, DARKGRAY);

        next_frame().await
    }
}
