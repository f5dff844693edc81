//! Subcommand implementations.

use crate::script::{Replay, parse_steps};
use anyhow::{Context, Result, bail};
use geoscribe_core::projection::{lat_lng_to_pixel, lat_lng_to_tile, lat_lng_to_world};
use geoscribe_core::wkt::{geometry_to_wkt, import_geometry, parse_geometry};
use geoscribe_core::{
    Command, Editor, EditorConfig, Feedback, LatLng, MemoryStore, PolygonStore, Viewport,
};
use geoscribe_render::{RenderContext, Renderer, SvgRenderer};
use std::path::Path;

/// Parse WKT and print it back in the form the editor stores it.
pub fn normalize(text: &str) -> Result<String> {
    let Some(parsed) = parse_geometry(text) else {
        bail!("Invalid WKT: expected POLYGON or MULTIPOLYGON");
    };
    let imported = import_geometry(parsed);
    if imported.dropped_holes > 0 {
        log::warn!("Dropped {} hole ring(s)", imported.dropped_holes);
    }
    Ok(geometry_to_wkt(&imported.geometry, imported.inverted))
}

/// Describe where a coordinate lands in world, viewport and tile space, and which tiles the
/// configured view covers.
pub fn project(point: LatLng, config: &EditorConfig, tile_zoom: Option<u8>) -> String {
    let normalized = point.normalize();
    let zoom = config.initial_zoom;
    let world = lat_lng_to_world(normalized, zoom);
    let pixel = lat_lng_to_pixel(normalized, config.initial_center, zoom, config.viewport);
    let mut out = format!(
        "lat/lng: {}, {}\nworld (z{}): {:.3}, {:.3}\nviewport: {:.3}, {:.3}",
        normalized.lat, normalized.lng, zoom, world.x, world.y, pixel.x, pixel.y
    );
    if let Some(z) = tile_zoom {
        let tile = lat_lng_to_tile(normalized, z);
        out.push_str(&format!("\ntile: {}/{}/{}", tile.zoom, tile.x, tile.y));
        let view = Viewport::new(config.initial_center, zoom, config.viewport);
        let tiles = view.visible_tiles(z);
        if let (Some(first), Some(last)) = (tiles.first(), tiles.last()) {
            out.push_str(&format!(
                "\nvisible tiles: {} (x {}-{}, y {}-{})",
                tiles.len(),
                first.x,
                last.x,
                first.y,
                last.y
            ));
        }
    }
    out
}

fn rejected(feedback: Vec<Feedback>) -> Option<String> {
    feedback.into_iter().find_map(|f| match f {
        Feedback::Rejected(message) => Some(message),
        Feedback::Info(message) => {
            log::info!("{}", message);
            None
        }
    })
}

/// Render WKT geometries as an SVG overlay centred on the last one.
pub fn render(wkts: &[String], invert: bool, config: EditorConfig) -> Result<String> {
    if wkts.is_empty() {
        bail!("Nothing to render");
    }
    let config = EditorConfig {
        edit_after_create: false,
        ..config
    };
    let mut editor = Editor::new(MemoryStore::new(), config);
    for (i, text) in wkts.iter().enumerate() {
        editor.handle_command(Command::ImportWkt(text.clone()));
        if let Some(message) = rejected(editor.take_feedback()) {
            bail!("Geometry {}: {}", i + 1, message);
        }
        if invert {
            let latest = editor.store().latest().filter(|r| !r.inverted).map(|r| r.id);
            if let Some(id) = latest {
                editor.handle_command(Command::ToggleInvert(id));
            }
        }
    }
    if let Some(id) = editor.store().latest().map(|r| r.id) {
        editor.handle_command(Command::NavigateTo(id));
    }

    let mut renderer = SvgRenderer::new();
    renderer.build_scene(&RenderContext::new(&editor))?;
    Ok(renderer.finish()?)
}

/// Run a replay script and report the resulting records as JSON.
pub fn replay(script: &Path, config: EditorConfig, svg: Option<&Path>) -> Result<String> {
    let json = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    let steps = parse_steps(&json)
        .with_context(|| format!("Failed to parse script {}", script.display()))?;
    log::info!("Replaying {} steps from {}", steps.len(), script.display());

    let mut replay = Replay::new(config);
    replay.run(steps);

    if let Some(path) = svg {
        let mut renderer = SvgRenderer::new();
        renderer.build_scene(&RenderContext::new(&replay.editor))?;
        std::fs::write(path, renderer.finish()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(serde_json::to_string_pretty(&replay.report())?)
}
