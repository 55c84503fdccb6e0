use std::fmt::Write as _;

use playfield_ecs::Shape;

use crate::frame::{DrawKind, Drawable, RenderFrame};

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer only reads the frame; entity state is owned by the store.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    fn render(&self, frame: &RenderFrame) -> Self::Output;
}

/// Headless renderer producing one text line per drawable.
///
/// Stands in for a pixel backend in the CLI and in tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }

    fn line(out: &mut String, layer: &str, d: &Drawable) {
        let shape = match d.shape {
            Shape::Rectangle => "rect",
            Shape::Ellipse => "ellipse",
        };
        let detail = match &d.kind {
            DrawKind::Shape => String::new(),
            DrawKind::Text(text) => format!(" text=\"{text}\""),
            DrawKind::Gauge { ratio, .. } => format!(" gauge={:.0}%", ratio * 100.0),
            DrawKind::Grid { tile_width, tile_height, .. } => {
                format!(" grid={tile_width}x{tile_height}")
            }
        };
        let _ = writeln!(
            out,
            "  [{layer} {:>4}] {} {shape} {}{detail}",
            d.priority, d.name, d.bounds
        );
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, frame: &RenderFrame) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Frame {} (debug={}) ===",
            frame.index, frame.debug_level
        );
        let _ = writeln!(
            out,
            "Camera: ({:.2}, {:.2})",
            frame.camera_offset.x, frame.camera_offset.y
        );
        if let Some(area) = frame.play_area {
            let _ = writeln!(out, "Play area: {area}");
        }
        let _ = writeln!(out, "Drawn: {}", frame.len());
        for d in &frame.world {
            Self::line(&mut out, "world", d);
        }
        for d in &frame.overlay {
            Self::line(&mut out, "hud", d);
        }
        out
    }
}
