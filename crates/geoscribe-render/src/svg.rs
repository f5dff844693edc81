//! SVG overlay backend.

use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};
use crate::style::{OverlayStyle, annotation_style, hex};
use geoscribe_core::selection::{edge_midpoints, vertex_handles};
use geoscribe_core::{
    DrawMode, DrawingPreview, Geometry, LatLng, MultiPolygon, PolygonStore, ReferenceFrame,
};
use kurbo::{BezPath, Point, Rect, Shape, Size, Vec2};
use std::fmt::Write;

/// Renders the overlay as a standalone SVG document.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    document: String,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_ring(path: &mut BezPath, points: impl IntoIterator<Item = Point>) {
    let mut points = points.into_iter();
    let Some(first) = points.next() else {
        return;
    };
    path.move_to(first);
    for p in points {
        path.line_to(p);
    }
    path.close_path();
}

fn geometry_path(geometry: &Geometry, project: impl Fn(LatLng) -> Point) -> BezPath {
    let mut path = BezPath::new();
    for ring in geometry.parts() {
        push_ring(&mut path, ring.points().iter().map(|p| project(*p)));
    }
    path
}

/// Viewport rectangle in layer coordinates, grown by `margin` on every side.
fn inverted_extent(size: Size, offset: Vec2, margin: f64) -> Rect {
    Rect::from_origin_size(Point::ORIGIN, size).inflate(margin, margin) - offset
}

impl SvgRenderer {
    fn write_records<S: PolygonStore>(&mut self, ctx: &RenderContext<'_, S>) -> RenderResult<()> {
        let editor = ctx.editor;
        let frame = editor.frame();
        let style = &ctx.style;
        let editing = editor.editing_target();

        for record in editor.store().records() {
            let Some(geometry) = editor.display_geometry(record.id) else {
                continue;
            };
            let mut path = geometry_path(&geometry, |p| frame.stable_to_pixel(p));
            if record.inverted {
                let extent =
                    inverted_extent(ctx.viewport_size, frame.offset(), style.inverted_margin);
                let mut outer = extent.to_path(0.1);
                outer.extend(path);
                path = outer;
            }
            let colors = annotation_style(&record.annotation);
            let width = if editing == Some(record.id) {
                style.editing_stroke_width
            } else {
                style.stroke_width
            };
            writeln!(
                self.document,
                r#"<path data-id="{}" data-annotation="{}" d="{}" fill="{}" fill-opacity="{}" fill-rule="evenodd" stroke="{}" stroke-opacity="{}" stroke-width="{}"/>"#,
                record.id,
                escape(&record.annotation),
                path.to_svg(),
                hex(colors.fill),
                style.fill_opacity,
                hex(colors.stroke),
                style.stroke_opacity,
                width
            )?;
        }
        Ok(())
    }

    fn write_rules<S: PolygonStore>(&mut self, ctx: &RenderContext<'_, S>) -> RenderResult<()> {
        let frame = ctx.editor.frame();
        for rule in ctx.editor.rules() {
            let path = rule_path(rule, |p| frame.stable_to_pixel(p));
            writeln!(
                self.document,
                r#"<path class="rule" d="{}" fill="{}" fill-opacity="{}" fill-rule="evenodd" stroke="{}" stroke-dasharray="6 4" stroke-width="1"/>"#,
                path.to_svg(),
                hex(ctx.style.rule_color),
                ctx.style.fill_opacity,
                hex(ctx.style.rule_color)
            )?;
        }
        Ok(())
    }

    fn write_handles<S: PolygonStore>(&mut self, ctx: &RenderContext<'_, S>) -> RenderResult<()> {
        let editor = ctx.editor;
        let Some(geometry) = editor
            .editing_target()
            .and_then(|id| editor.display_geometry(id))
        else {
            return Ok(());
        };
        let style = &ctx.style;
        for handle in edge_midpoints(&geometry, editor.frame()) {
            self.circle(handle.position, style.midpoint_radius, "midpoint", style)?;
        }
        for handle in vertex_handles(&geometry, editor.frame()) {
            self.circle(handle.position, style.handle_radius, "vertex", style)?;
        }
        Ok(())
    }

    fn write_preview(
        &mut self,
        preview: &DrawingPreview,
        frame: &ReferenceFrame,
        style: &OverlayStyle,
    ) -> RenderResult<()> {
        let outline: Vec<Point> = preview
            .outline()
            .into_iter()
            .map(|p| frame.live_to_pixel(p))
            .collect();
        let closed = match preview.mode {
            DrawMode::Rectangle => outline.len() == 4,
            DrawMode::Polygon => outline.len() >= 3,
        };
        if outline.len() >= 2 {
            let mut path = BezPath::new();
            if closed {
                push_ring(&mut path, outline.iter().copied());
            } else {
                path.move_to(outline[0]);
                for p in &outline[1..] {
                    path.line_to(*p);
                }
            }
            let fill = if closed {
                hex(style.drawing_color)
            } else {
                "none".to_string()
            };
            writeln!(
                self.document,
                r#"<path class="drawing" d="{}" fill="{}" fill-opacity="{}" stroke="{}" stroke-dasharray="5 5" stroke-width="{}"/>"#,
                path.to_svg(),
                fill,
                style.fill_opacity,
                hex(style.drawing_color),
                style.stroke_width
            )?;
        }
        for p in &preview.points {
            self.circle(frame.live_to_pixel(*p), style.midpoint_radius, "placed", style)?;
        }
        Ok(())
    }

    fn circle(
        &mut self,
        center: Point,
        radius: f64,
        class: &str,
        style: &OverlayStyle,
    ) -> RenderResult<()> {
        writeln!(
            self.document,
            r#"<circle class="{}" cx="{}" cy="{}" r="{}" fill="{}" stroke="{}" stroke-width="1.5"/>"#,
            class,
            center.x,
            center.y,
            radius,
            hex(style.handle_fill),
            hex(style.handle_stroke)
        )?;
        Ok(())
    }
}

fn rule_path(rule: &MultiPolygon, project: impl Fn(LatLng) -> Point) -> BezPath {
    let mut path = BezPath::new();
    for polygon in rule.polygons() {
        for ring in std::iter::once(&polygon.outer).chain(&polygon.holes) {
            push_ring(&mut path, ring.points().iter().map(|p| project(*p)));
        }
    }
    path
}

impl Renderer for SvgRenderer {
    type Output = String;

    fn build_scene<S: PolygonStore>(&mut self, ctx: &RenderContext<'_, S>) -> RenderResult<()> {
        let size = ctx.viewport_size;
        let frame = ctx.editor.frame();
        let offset = frame.offset();
        self.document.clear();

        writeln!(
            self.document,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = size.width,
            h = size.height
        )?;
        if let Some(background) = ctx.style.background {
            writeln!(
                self.document,
                r#"<rect width="100%" height="100%" fill="{}"/>"#,
                hex(background)
            )?;
        }

        writeln!(
            self.document,
            r#"<g class="persisted" transform="translate({},{})">"#,
            offset.x, offset.y
        )?;
        self.write_rules(ctx)?;
        self.write_records(ctx)?;
        self.write_handles(ctx)?;
        writeln!(self.document, "</g>")?;

        if let Some(preview) = ctx.editor.drawing_preview() {
            writeln!(self.document, r#"<g class="transient">"#)?;
            self.write_preview(&preview, frame, &ctx.style)?;
            writeln!(self.document, "</g>")?;
        }
        writeln!(self.document, "</svg>")?;

        log::debug!(
            "Built overlay with {} records, {} rules",
            ctx.editor.store().records().len(),
            ctx.editor.rules().len()
        );
        Ok(())
    }

    fn finish(&mut self) -> RenderResult<String> {
        if self.document.is_empty() {
            return Err(RendererError::RenderFailed("no frame has been built".into()));
        }
        Ok(std::mem::take(&mut self.document))
    }
}
