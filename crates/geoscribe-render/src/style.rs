//! Annotation colours and overlay styling.

use peniko::Color;

/// Fill and stroke for one annotation category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub fill: Color,
    pub stroke: Color,
}

impl AnnotationStyle {
    const fn rgb(fill: [u8; 3], stroke: [u8; 3]) -> Self {
        Self {
            fill: Color::from_rgba8(fill[0], fill[1], fill[2], 255),
            stroke: Color::from_rgba8(stroke[0], stroke[1], stroke[2], 255),
        }
    }
}

const SUSPICIOUS: AnnotationStyle = AnnotationStyle::rgb([239, 68, 68], [220, 38, 38]);
const NATIVE: AnnotationStyle = AnnotationStyle::rgb([16, 185, 129], [5, 150, 105]);
const INTRODUCED: AnnotationStyle = AnnotationStyle::rgb([217, 119, 6], [180, 83, 9]);
const MANAGED: AnnotationStyle = AnnotationStyle::rgb([59, 130, 246], [37, 99, 235]);
const FORMER: AnnotationStyle = AnnotationStyle::rgb([168, 85, 247], [147, 51, 234]);
const VAGRANT: AnnotationStyle = AnnotationStyle::rgb([249, 115, 22], [234, 88, 12]);
const OTHER: AnnotationStyle = AnnotationStyle::rgb([107, 114, 128], [75, 85, 99]);

/// Colours for an annotation label, case-insensitive. Unknown labels use the `OTHER` colours.
pub fn annotation_style(annotation: &str) -> AnnotationStyle {
    match annotation.to_ascii_uppercase().as_str() {
        "SUSPICIOUS" => SUSPICIOUS,
        "NATIVE" => NATIVE,
        "INTRODUCED" => INTRODUCED,
        "MANAGED" => MANAGED,
        "FORMER" => FORMER,
        "VAGRANT" => VAGRANT,
        _ => OTHER,
    }
}

/// Overlay-wide drawing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Painted behind everything when set; the overlay is transparent otherwise.
    pub background: Option<Color>,
    pub fill_opacity: f32,
    pub stroke_opacity: f32,
    pub stroke_width: f64,
    /// Stroke width of the record being edited.
    pub editing_stroke_width: f64,
    /// Extra margin around the viewport for inverted fills, so panning never reveals an edge.
    pub inverted_margin: f64,
    pub rule_color: Color,
    pub drawing_color: Color,
    pub handle_fill: Color,
    pub handle_stroke: Color,
    pub handle_radius: f64,
    pub midpoint_radius: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            background: None,
            fill_opacity: 0.1,
            stroke_opacity: 0.6,
            stroke_width: 2.0,
            editing_stroke_width: 3.0,
            inverted_margin: 10_000.0,
            rule_color: Color::from_rgba8(107, 114, 128, 255),
            drawing_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            handle_fill: Color::WHITE,
            handle_stroke: Color::from_rgba8(37, 99, 235, 255),
            handle_radius: geoscribe_core::selection::HANDLE_RADIUS,
            midpoint_radius: 4.0,
        }
    }
}

/// `#rrggbb` form of a colour, ignoring alpha.
pub fn hex(color: Color) -> String {
    let rgba = color.to_rgba8();
    format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b)
}
