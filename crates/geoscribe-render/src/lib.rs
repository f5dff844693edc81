//! Geoscribe Render Library
//!
//! Renderer abstraction for the polygon overlay, with an SVG implementation.

mod renderer;
pub mod style;
mod svg;

pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
pub use style::{AnnotationStyle, OverlayStyle, annotation_style};
pub use svg::SvgRenderer;
