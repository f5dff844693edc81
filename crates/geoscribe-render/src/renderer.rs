//! Renderer trait abstraction.

use crate::style::OverlayStyle;
use geoscribe_core::{Editor, PolygonStore};
use kurbo::Size;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Formatting failed")]
    Format(#[from] std::fmt::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a, S: PolygonStore> {
    /// The editing session to draw.
    pub editor: &'a Editor<S>,
    /// Overlay size in pixels.
    pub viewport_size: Size,
    pub style: OverlayStyle,
}

impl<'a, S: PolygonStore> RenderContext<'a, S> {
    /// Create a render context sized to the editor's viewport.
    pub fn new(editor: &'a Editor<S>) -> Self {
        Self {
            editor,
            viewport_size: editor.frame().live().size,
            style: OverlayStyle::default(),
        }
    }

    /// Set the overlay style.
    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }
}

/// Trait for overlay backends.
pub trait Renderer: Send + Sync {
    /// Output of a finished frame.
    type Output;

    /// Draw one frame of the overlay.
    ///
    /// Persisted records and rules go into a layer projected with the stable frame and shifted by
    /// the frame offset; the drawing preview is projected with the live frame.
    fn build_scene<S: PolygonStore>(&mut self, ctx: &RenderContext<'_, S>) -> RenderResult<()>;

    /// Take the output of the last `build_scene`.
    fn finish(&mut self) -> RenderResult<Self::Output>;
}
