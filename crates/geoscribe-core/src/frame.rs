//! Live and stable reference frames.
//!
//! The live frame follows every viewport change from the host map. The stable frame is a
//! snapshot taken only at gesture boundaries; persisted geometry is projected with it and the
//! whole layer is shifted by [`ReferenceFrame::offset`] while a gesture is in progress.

use crate::geometry::LatLng;
use crate::projection::{Viewport, lat_lng_to_world};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Viewport change reported by the host map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ViewportEvent {
    /// Emitted on every frame of a pan or zoom.
    Changed { center: LatLng, zoom: f64 },
    /// The map's own transform has settled (drag released).
    TransformCleared,
    /// The surface was resized.
    Resized { size: Size },
}

/// Pair of live and stable viewports over the same surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFrame {
    live: Viewport,
    stable: Viewport,
    transforming: bool,
}

impl ReferenceFrame {
    /// Both frames start equal.
    pub fn new(center: LatLng, zoom: f64, size: Size) -> Self {
        let viewport = Viewport::new(center.normalize(), zoom, size);
        Self {
            live: viewport,
            stable: viewport,
            transforming: false,
        }
    }

    pub fn live(&self) -> &Viewport {
        &self.live
    }

    pub fn stable(&self) -> &Viewport {
        &self.stable
    }

    /// Whether a pan gesture is in progress (live and stable may differ).
    pub fn is_gesture_active(&self) -> bool {
        self.transforming
    }

    /// Apply a viewport event. Returns `true` if the stable frame was committed.
    pub fn handle_viewport(&mut self, event: ViewportEvent) -> bool {
        match event {
            ViewportEvent::Changed { center, zoom } => {
                self.live.center = center.normalize();
                self.live.zoom = zoom;
                if zoom != self.stable.zoom {
                    self.commit();
                    true
                } else {
                    self.transforming = self.live.center != self.stable.center;
                    false
                }
            }
            ViewportEvent::TransformCleared => {
                let differs = self.live.center != self.stable.center;
                self.transforming = false;
                if differs {
                    self.commit();
                }
                differs
            }
            ViewportEvent::Resized { size } => {
                self.resize(size);
                true
            }
        }
    }

    fn commit(&mut self) {
        log::debug!(
            "Stable frame committed at {:.5}, {:.5} z{:.2}",
            self.live.center.lat,
            self.live.center.lng,
            self.live.zoom
        );
        self.stable = self.live;
        self.transforming = false;
    }

    /// Commit the live frame immediately, e.g. before creating geometry from pointer input.
    pub fn sync(&mut self) {
        if self.stable != self.live {
            self.commit();
        }
        self.transforming = false;
    }

    /// Committed, non-gesture move of the viewport.
    pub fn navigate_to(&mut self, center: LatLng, zoom: f64) {
        log::info!("Navigating to {:.5}, {:.5} z{}", center.lat, center.lng, zoom);
        self.live.center = center.normalize();
        self.live.zoom = zoom;
        self.commit();
    }

    pub fn resize(&mut self, size: Size) {
        self.live.size = size;
        self.stable.size = size;
    }

    /// Whether a screen position lies on the map in the current view.
    pub fn is_on_map(&self, pixel: Point) -> bool {
        self.live.is_on_map(pixel)
    }

    /// Pixel translation applied to the persisted layer.
    ///
    /// Zero whenever the frames agree.
    pub fn offset(&self) -> Vec2 {
        if self.stable == self.live {
            return Vec2::ZERO;
        }
        let zoom = self.live.zoom;
        lat_lng_to_world(self.stable.center, zoom) - lat_lng_to_world(self.live.center, zoom)
    }

    /// Project persisted geometry; the result is inside the translated layer.
    pub fn stable_to_pixel(&self, p: LatLng) -> Point {
        self.stable.project(p)
    }

    /// Screen position to a coordinate for editing persisted geometry.
    pub fn pixel_to_stable(&self, pixel: Point) -> LatLng {
        self.stable.unproject(pixel - self.offset())
    }

    /// Project transient drawing feedback.
    pub fn live_to_pixel(&self, p: LatLng) -> Point {
        self.live.project(p)
    }

    /// Screen position to a coordinate in the current view.
    pub fn pixel_to_live(&self, pixel: Point) -> LatLng {
        self.live.unproject(pixel)
    }
}
