//! Edit handles for the record being edited, and hit testing against them.
//!
//! Handles live in stable-frame pixels, the same space the persisted layer is drawn in before
//! the frame offset is applied.

use crate::frame::ReferenceFrame;
use crate::geometry::{Geometry, LatLng, VertexRef};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Rendered vertex handle radius in pixels.
pub const HANDLE_RADIUS: f64 = 6.0;

/// Type of edit handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// A vertex of the ring.
    Vertex(VertexRef),
    /// The edge starting at this vertex (virtual midpoint marker).
    Edge(VertexRef),
}

/// A handle with its position in stable-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Distance from `point` to segment `a`-`b`.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (pv - seg * t).hypot()
}

/// Vertex handles for every part.
pub fn vertex_handles(geometry: &Geometry, frame: &ReferenceFrame) -> Vec<Handle> {
    let mut handles = Vec::with_capacity(geometry.vertex_count());
    for (part, ring) in geometry.parts().iter().enumerate() {
        for (index, p) in ring.points().iter().enumerate() {
            handles.push(Handle::new(
                frame.stable_to_pixel(*p),
                HandleKind::Vertex(VertexRef::new(part, index)),
            ));
        }
    }
    handles
}

/// Midpoint markers for every edge, including the closing edge of each part.
pub fn edge_midpoints(geometry: &Geometry, frame: &ReferenceFrame) -> Vec<Handle> {
    let mut handles = Vec::with_capacity(geometry.vertex_count());
    for (part, ring) in geometry.parts().iter().enumerate() {
        for (index, a, b) in ring.edges() {
            let pa = frame.stable_to_pixel(a);
            let pb = frame.stable_to_pixel(b);
            handles.push(Handle::new(
                pa.midpoint(pb),
                HandleKind::Edge(VertexRef::new(part, index)),
            ));
        }
    }
    handles
}

/// Vertex under `pixel` (screen space), nearest first.
pub fn hit_test_vertex(
    geometry: &Geometry,
    frame: &ReferenceFrame,
    pixel: Point,
    tolerance: f64,
) -> Option<VertexRef> {
    let local = to_layer(frame, pixel);
    vertex_handles(geometry, frame)
        .into_iter()
        .filter(|h| h.hit_test(local, tolerance))
        .min_by(|a, b| {
            let da = (local - a.position).hypot2();
            let db = (local - b.position).hypot2();
            da.total_cmp(&db)
        })
        .and_then(|h| match h.kind {
            HandleKind::Vertex(v) => Some(v),
            HandleKind::Edge(_) => None,
        })
}

/// Edge whose hit band (`width` pixels wide, centred on the segment) contains `pixel`.
///
/// Returns the edge's start vertex; the new vertex goes right after it.
pub fn hit_test_edge(
    geometry: &Geometry,
    frame: &ReferenceFrame,
    pixel: Point,
    width: f64,
) -> Option<VertexRef> {
    let local = to_layer(frame, pixel);
    let half = width / 2.0;
    let mut best: Option<(f64, VertexRef)> = None;
    for (part, ring) in geometry.parts().iter().enumerate() {
        for (index, a, b) in ring.edges() {
            let dist = point_to_segment_dist(
                local,
                frame.stable_to_pixel(a),
                frame.stable_to_pixel(b),
            );
            if dist <= half && best.is_none_or(|(d, _)| dist < d) {
                best = Some((dist, VertexRef::new(part, index)));
            }
        }
    }
    best.map(|(_, v)| v)
}

/// Screen pixel into the persisted layer's untranslated space.
fn to_layer(frame: &ReferenceFrame, pixel: Point) -> Point {
    pixel - frame.offset()
}

/// State of a whole-record move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveState {
    /// Coordinate under the pointer when the move started.
    pub grab: LatLng,
    pub original: Geometry,
    /// Last valid translated geometry.
    pub preview: Geometry,
}

impl MoveState {
    pub fn new(grab: LatLng, original: Geometry) -> Self {
        Self {
            grab,
            preview: original.clone(),
            original,
        }
    }

    /// Degree delta from the grab point to `current`.
    pub fn delta(&self, current: LatLng) -> Vec2 {
        Vec2::new(current.lat - self.grab.lat, current.lng - self.grab.lng)
    }

    /// Translate the original by the pointer delta. Out-of-bounds moves keep the last preview.
    pub fn update(&mut self, current: LatLng) -> bool {
        let d = self.delta(current);
        match self.original.translated(d.x, d.y) {
            Ok(moved) => {
                self.preview = moved;
                true
            }
            Err(e) => {
                log::debug!("Move ignored: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ViewportEvent;
    use crate::geometry::Ring;
    use kurbo::Size;

    fn frame() -> ReferenceFrame {
        ReferenceFrame::new(LatLng::new(0.0, 0.0), 4.0, Size::new(800.0, 600.0))
    }

    fn square() -> Geometry {
        Geometry::Single(
            Ring::new(vec![
                LatLng::new(0.0, 0.0),
                LatLng::new(0.0, 10.0),
                LatLng::new(10.0, 10.0),
                LatLng::new(10.0, 0.0),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-12);
        assert!((point_to_segment_dist(Point::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-12);
        assert!((point_to_segment_dist(Point::new(1.0, 1.0), a, a) - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_handles_cover_closing_edge() {
        let f = frame();
        let g = square();
        assert_eq!(vertex_handles(&g, &f).len(), 4);
        let edges = edge_midpoints(&g, &f);
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[3].kind, HandleKind::Edge(VertexRef::new(0, 3)));
    }

    #[test]
    fn test_vertex_hit() {
        let f = frame();
        let g = square();
        let px = f.stable_to_pixel(LatLng::new(10.0, 10.0));
        let hit = hit_test_vertex(&g, &f, px + Vec2::new(3.0, -2.0), 8.0);
        assert_eq!(hit, Some(VertexRef::new(0, 2)));
        assert_eq!(hit_test_vertex(&g, &f, px + Vec2::new(20.0, 0.0), 8.0), None);
    }

    #[test]
    fn test_edge_hit_band() {
        let f = frame();
        let g = square();
        let a = f.stable_to_pixel(LatLng::new(0.0, 0.0));
        let b = f.stable_to_pixel(LatLng::new(0.0, 10.0));
        let mid = a.midpoint(b);
        assert_eq!(
            hit_test_edge(&g, &f, mid + Vec2::new(0.0, 5.0), 12.0),
            Some(VertexRef::new(0, 0))
        );
        assert_eq!(hit_test_edge(&g, &f, mid + Vec2::new(0.0, 7.0), 12.0), None);
    }

    #[test]
    fn test_hits_follow_frame_offset() {
        let mut f = frame();
        let g = square();
        let p = LatLng::new(10.0, 0.0);
        f.handle_viewport(ViewportEvent::Changed {
            center: LatLng::new(2.0, 3.0),
            zoom: 4.0,
        });
        let on_screen = f.live_to_pixel(p);
        assert_eq!(hit_test_vertex(&g, &f, on_screen, 4.0), Some(VertexRef::new(0, 3)));
    }

    #[test]
    fn test_move_state_rejects_out_of_bounds() {
        let mut state = MoveState::new(LatLng::new(5.0, 5.0), square());
        assert!(state.update(LatLng::new(6.0, 7.0)));
        assert_eq!(
            state.preview.vertex(VertexRef::default()),
            Some(LatLng::new(1.0, 2.0))
        );
        assert!(!state.update(LatLng::new(85.0, 7.0)));
        assert_eq!(
            state.preview.vertex(VertexRef::default()),
            Some(LatLng::new(1.0, 2.0))
        );
    }
}
