//! Polygon data model: coordinates, rings, multipart geometry and records.

mod record;
mod ring;

pub use record::{PolygonRecord, RecordId, SpeciesRef};
pub use ring::{MultiPolygon, PolygonWithHoles, Ring};

use crate::projection::{MAX_LATITUDE, clamp_latitude, normalize_longitude};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Multiplier used by hosts that address a vertex across parts with a single integer
/// (`part * PART_STRIDE + index`). Rings never grow to this length.
pub const PART_STRIDE: usize = 10_000;

/// Minimum number of vertices in any ring.
pub const MIN_RING_POINTS: usize = 3;

/// Rejected geometry edits. The geometry is left unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("A polygon needs at least 3 points, got {count}")]
    TooFewPoints { count: usize },
    #[error("Cannot delete vertex: polygon must have at least 3 vertices")]
    MinimumVertexCount,
    #[error("Cannot add more vertices: polygon already has {limit}+ vertices")]
    VertexLimit { limit: usize },
    #[error("Vertex {index} does not exist (ring has {len} vertices)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Part {part} does not exist (geometry has {parts} parts)")]
    NoSuchPart { part: usize, parts: usize },
    #[error("Cannot move polygon outside the map boundaries")]
    OutOfBounds,
}

/// Geographic coordinate in degrees, stored latitude first.
///
/// Serialises as a `[lat, lng]` pair, the convention used by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Create a coordinate as given, without normalisation.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Create a coordinate with latitude clamped to the Mercator limit and longitude wrapped.
    pub fn normalized(lat: f64, lng: f64) -> Self {
        Self::new(lat, lng).normalize()
    }

    /// Clamp latitude to ±[`MAX_LATITUDE`] and wrap longitude into range.
    pub fn normalize(self) -> Self {
        let normalized = Self {
            lat: clamp_latitude(self.lat),
            lng: normalize_longitude(self.lng),
        };
        if normalized != self && self.lat.is_finite() && self.lng.is_finite() {
            log::debug!(
                "Clamped coordinates from {}, {} to {}, {} (limit ±{}° lat)",
                self.lat,
                self.lng,
                normalized.lat,
                normalized.lng,
                MAX_LATITUDE
            );
        }
        normalized
    }

    /// Whether both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Arithmetic midpoint in degree space (not a geodesic midpoint).
    pub fn midpoint(self, other: LatLng) -> LatLng {
        LatLng::new((self.lat + other.lat) / 2.0, (self.lng + other.lng) / 2.0)
    }

    /// Component-wise comparison within `tolerance` degrees.
    pub fn approx_eq(&self, other: &LatLng, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() <= tolerance && (self.lng - other.lng).abs() <= tolerance
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self::new(lat, lng)
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(p: LatLng) -> Self {
        [p.lat, p.lng]
    }
}

/// Identifies one vertex of a (possibly multipart) geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VertexRef {
    /// Index of the part (always 0 for single geometry).
    pub part: usize,
    /// Index of the vertex within the part's ring.
    pub index: usize,
}

impl VertexRef {
    pub const fn new(part: usize, index: usize) -> Self {
        Self { part, index }
    }

    /// Packs into the legacy `part * PART_STRIDE + index` integer.
    pub fn encode(self) -> usize {
        debug_assert!(self.index < PART_STRIDE);
        self.part * PART_STRIDE + self.index
    }

    /// Unpacks a legacy integer produced by [`VertexRef::encode`].
    pub fn decode(encoded: usize) -> Self {
        Self {
            part: encoded / PART_STRIDE,
            index: encoded % PART_STRIDE,
        }
    }
}

/// Geometry of an editable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "rings", rename_all = "snake_case")]
pub enum Geometry {
    Single(Ring),
    Multi(Vec<Ring>),
}

impl Geometry {
    /// All parts as a slice (a single ring is a one-element slice).
    pub fn parts(&self) -> &[Ring] {
        match self {
            Geometry::Single(ring) => std::slice::from_ref(ring),
            Geometry::Multi(rings) => rings,
        }
    }

    fn parts_mut(&mut self) -> &mut [Ring] {
        match self {
            Geometry::Single(ring) => std::slice::from_mut(ring),
            Geometry::Multi(rings) => rings,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Geometry::Multi(_))
    }

    pub fn part_count(&self) -> usize {
        self.parts().len()
    }

    /// Total number of vertices across parts.
    pub fn vertex_count(&self) -> usize {
        self.parts().iter().map(Ring::len).sum()
    }

    pub fn vertex(&self, at: VertexRef) -> Option<LatLng> {
        self.parts().get(at.part)?.get(at.index)
    }

    fn part_mut(&mut self, part: usize) -> Result<&mut Ring, EditError> {
        let parts = self.part_count();
        self.parts_mut()
            .get_mut(part)
            .ok_or(EditError::NoSuchPart { part, parts })
    }

    /// Insert `point` immediately after the vertex `after`.
    pub fn insert_vertex(&mut self, after: VertexRef, point: LatLng) -> Result<(), EditError> {
        self.part_mut(after.part)?.insert_vertex(after.index, point)
    }

    pub fn move_vertex(&mut self, at: VertexRef, point: LatLng) -> Result<(), EditError> {
        self.part_mut(at.part)?.move_vertex(at.index, point)
    }

    pub fn delete_vertex(&mut self, at: VertexRef) -> Result<LatLng, EditError> {
        self.part_mut(at.part)?.delete_vertex(at.index)
    }

    /// Append `ring` as an additional part, converting single geometry to multipart.
    pub fn merge(&mut self, ring: Ring) {
        match self {
            Geometry::Single(existing) => {
                let existing = existing.clone();
                *self = Geometry::Multi(vec![existing, ring]);
            }
            Geometry::Multi(rings) => rings.push(ring),
        }
    }

    /// Add edge midpoints to every part that is below `limit` vertices.
    ///
    /// Returns the number of parts changed, or the first rejection if no part could be changed.
    pub fn densify(&mut self, limit: usize) -> Result<usize, EditError> {
        self.apply_per_part(|ring| ring.densify(limit))
    }

    /// Drop every other vertex in each part that has enough vertices.
    pub fn decimate(&mut self) -> Result<usize, EditError> {
        self.apply_per_part(Ring::decimate)
    }

    fn apply_per_part(
        &mut self,
        mut op: impl FnMut(&mut Ring) -> Result<(), EditError>,
    ) -> Result<usize, EditError> {
        let mut changed = 0;
        let mut first_error = None;
        for ring in self.parts_mut() {
            match op(ring) {
                Ok(()) => changed += 1,
                Err(e) => {
                    log::warn!("Skipping part: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match (changed, first_error) {
            (0, Some(e)) => Err(e),
            (n, _) => Ok(n),
        }
    }

    /// Copy of this geometry shifted by a degree offset.
    ///
    /// Fails without producing anything if any vertex would leave the Mercator domain.
    pub fn translated(&self, d_lat: f64, d_lng: f64) -> Result<Geometry, EditError> {
        Ok(match self {
            Geometry::Single(ring) => Geometry::Single(ring.translated(d_lat, d_lng)?),
            Geometry::Multi(rings) => Geometry::Multi(
                rings
                    .iter()
                    .map(|r| r.translated(d_lat, d_lng))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Mean of all vertices, used as the navigation target for a record.
    pub fn centroid(&self) -> LatLng {
        let (sum_lat, sum_lng, n) = self
            .parts()
            .iter()
            .flat_map(|r| r.points().iter())
            .fold((0.0, 0.0, 0usize), |(la, ln, n), p| (la + p.lat, ln + p.lng, n + 1));
        let n = n.max(1) as f64;
        LatLng::new(sum_lat / n, sum_lng / n)
    }

    /// Whether `point` lies inside any part (even-odd rule).
    pub fn contains(&self, point: LatLng) -> bool {
        self.parts().iter().any(|r| r.contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(offset: f64) -> Ring {
        Ring::new(vec![
            LatLng::new(offset, offset),
            LatLng::new(offset, offset + 1.0),
            LatLng::new(offset + 1.0, offset + 1.0),
            LatLng::new(offset + 1.0, offset),
        ])
        .unwrap()
    }

    #[test]
    fn test_vertex_ref_codec() {
        for part in [0, 1, 7, 999] {
            for index in [0, 1, 42, PART_STRIDE - 1] {
                let v = VertexRef::new(part, index);
                assert_eq!(VertexRef::decode(v.encode()), v);
            }
        }
        assert_eq!(VertexRef::new(2, 5).encode(), 20_005);
    }

    #[test]
    fn test_latlng_serde_as_pair() {
        let json = serde_json::to_string(&LatLng::new(10.0, 20.0)).unwrap();
        assert_eq!(json, "[10.0,20.0]");
        let back: LatLng = serde_json::from_str("[1.5,-2.5]").unwrap();
        assert_eq!(back, LatLng::new(1.5, -2.5));
    }

    #[test]
    fn test_normalize() {
        let p = LatLng::normalized(90.0, 190.0);
        assert_eq!(p.lat, MAX_LATITUDE);
        assert!((p.lng - -170.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_single_into_multi() {
        let mut g = Geometry::Single(square(0.0));
        g.merge(square(10.0));
        assert!(g.is_multi());
        assert_eq!(g.part_count(), 2);
        g.merge(square(20.0));
        assert_eq!(g.part_count(), 3);
        assert_eq!(g.vertex(VertexRef::new(2, 0)), Some(LatLng::new(20.0, 20.0)));
    }

    #[test]
    fn test_multipart_edit_routes_to_part() {
        let mut g = Geometry::Multi(vec![square(0.0), square(10.0)]);
        g.insert_vertex(VertexRef::new(1, 0), LatLng::new(10.0, 10.5)).unwrap();
        assert_eq!(g.parts()[0].len(), 4);
        assert_eq!(g.parts()[1].len(), 5);
        assert_eq!(
            g.move_vertex(VertexRef::new(5, 0), LatLng::new(0.0, 0.0)),
            Err(EditError::NoSuchPart { part: 5, parts: 2 })
        );
    }

    #[test]
    fn test_densify_skips_parts_over_limit() {
        let mut big = square(0.0);
        big.densify(100).unwrap();
        big.densify(100).unwrap();
        let mut g = Geometry::Multi(vec![big, square(10.0)]);
        assert_eq!(g.densify(10), Ok(1));
        assert_eq!(g.parts()[0].len(), 16);
        assert_eq!(g.parts()[1].len(), 8);

        let mut single = Geometry::Single(g.parts()[0].clone());
        assert_eq!(single.densify(10), Err(EditError::VertexLimit { limit: 10 }));
    }

    #[test]
    fn test_translate_rejects_out_of_bounds() {
        let g = Geometry::Single(square(84.0));
        assert_eq!(g.translated(2.0, 0.0), Err(EditError::OutOfBounds));
        let moved = g.translated(-4.0, 3.0).unwrap();
        assert_eq!(moved.vertex(VertexRef::default()), Some(LatLng::new(80.0, 87.0)));
    }

    #[test]
    fn test_centroid_and_contains() {
        let g = Geometry::Single(square(0.0));
        let c = g.centroid();
        assert!(c.approx_eq(&LatLng::new(0.5, 0.5), 1e-12));
        assert!(g.contains(c));
        assert!(!g.contains(LatLng::new(5.0, 5.0)));
    }
}
