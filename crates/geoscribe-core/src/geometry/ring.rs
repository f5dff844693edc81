//! Rings and the polygon structures built from them.

use super::{EditError, LatLng, MIN_RING_POINTS, PART_STRIDE};
use crate::projection::{MAX_LATITUDE, within_bounds};
use serde::{Deserialize, Serialize};

/// Longitude buffer kept from the antimeridian by latitude bands.
const BAND_LONGITUDE_BUFFER: f64 = 0.4;
/// Latitude limit for latitude bands.
const BAND_MAX_LATITUDE: f64 = 85.0;
/// Rings at or below this many vertices are not decimated.
const DECIMATE_MIN_POINTS: usize = 6;

/// An implicitly closed sequence of at least three points.
///
/// The last point connects back to the first. A ring may still carry an explicit closing
/// point (as parsed from WKT); [`Ring::open`] drops it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LatLng>", into = "Vec<LatLng>")]
pub struct Ring {
    points: Vec<LatLng>,
}

impl TryFrom<Vec<LatLng>> for Ring {
    type Error = EditError;

    fn try_from(points: Vec<LatLng>) -> Result<Self, Self::Error> {
        Ring::new(points)
    }
}

impl From<Ring> for Vec<LatLng> {
    fn from(ring: Ring) -> Self {
        ring.points
    }
}

impl Ring {
    /// Create a ring, rejecting fewer than three points.
    pub fn new(points: Vec<LatLng>) -> Result<Self, EditError> {
        if points.len() < MIN_RING_POINTS {
            return Err(EditError::TooFewPoints {
                count: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// Expand two opposite corners into a four-point ring.
    ///
    /// Corner order is `[p1.lat,p1.lng], [p1.lat,p2.lng], [p2.lat,p2.lng], [p2.lat,p1.lng]`.
    pub fn rectangle(p1: LatLng, p2: LatLng) -> Self {
        Self {
            points: vec![
                LatLng::new(p1.lat, p1.lng),
                LatLng::new(p1.lat, p2.lng),
                LatLng::new(p2.lat, p2.lng),
                LatLng::new(p2.lat, p1.lng),
            ],
        }
    }

    /// A band spanning (almost) every longitude between two latitudes.
    pub fn latitude_band(south: f64, north: f64) -> Self {
        let north = north.min(BAND_MAX_LATITUDE);
        let south = south.max(-BAND_MAX_LATITUDE);
        let west = -180.0 + BAND_LONGITUDE_BUFFER;
        let east = 180.0 - BAND_LONGITUDE_BUFFER;
        Self {
            points: vec![
                LatLng::new(south, west),
                LatLng::new(north, west),
                LatLng::new(north, east),
                LatLng::new(south, east),
            ],
        }
    }

    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<LatLng> {
        self.points.get(index).copied()
    }

    /// Whether the last point repeats the first.
    pub fn is_closed(&self) -> bool {
        self.points.first() == self.points.last()
    }

    /// Points with the first point repeated at the end if not already closed.
    pub fn closed_points(&self) -> Vec<LatLng> {
        let mut points = self.points.clone();
        if !self.is_closed() {
            points.push(self.points[0]);
        }
        points
    }

    /// The ring without an explicit closing point, as long as three points remain.
    pub fn open(mut self) -> Self {
        if self.points.len() > MIN_RING_POINTS && self.is_closed() {
            self.points.pop();
        }
        self
    }

    /// Edges as `(start_index, start, end)`, including the implicit closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (usize, LatLng, LatLng)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (i, self.points[i], self.points[(i + 1) % n]))
    }

    fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index < self.points.len() {
            Ok(())
        } else {
            Err(EditError::IndexOutOfRange {
                index,
                len: self.points.len(),
            })
        }
    }

    /// Splice `point` in after `after`.
    pub fn insert_vertex(&mut self, after: usize, point: LatLng) -> Result<(), EditError> {
        self.check_index(after)?;
        if self.points.len() + 1 >= PART_STRIDE {
            return Err(EditError::VertexLimit { limit: PART_STRIDE });
        }
        self.points.insert(after + 1, point.normalize());
        Ok(())
    }

    pub fn move_vertex(&mut self, index: usize, point: LatLng) -> Result<(), EditError> {
        self.check_index(index)?;
        self.points[index] = point.normalize();
        Ok(())
    }

    /// Remove a vertex. Rejected if the ring would drop below three points.
    pub fn delete_vertex(&mut self, index: usize) -> Result<LatLng, EditError> {
        self.check_index(index)?;
        if self.points.len() <= MIN_RING_POINTS {
            return Err(EditError::MinimumVertexCount);
        }
        Ok(self.points.remove(index))
    }

    /// Insert the midpoint of every edge. Rejected once the ring has `limit` vertices.
    pub fn densify(&mut self, limit: usize) -> Result<(), EditError> {
        if self.points.len() >= limit {
            return Err(EditError::VertexLimit { limit });
        }
        let densified = self
            .edges()
            .flat_map(|(_, a, b)| [a, a.midpoint(b)])
            .collect();
        self.points = densified;
        Ok(())
    }

    /// Keep every other vertex, starting with the first.
    pub fn decimate(&mut self) -> Result<(), EditError> {
        if self.points.len() <= DECIMATE_MIN_POINTS {
            return Err(EditError::MinimumVertexCount);
        }
        self.points = self.points.iter().step_by(2).copied().collect();
        Ok(())
    }

    /// Copy shifted by a degree offset; fails if any vertex would leave the Mercator domain.
    pub fn translated(&self, d_lat: f64, d_lng: f64) -> Result<Ring, EditError> {
        let points: Vec<LatLng> = self
            .points
            .iter()
            .map(|p| LatLng::new(p.lat + d_lat, p.lng + d_lng))
            .collect();
        if points.iter().all(|p| within_bounds(*p)) {
            Ok(Ring { points })
        } else {
            Err(EditError::OutOfBounds)
        }
    }

    /// Even-odd point-in-polygon test in degree space.
    pub fn contains(&self, point: LatLng) -> bool {
        let mut inside = false;
        for (_, a, b) in self.edges() {
            if (a.lat > point.lat) != (b.lat > point.lat) {
                let cross = (b.lng - a.lng) * (point.lat - a.lat) / (b.lat - a.lat) + a.lng;
                if point.lng < cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Whether this ring is the world boundary used to encode inverted selections.
    pub fn is_world_boundary(&self) -> bool {
        const EPS: f64 = 1e-6;
        let on_limit = self
            .points
            .iter()
            .all(|p| (p.lat.abs() - MAX_LATITUDE).abs() < EPS || p.lng.abs() > 180.0 - EPS);
        let (west, east) = self
            .points
            .iter()
            .fold((f64::MAX, f64::MIN), |(w, e), p| (w.min(p.lng), e.max(p.lng)));
        let (south, north) = self
            .points
            .iter()
            .fold((f64::MAX, f64::MIN), |(s, n), p| (s.min(p.lat), n.max(p.lat)));
        on_limit
            && west <= -180.0 + EPS
            && east >= 180.0 - EPS
            && south <= -MAX_LATITUDE + EPS
            && north >= MAX_LATITUDE - EPS
    }
}

/// An outer ring with zero or more holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonWithHoles {
    pub outer: Ring,
    #[serde(default)]
    pub holes: Vec<Ring>,
}

impl PolygonWithHoles {
    pub fn new(outer: Ring, holes: Vec<Ring>) -> Self {
        Self { outer, holes }
    }
}

/// A non-empty list of polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygon {
    polygons: Vec<PolygonWithHoles>,
}

impl MultiPolygon {
    /// Returns `None` for an empty list.
    pub fn new(polygons: Vec<PolygonWithHoles>) -> Option<Self> {
        if polygons.is_empty() {
            None
        } else {
            Some(Self { polygons })
        }
    }

    pub fn polygons(&self) -> &[PolygonWithHoles] {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Total number of hole rings across all polygons.
    pub fn hole_count(&self) -> usize {
        self.polygons.iter().map(|p| p.holes.len()).sum()
    }

    pub fn into_polygons(self) -> Vec<PolygonWithHoles> {
        self.polygons
    }
}
