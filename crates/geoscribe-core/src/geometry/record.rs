//! Editable polygon records.

use super::{Geometry, Ring};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a polygon record.
pub type RecordId = Uuid;

/// Opaque species/taxon reference attached by the host. Never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesRef(pub serde_json::Value);

/// A polygon drawn or imported by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub id: RecordId,
    pub geometry: Geometry,
    /// Selects everything outside the geometry.
    #[serde(default)]
    pub inverted: bool,
    pub annotation: String,
    #[serde(default)]
    pub species_ref: Option<SpeciesRef>,
    pub created_at: DateTime<Utc>,
}

impl PolygonRecord {
    /// Create a record with a fresh id and the current time.
    pub fn new(geometry: Geometry, inverted: bool, annotation: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            geometry,
            inverted,
            annotation: annotation.into(),
            species_ref: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_species(mut self, species_ref: Option<SpeciesRef>) -> Self {
        self.species_ref = species_ref;
        self
    }

    /// Append `ring` as another part, switching to multipart geometry.
    pub fn merge_as_multipart(&mut self, ring: Ring) {
        self.geometry.merge(ring);
    }

    /// Flip the inverted flag. Returns the new value.
    pub fn toggle_inverted(&mut self) -> bool {
        self.inverted = !self.inverted;
        self.inverted
    }

    pub fn to_wkt(&self) -> String {
        crate::wkt::geometry_to_wkt(&self.geometry, self.inverted)
    }
}
