//! The polygon store the editor reports mutations to.
//!
//! Hosts implement [`PolygonStore`] to forward create/update/delete calls to their own
//! persistence. [`MemoryStore`] keeps records in memory and logs every call it receives.

use crate::geometry::{Geometry, PolygonRecord, RecordId, Ring, SpeciesRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Polygon not found: {0}")]
    NotFound(RecordId),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Mutation callbacks consumed by the host's polygon store.
pub trait PolygonStore {
    /// Store a new record and return its id.
    fn create(
        &mut self,
        geometry: Geometry,
        inverted: bool,
        annotation: &str,
    ) -> StoreResult<RecordId>;

    /// Replace a record's geometry.
    fn update(&mut self, id: RecordId, geometry: Geometry) -> StoreResult<()>;

    fn delete(&mut self, id: RecordId) -> StoreResult<()>;

    /// Flip a record's inverted flag, returning the new value.
    fn toggle_invert(&mut self, id: RecordId) -> StoreResult<bool>;

    /// Append `ring` to a record as an extra part.
    fn merge_into(&mut self, id: RecordId, ring: Ring) -> StoreResult<()>;

    fn set_annotation(&mut self, id: RecordId, annotation: &str) -> StoreResult<()>;

    fn get(&self, id: RecordId) -> Option<&PolygonRecord>;

    /// All records in creation order.
    fn records(&self) -> Vec<&PolygonRecord>;

    /// The most recently created record.
    fn latest(&self) -> Option<&PolygonRecord> {
        self.records().into_iter().max_by_key(|r| r.created_at)
    }
}

/// A call received by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "id", rename_all = "snake_case")]
pub enum StoreEvent {
    Created(RecordId),
    Updated(RecordId),
    Deleted(RecordId),
    InvertToggled(RecordId),
    Merged(RecordId),
    Annotated(RecordId),
}

/// In-memory store for tests, the CLI and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<PolygonRecord>,
    species_ref: Option<SpeciesRef>,
    events: Vec<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Species reference attached to records created from now on.
    pub fn set_species(&mut self, species_ref: Option<SpeciesRef>) {
        self.species_ref = species_ref;
    }

    /// Insert an existing record as-is (e.g. loaded by the host).
    pub fn insert(&mut self, record: PolygonRecord) {
        self.records.push(record);
    }

    /// Drain the calls received since the last drain.
    pub fn take_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record_mut(&mut self, id: RecordId) -> StoreResult<&mut PolygonRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

impl PolygonStore for MemoryStore {
    fn create(
        &mut self,
        geometry: Geometry,
        inverted: bool,
        annotation: &str,
    ) -> StoreResult<RecordId> {
        let record = PolygonRecord::new(geometry, inverted, annotation)
            .with_species(self.species_ref.clone());
        let id = record.id;
        log::info!(
            "Created polygon {} ({} parts, {})",
            id,
            record.geometry.part_count(),
            annotation
        );
        self.records.push(record);
        self.events.push(StoreEvent::Created(id));
        Ok(id)
    }

    fn update(&mut self, id: RecordId, geometry: Geometry) -> StoreResult<()> {
        self.record_mut(id)?.geometry = geometry;
        self.events.push(StoreEvent::Updated(id));
        Ok(())
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        self.records.remove(index);
        log::info!("Deleted polygon {}", id);
        self.events.push(StoreEvent::Deleted(id));
        Ok(())
    }

    fn toggle_invert(&mut self, id: RecordId) -> StoreResult<bool> {
        let inverted = self.record_mut(id)?.toggle_inverted();
        self.events.push(StoreEvent::InvertToggled(id));
        Ok(inverted)
    }

    fn merge_into(&mut self, id: RecordId, ring: Ring) -> StoreResult<()> {
        self.record_mut(id)?.merge_as_multipart(ring);
        self.events.push(StoreEvent::Merged(id));
        Ok(())
    }

    fn set_annotation(&mut self, id: RecordId, annotation: &str) -> StoreResult<()> {
        self.record_mut(id)?.annotation = annotation.to_string();
        self.events.push(StoreEvent::Annotated(id));
        Ok(())
    }

    fn get(&self, id: RecordId) -> Option<&PolygonRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    fn records(&self) -> Vec<&PolygonRecord> {
        self.records.iter().collect()
    }
}
