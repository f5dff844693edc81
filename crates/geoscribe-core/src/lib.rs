//! Geoscribe Core Library
//!
//! Geographic polygon editing engine: Web Mercator projection, a stable reference frame for
//! rendering during map gestures, the polygon model with its edit primitives, a WKT codec and
//! the interaction state machine that ties them together.

pub mod config;
pub mod frame;
pub mod geometry;
pub mod input;
pub mod interaction;
pub mod projection;
pub mod selection;
pub mod store;
pub mod wkt;

pub use config::{ConfigError, EditorConfig};
pub use frame::{ReferenceFrame, ViewportEvent};
pub use geometry::{
    EditError, Geometry, LatLng, MultiPolygon, PART_STRIDE, PolygonRecord, PolygonWithHoles,
    RecordId, Ring, SpeciesRef, VertexRef,
};
pub use input::{InputState, MouseButton, PointerEvent};
pub use interaction::{Command, DrawMode, DrawingPreview, Editor, Feedback, InteractionState};
pub use projection::{MAX_LATITUDE, TILE_SIZE, TileIndex, Viewport};
pub use selection::{Handle, HandleKind};
pub use store::{MemoryStore, PolygonStore, StoreError, StoreEvent, StoreResult};
