//! Interaction state machine driving drawing and editing.
//!
//! Every pointer, viewport and command event is handled to completion before the call
//! returns. Mutations are reported to the [`PolygonStore`]; validation problems are queued as
//! [`Feedback`] for the host to show.

use crate::config::EditorConfig;
use crate::frame::{ReferenceFrame, ViewportEvent};
use crate::geometry::{EditError, Geometry, LatLng, MultiPolygon, RecordId, Ring, VertexRef};
use crate::input::{InputState, MouseButton, PointerEvent};
use crate::selection::{MoveState, hit_test_edge, hit_test_vertex};
use crate::store::{PolygonStore, StoreError};
use crate::wkt::{import_geometry, parse_geometry};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Display;

/// Parts below this many vertices are densified when editing starts, if enabled.
const DENSIFY_ON_EDIT_BELOW: usize = 10;
/// Minimum height of a latitude band in degrees.
const MIN_BAND_HEIGHT: f64 = 0.5;

/// Shape being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DrawMode {
    #[default]
    Polygon,
    Rectangle,
}

/// Current interaction state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Collecting points for a new shape (live frame coordinates).
    Drawing { mode: DrawMode, points: Vec<LatLng> },
    EditingExisting { target: RecordId },
    /// A vertex handle is held; `position` is the uncommitted new coordinate.
    DraggingVertex {
        target: RecordId,
        vertex: VertexRef,
        position: Option<LatLng>,
    },
    /// A rectangle corner press is in progress.
    DraggingRectangleCorner {
        start: LatLng,
        start_pixel: Point,
        current: LatLng,
        /// Corner placed by an earlier click, in two-click mode.
        first_corner: Option<LatLng>,
    },
    /// A whole record is being dragged with the move tool.
    MovingRecord {
        target: RecordId,
        drag: MoveState,
        resume_editing: bool,
    },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "Idle",
            InteractionState::Drawing { .. } => "Drawing",
            InteractionState::EditingExisting { .. } => "EditingExisting",
            InteractionState::DraggingVertex { .. } => "DraggingVertex",
            InteractionState::DraggingRectangleCorner { .. } => "DraggingRectangleCorner",
            InteractionState::MovingRecord { .. } => "MovingRecord",
        }
    }
}

/// Discrete commands from the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    StartDrawing(DrawMode),
    /// Finish the shape being drawn.
    Finish,
    Cancel,
    Edit(RecordId),
    StopEditing,
    /// Delete a vertex of the record being edited.
    DeleteVertex(VertexRef),
    /// Add edge midpoints to the record being edited.
    Densify,
    /// Drop every other vertex of the record being edited.
    Decimate,
    ToggleInvert(RecordId),
    SetDefaultAnnotation(String),
    SetAnnotation { id: RecordId, annotation: String },
    /// Create a record from WKT text.
    ImportWkt(String),
    /// Show WKT as a read-only rule overlay.
    AddRule(String),
    ClearRules,
    DeleteRecord(RecordId),
    CreateLatitudeBand { south: f64, north: f64 },
    SetMoveTool(bool),
    NavigateTo(RecordId),
}

/// User-facing message produced while handling an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Info(String),
    Rejected(String),
}

/// In-progress drawing in live frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingPreview {
    pub mode: DrawMode,
    pub points: Vec<LatLng>,
    /// Pointer position, when it is on the map.
    pub cursor: Option<LatLng>,
}

impl DrawingPreview {
    /// Outline to draw: the placed points plus the cursor, or the rectangle they span.
    pub fn outline(&self) -> Vec<LatLng> {
        match (self.mode, self.points.first(), self.cursor) {
            (DrawMode::Rectangle, Some(&first), Some(cursor)) => {
                Ring::rectangle(first, cursor).points().to_vec()
            }
            (DrawMode::Rectangle, _, _) => self.points.clone(),
            (DrawMode::Polygon, _, cursor) => {
                let mut points = self.points.clone();
                points.extend(cursor);
                points
            }
        }
    }
}

/// The editing engine: owns the interaction state and the reference frame, and reports
/// mutations to a store.
pub struct Editor<S: PolygonStore> {
    config: EditorConfig,
    store: S,
    frame: ReferenceFrame,
    input: InputState,
    state: InteractionState,
    default_annotation: String,
    move_tool: bool,
    rules: Vec<MultiPolygon>,
    feedback: Vec<Feedback>,
}

impl<S: PolygonStore> Editor<S> {
    pub fn new(store: S, config: EditorConfig) -> Self {
        let frame = ReferenceFrame::new(config.initial_center, config.initial_zoom, config.viewport);
        Self {
            default_annotation: config.default_annotation.clone(),
            config,
            store,
            frame,
            input: InputState::new(),
            state: InteractionState::Idle,
            move_tool: false,
            rules: Vec::new(),
            feedback: Vec::new(),
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn frame(&self) -> &ReferenceFrame {
        &self.frame
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn rules(&self) -> &[MultiPolygon] {
        &self.rules
    }

    pub fn default_annotation(&self) -> &str {
        &self.default_annotation
    }

    pub fn is_move_tool_active(&self) -> bool {
        self.move_tool
    }

    /// Drain queued feedback messages.
    pub fn take_feedback(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.feedback)
    }

    /// Record whose handles are shown.
    pub fn editing_target(&self) -> Option<RecordId> {
        match &self.state {
            InteractionState::EditingExisting { target }
            | InteractionState::DraggingVertex { target, .. } => Some(*target),
            InteractionState::MovingRecord {
                target,
                resume_editing: true,
                ..
            } => Some(*target),
            _ => None,
        }
    }

    /// Geometry to draw for a record, including any uncommitted drag.
    pub fn display_geometry(&self, id: RecordId) -> Option<Cow<'_, Geometry>> {
        let record = self.store.get(id)?;
        match &self.state {
            InteractionState::DraggingVertex {
                target,
                vertex,
                position: Some(position),
            } if *target == id => {
                let mut geometry = record.geometry.clone();
                geometry.move_vertex(*vertex, *position).ok()?;
                Some(Cow::Owned(geometry))
            }
            InteractionState::MovingRecord { target, drag, .. } if *target == id => {
                Some(Cow::Borrowed(&drag.preview))
            }
            _ => Some(Cow::Borrowed(&record.geometry)),
        }
    }

    /// In-progress drawing, if any.
    pub fn drawing_preview(&self) -> Option<DrawingPreview> {
        let pointer = self.input.pointer_position;
        let cursor = self
            .frame
            .is_on_map(pointer)
            .then(|| self.frame.pixel_to_live(pointer));
        match &self.state {
            InteractionState::Drawing { mode, points } => Some(DrawingPreview {
                mode: *mode,
                points: points.clone(),
                cursor,
            }),
            InteractionState::DraggingRectangleCorner {
                start,
                current,
                first_corner,
                ..
            } => Some(match first_corner {
                Some(first) => DrawingPreview {
                    mode: DrawMode::Rectangle,
                    points: vec![*first],
                    cursor: Some(*start),
                },
                None => DrawingPreview {
                    mode: DrawMode::Rectangle,
                    points: vec![*start],
                    cursor: Some(*current),
                },
            }),
            _ => None,
        }
    }

    /// Apply a viewport change from the host map.
    pub fn handle_viewport(&mut self, event: ViewportEvent) {
        self.frame.handle_viewport(event);
    }

    /// Move the view to a location as a committed change.
    pub fn navigate_to(&mut self, center: LatLng, zoom: f64) {
        self.frame.navigate_to(center, zoom);
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let position = event.position();
        // Measured before the event is applied, since a release clears the press.
        let dragged = self
            .input
            .exceeds_drag_threshold(position, self.config.rectangle_drag_threshold);
        self.input.handle_pointer_event(&event);

        match event {
            PointerEvent::Down {
                button: MouseButton::Left,
                ..
            } => self.on_press(position),
            PointerEvent::Down {
                button: MouseButton::Right,
                ..
            } => self.on_context_press(position),
            PointerEvent::Move { .. } => self.on_move(position),
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            } => self.on_release(position, dragged),
            PointerEvent::Leave { .. } => self.end_gesture(position),
            PointerEvent::DoubleClick { .. } => {
                if matches!(
                    self.state,
                    InteractionState::Drawing {
                        mode: DrawMode::Polygon,
                        ..
                    }
                ) {
                    self.finish_drawing();
                }
            }
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => {}
        }
    }

    pub fn handle_command(&mut self, command: Command) {
        log::debug!("Command {:?} in {}", command, self.state.name());
        match command {
            Command::StartDrawing(mode) => self.set_state(InteractionState::Drawing {
                mode,
                points: Vec::new(),
            }),
            Command::Finish => self.finish_drawing(),
            Command::Cancel => self.cancel(),
            Command::Edit(id) => self.begin_editing(id),
            Command::StopEditing => {
                if self.editing_target().is_some() {
                    self.set_state(InteractionState::Idle);
                }
            }
            Command::DeleteVertex(vertex) => self.delete_vertex(vertex),
            Command::Densify => {
                let limit = self.config.max_densify_vertices;
                self.edit_target_geometry(Some("Added midpoint vertices"), |g| {
                    g.densify(limit).map(|_| ())
                });
            }
            Command::Decimate => {
                self.edit_target_geometry(Some("Removed vertices"), |g| {
                    g.decimate().map(|_| ())
                });
            }
            Command::ToggleInvert(id) => match self.store.toggle_invert(id) {
                Ok(inverted) => log::debug!("Polygon {} inverted: {}", id, inverted),
                Err(e) => self.reject(e),
            },
            Command::SetDefaultAnnotation(annotation) => self.default_annotation = annotation,
            Command::SetAnnotation { id, annotation } => {
                if let Err(e) = self.store.set_annotation(id, &annotation) {
                    self.reject(e);
                }
            }
            Command::ImportWkt(text) => self.import_wkt(&text),
            Command::AddRule(text) => match parse_geometry(&text) {
                Some(rule) => self.rules.push(rule),
                None => self.reject("Invalid WKT: expected POLYGON or MULTIPOLYGON"),
            },
            Command::ClearRules => self.rules.clear(),
            Command::DeleteRecord(id) => match self.store.delete(id) {
                Ok(()) => {
                    let affected = match &self.state {
                        InteractionState::MovingRecord { target, .. } => *target == id,
                        _ => self.editing_target() == Some(id),
                    };
                    if affected {
                        self.set_state(InteractionState::Idle);
                    }
                }
                Err(e) => self.reject(e),
            },
            Command::CreateLatitudeBand { south, north } => {
                if north - south < MIN_BAND_HEIGHT {
                    self.reject(format!(
                        "Latitude band must be at least {} degrees high",
                        MIN_BAND_HEIGHT
                    ));
                } else {
                    self.set_state(InteractionState::Idle);
                    self.commit_new_ring(Ring::latitude_band(south, north));
                }
            }
            Command::SetMoveTool(active) => {
                self.move_tool = active;
                if !active && matches!(self.state, InteractionState::MovingRecord { .. }) {
                    self.cancel();
                }
            }
            Command::NavigateTo(id) => match self.store.get(id) {
                Some(record) => {
                    let center = record.geometry.centroid();
                    self.frame.navigate_to(center, self.config.navigate_zoom);
                }
                None => self.reject(StoreError::NotFound(id)),
            },
        }
    }

    fn set_state(&mut self, state: InteractionState) {
        log::debug!("{} -> {}", self.state.name(), state.name());
        self.state = state;
    }

    fn reject(&mut self, message: impl Display) {
        let message = message.to_string();
        log::warn!("{}", message);
        self.feedback.push(Feedback::Rejected(message));
    }

    fn info(&mut self, message: impl Display) {
        self.feedback.push(Feedback::Info(message.to_string()));
    }

    fn on_press(&mut self, position: Point) {
        match &self.state {
            InteractionState::Drawing {
                mode: DrawMode::Rectangle,
                points,
            } => {
                let first_corner = points.first().copied();
                if !self.frame.is_on_map(position) {
                    self.reject("Cannot draw outside map boundaries");
                    return;
                }
                let start = self.frame.pixel_to_live(position);
                self.set_state(InteractionState::DraggingRectangleCorner {
                    start,
                    start_pixel: position,
                    current: start,
                    first_corner,
                });
            }
            InteractionState::EditingExisting { target } => {
                let target = *target;
                let hit = self.store.get(target).map(|record| {
                    (
                        hit_test_vertex(
                            &record.geometry,
                            &self.frame,
                            position,
                            self.config.vertex_hit_radius,
                        ),
                        hit_test_edge(
                            &record.geometry,
                            &self.frame,
                            position,
                            self.config.edge_hit_width,
                        ),
                    )
                });
                match hit {
                    Some((Some(vertex), _)) => self.set_state(InteractionState::DraggingVertex {
                        target,
                        vertex,
                        position: None,
                    }),
                    Some((None, Some(edge))) => {
                        let point = self.frame.pixel_to_stable(position);
                        self.edit_geometry(target, None, |g| g.insert_vertex(edge, point));
                    }
                    Some((None, None)) if self.move_tool => {
                        self.begin_move(target, position, true)
                    }
                    Some((None, None)) => {}
                    None => {
                        self.reject(StoreError::NotFound(target));
                        self.set_state(InteractionState::Idle);
                    }
                }
            }
            InteractionState::Idle if self.move_tool => {
                let point = self.frame.pixel_to_stable(position);
                let hit = self
                    .store
                    .records()
                    .into_iter()
                    .rev()
                    .find(|r| r.geometry.contains(point))
                    .map(|r| r.id);
                if let Some(id) = hit {
                    self.begin_move(id, position, false);
                }
            }
            _ => {}
        }
    }

    fn on_context_press(&mut self, position: Point) {
        let InteractionState::EditingExisting { target } = self.state else {
            return;
        };
        let vertex = self.store.get(target).and_then(|record| {
            hit_test_vertex(
                &record.geometry,
                &self.frame,
                position,
                self.config.vertex_hit_radius,
            )
        });
        if let Some(vertex) = vertex {
            self.delete_vertex(vertex);
        }
    }

    fn on_move(&mut self, position: Point) {
        let on_map = self.frame.is_on_map(position);
        match &mut self.state {
            InteractionState::DraggingVertex { position: p, .. } => {
                if on_map {
                    *p = Some(self.frame.pixel_to_stable(position));
                }
            }
            InteractionState::DraggingRectangleCorner { current, .. } => {
                if on_map {
                    *current = self.frame.pixel_to_live(position);
                }
            }
            InteractionState::MovingRecord { drag, .. } => {
                drag.update(self.frame.pixel_to_stable(position));
            }
            _ => {}
        }
    }

    fn on_release(&mut self, position: Point, dragged: bool) {
        if let InteractionState::Drawing {
            mode: DrawMode::Polygon,
            points,
        } = &self.state
        {
            if dragged {
                return;
            }
            let duplicate = points.last().is_some_and(|last| {
                (self.frame.live_to_pixel(*last) - position).hypot()
                    < self.config.click_dedupe_distance
            });
            if !self.frame.is_on_map(position) {
                self.reject("Cannot draw outside map boundaries");
                return;
            }
            if duplicate {
                return;
            }
            let point = self.frame.pixel_to_live(position);
            if let InteractionState::Drawing { points, .. } = &mut self.state {
                points.push(point);
            }
            return;
        }
        self.end_gesture(position);
    }

    /// Terminate whatever drag is active at `position`.
    fn end_gesture(&mut self, position: Point) {
        match std::mem::take(&mut self.state) {
            InteractionState::DraggingRectangleCorner {
                start,
                start_pixel,
                current,
                first_corner,
            } => {
                let current = if self.frame.is_on_map(position) {
                    self.frame.pixel_to_live(position)
                } else {
                    current
                };
                let travelled = (position - start_pixel).hypot();
                if travelled > self.config.rectangle_drag_threshold {
                    self.finish_rectangle(start, current);
                } else if let Some(first) = first_corner {
                    let distinct = (self.frame.live_to_pixel(first) - start_pixel).hypot()
                        >= self.config.click_dedupe_distance;
                    if distinct {
                        self.finish_rectangle(first, start);
                    } else {
                        self.state = InteractionState::Drawing {
                            mode: DrawMode::Rectangle,
                            points: vec![first],
                        };
                    }
                } else {
                    self.state = InteractionState::Drawing {
                        mode: DrawMode::Rectangle,
                        points: vec![start],
                    };
                }
            }
            InteractionState::DraggingVertex {
                target,
                vertex,
                position,
            } => {
                self.state = InteractionState::EditingExisting { target };
                if let Some(point) = position {
                    self.edit_geometry(target, None, |g| g.move_vertex(vertex, point));
                }
            }
            InteractionState::MovingRecord {
                target,
                drag,
                resume_editing,
            } => {
                self.state = if resume_editing {
                    InteractionState::EditingExisting { target }
                } else {
                    InteractionState::Idle
                };
                if drag.preview != drag.original {
                    if let Err(e) = self.store.update(target, drag.preview) {
                        self.reject(e);
                    }
                }
            }
            other => self.state = other,
        }
    }

    fn begin_move(&mut self, target: RecordId, position: Point, resume_editing: bool) {
        let Some(record) = self.store.get(target) else {
            return;
        };
        let drag = MoveState::new(
            self.frame.pixel_to_stable(position),
            record.geometry.clone(),
        );
        self.set_state(InteractionState::MovingRecord {
            target,
            drag,
            resume_editing,
        });
    }

    fn finish_drawing(&mut self) {
        let InteractionState::Drawing { mode, points } = &self.state else {
            log::debug!("Nothing to finish in {}", self.state.name());
            return;
        };
        let (mode, points) = (*mode, points.clone());
        let ring = match mode {
            DrawMode::Polygon if points.len() < 3 => {
                self.reject("Please add at least 3 points to create a polygon");
                return;
            }
            DrawMode::Polygon => Ring::new(points),
            DrawMode::Rectangle if points.len() != 2 => {
                self.reject("Please click two opposite corners to create a rectangle");
                return;
            }
            DrawMode::Rectangle => Ok(Ring::rectangle(points[0], points[1])),
        };
        match ring {
            Ok(ring) => {
                self.set_state(InteractionState::Idle);
                self.commit_new_ring(ring);
            }
            Err(e) => self.reject(e),
        }
    }

    fn finish_rectangle(&mut self, p1: LatLng, p2: LatLng) {
        self.set_state(InteractionState::Idle);
        self.commit_new_ring(Ring::rectangle(p1, p2));
    }

    /// Hand a finished ring to the store as a new record, or as a new part of the latest one.
    fn commit_new_ring(&mut self, ring: Ring) {
        self.frame.sync();
        let merge_target = if self.config.merge_new_drawings {
            self.store.latest().map(|r| r.id)
        } else {
            None
        };
        let result = match merge_target {
            Some(id) => self.store.merge_into(id, ring).map(|()| id),
            None => self
                .store
                .create(Geometry::Single(ring), false, &self.default_annotation),
        };
        match result {
            Ok(id) => {
                if merge_target.is_some() {
                    self.info("Added as a new part of the existing polygon");
                }
                if self.config.edit_after_create {
                    self.begin_editing(id);
                }
            }
            Err(e) => self.reject(e),
        }
    }

    fn import_wkt(&mut self, text: &str) {
        let Some(parsed) = parse_geometry(text) else {
            self.reject("Invalid WKT: expected POLYGON or MULTIPOLYGON");
            return;
        };
        let imported = import_geometry(parsed);
        if imported.dropped_holes > 0 {
            self.info(format!(
                "Imported without {} hole ring(s)",
                imported.dropped_holes
            ));
        }
        self.frame.sync();
        match self.store.create(
            imported.geometry,
            imported.inverted,
            &self.default_annotation,
        ) {
            Ok(id) => {
                if self.config.edit_after_create {
                    self.begin_editing(id);
                }
            }
            Err(e) => self.reject(e),
        }
    }

    fn begin_editing(&mut self, id: RecordId) {
        let Some(record) = self.store.get(id) else {
            self.reject(StoreError::NotFound(id));
            return;
        };
        let densify = self.config.densify_on_edit
            && record
                .geometry
                .parts()
                .iter()
                .all(|r| r.len() < DENSIFY_ON_EDIT_BELOW);
        self.set_state(InteractionState::EditingExisting { target: id });
        if densify {
            let limit = self.config.max_densify_vertices;
            self.edit_geometry(id, None, |g| g.densify(limit).map(|_| ()));
        }
    }

    fn cancel(&mut self) {
        let next = match &self.state {
            InteractionState::Idle => return,
            InteractionState::Drawing { .. }
            | InteractionState::DraggingRectangleCorner { .. }
            | InteractionState::EditingExisting { .. } => InteractionState::Idle,
            InteractionState::DraggingVertex { target, .. } => {
                InteractionState::EditingExisting { target: *target }
            }
            InteractionState::MovingRecord {
                target,
                resume_editing,
                ..
            } => {
                if *resume_editing {
                    InteractionState::EditingExisting { target: *target }
                } else {
                    InteractionState::Idle
                }
            }
        };
        self.set_state(next);
    }

    fn delete_vertex(&mut self, vertex: VertexRef) {
        self.edit_target_geometry(None, |g| g.delete_vertex(vertex).map(|_| ()));
    }

    /// Apply `op` to the record being edited.
    fn edit_target_geometry(
        &mut self,
        success: Option<&str>,
        op: impl FnOnce(&mut Geometry) -> Result<(), EditError>,
    ) {
        let InteractionState::EditingExisting { target } = self.state else {
            self.reject("No polygon is being edited");
            return;
        };
        self.edit_geometry(target, success, op);
    }

    /// Apply `op` to a copy of the record's geometry and commit it. The record is untouched if
    /// `op` fails.
    fn edit_geometry(
        &mut self,
        id: RecordId,
        success: Option<&str>,
        op: impl FnOnce(&mut Geometry) -> Result<(), EditError>,
    ) {
        let Some(mut geometry) = self.store.get(id).map(|r| r.geometry.clone()) else {
            self.reject(StoreError::NotFound(id));
            return;
        };
        if let Err(e) = op(&mut geometry) {
            self.reject(e);
            return;
        }
        match self.store.update(id, geometry) {
            Ok(()) => {
                if let Some(message) = success {
                    self.info(message);
                }
            }
            Err(e) => self.reject(e),
        }
    }
}
