//! JSON replay scripts: a list of pointer, viewport and command steps fed to an editor.

use geoscribe_core::{
    Command, Editor, EditorConfig, Feedback, LatLng, MemoryStore, MouseButton, PointerEvent,
    PolygonStore, RecordId, StoreEvent, ViewportEvent,
};
use serde::{Deserialize, Serialize};

/// Action applied to the most recently created record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatestAction {
    Edit,
    ToggleInvert,
    Delete,
    NavigateTo,
    Annotate(String),
}

impl LatestAction {
    fn command(self, id: RecordId) -> Command {
        match self {
            LatestAction::Edit => Command::Edit(id),
            LatestAction::ToggleInvert => Command::ToggleInvert(id),
            LatestAction::Delete => Command::DeleteRecord(id),
            LatestAction::NavigateTo => Command::NavigateTo(id),
            LatestAction::Annotate(annotation) => Command::SetAnnotation { id, annotation },
        }
    }
}

/// One step of a replay script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Pointer { event: PointerEvent },
    Viewport { event: ViewportEvent },
    Command { command: Command },
    /// Press and release at a coordinate of the current view.
    Click {
        lat: f64,
        lng: f64,
        #[serde(default)]
        button: MouseButton,
    },
    Latest { action: LatestAction },
}

/// Record as printed after a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub annotation: String,
    pub inverted: bool,
    pub wkt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub state: &'static str,
    pub records: Vec<RecordSummary>,
    pub feedback: Vec<Feedback>,
    pub events: Vec<StoreEvent>,
}

/// Editor driven by script steps, collecting feedback and store events as it goes.
pub struct Replay {
    pub editor: Editor<MemoryStore>,
    feedback: Vec<Feedback>,
    events: Vec<StoreEvent>,
}

impl Replay {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            editor: Editor::new(MemoryStore::new(), config),
            feedback: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn apply(&mut self, step: Step) {
        match step {
            Step::Pointer { event } => self.editor.handle_pointer(event),
            Step::Viewport { event } => self.editor.handle_viewport(event),
            Step::Command { command } => self.editor.handle_command(command),
            Step::Click { lat, lng, button } => {
                let position = self.editor.frame().live_to_pixel(LatLng::new(lat, lng));
                self.editor
                    .handle_pointer(PointerEvent::Down { position, button });
                self.editor.handle_pointer(PointerEvent::Up { position, button });
            }
            Step::Latest { action } => match self.editor.store().latest().map(|r| r.id) {
                Some(id) => self.editor.handle_command(action.command(id)),
                None => log::warn!("Skipping {:?}: no records yet", action),
            },
        }
        self.feedback.extend(self.editor.take_feedback());
        self.events.extend(self.editor.store_mut().take_events());
    }

    pub fn run(&mut self, steps: impl IntoIterator<Item = Step>) {
        for (i, step) in steps.into_iter().enumerate() {
            log::debug!("Step {}: {:?}", i, step);
            self.apply(step);
        }
    }

    pub fn report(&self) -> ReplayReport {
        let mut records: Vec<_> = self.editor.store().records();
        records.sort_by_key(|r| r.created_at);
        ReplayReport {
            state: self.editor.state().name(),
            records: records
                .into_iter()
                .map(|r| RecordSummary {
                    id: r.id,
                    annotation: r.annotation.clone(),
                    inverted: r.inverted,
                    wkt: r.to_wkt(),
                })
                .collect(),
            feedback: self.feedback.clone(),
            events: self.events.clone(),
        }
    }
}

/// Parse a script file body: a JSON array of steps.
pub fn parse_steps(json: &str) -> serde_json::Result<Vec<Step>> {
    serde_json::from_str(json)
}
