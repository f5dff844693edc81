//! Pointer events from the map surface and the state derived from them.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Pointer event in viewport pixels.
///
/// A `Down` with the right button is the vertex delete gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        #[serde(default)]
        button: MouseButton,
    },
    Up {
        position: Point,
        #[serde(default)]
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    /// The pointer left the map surface.
    Leave {
        position: Point,
    },
    DoubleClick {
        position: Point,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Leave { position }
            | PointerEvent::DoubleClick { position } => position,
        }
    }
}

/// Tracks pointer position and the current press across events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current pointer position in viewport pixels.
    pub pointer_position: Point,
    /// Where the current left-button press started.
    pub drag_start: Option<Point>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        self.pointer_position = event.position();
        match *event {
            PointerEvent::Down { position, button } => {
                if button == MouseButton::Left && self.drag_start.is_none() {
                    self.drag_start = Some(position);
                }
            }
            PointerEvent::Up { button, .. } => {
                if button == MouseButton::Left {
                    self.drag_start = None;
                }
            }
            PointerEvent::Leave { .. } => self.drag_start = None,
            PointerEvent::Move { .. } | PointerEvent::DoubleClick { .. } => {}
        }
    }

    /// Whether `position` is more than `threshold` pixels from the active press.
    pub fn exceeds_drag_threshold(&self, position: Point, threshold: f64) -> bool {
        self.drag_start.is_some_and(|start| (position - start).hypot() > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_tracking() {
        let mut input = InputState::new();
        input.handle_pointer_event(&PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });
        assert_eq!(input.drag_start, Some(Point::new(100.0, 100.0)));

        input.handle_pointer_event(&PointerEvent::Move {
            position: Point::new(103.0, 104.0),
        });
        assert_eq!(input.pointer_position, Point::new(103.0, 104.0));
        assert!(!input.exceeds_drag_threshold(input.pointer_position, 5.0));
        assert!(input.exceeds_drag_threshold(Point::new(110.0, 100.0), 5.0));
        assert_eq!(input.drag_start, Some(Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_release_and_leave_end_press() {
        let mut input = InputState::new();
        input.handle_pointer_event(&PointerEvent::Down {
            position: Point::new(1.0, 1.0),
            button: MouseButton::Left,
        });
        input.handle_pointer_event(&PointerEvent::Up {
            position: Point::new(1.0, 1.0),
            button: MouseButton::Left,
        });
        assert_eq!(input.drag_start, None);
        assert!(!input.exceeds_drag_threshold(Point::new(50.0, 50.0), 5.0));

        input.handle_pointer_event(&PointerEvent::Down {
            position: Point::new(1.0, 1.0),
            button: MouseButton::Left,
        });
        input.handle_pointer_event(&PointerEvent::Leave {
            position: Point::new(-5.0, 1.0),
        });
        assert_eq!(input.drag_start, None);
    }

    #[test]
    fn test_right_button_does_not_start_drag() {
        let mut input = InputState::new();
        input.handle_pointer_event(&PointerEvent::Down {
            position: Point::new(1.0, 1.0),
            button: MouseButton::Right,
        });
        assert_eq!(input.drag_start, None);
        assert!(!input.exceeds_drag_threshold(Point::new(50.0, 50.0), 5.0));
    }

    #[test]
    fn test_event_json_default_button() {
        let event: PointerEvent =
            serde_json::from_str(r#"{"Down":{"position":{"x":3.0,"y":4.0}}}"#).unwrap();
        assert_eq!(
            event,
            PointerEvent::Down {
                position: Point::new(3.0, 4.0),
                button: MouseButton::Left,
            }
        );
    }
}
