//! Pointer gesture recognition for grid cells.
//!
//! A press arms the tracker. Moving far enough on either axis turns the press
//! into a drag, and a drag never counts as a click. Two clicks on the same
//! cell within the double-click interval launch it.

use crate::config::Settings;
use crate::registry::CellRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub position: Point,
    pub button: PointerButton,
    /// Platform says this event opens a context menu (e.g. ctrl-click).
    pub popup_trigger: bool,
    pub timestamp_ms: u64,
    pub target: CellRef,
}

impl PointerEvent {
    fn is_primary(&self) -> bool {
        self.button == PointerButton::Primary && !self.popup_trigger
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    PressedAwaitingMove { origin: Point, target: CellRef },
    Dragging { target: CellRef },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    None,
    StartDrag(CellRef),
    Click { target: CellRef, count: u32 },
    Launch(CellRef),
}

#[derive(Debug, Clone, Copy)]
struct ClickRecord {
    target: CellRef,
    at_ms: u64,
    count: u32,
}

#[derive(Debug, Clone)]
pub struct GestureTracker {
    state: GestureState,
    threshold_px: i32,
    double_click_ms: u64,
    last_click: Option<ClickRecord>,
}

impl GestureTracker {
    pub fn new(threshold_px: i32, double_click_ms: u64) -> Self {
        Self {
            state: GestureState::Idle,
            threshold_px: threshold_px.max(1),
            double_click_ms,
            last_click: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.drag_threshold_px, settings.double_click_ms)
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn press(&mut self, event: &PointerEvent) -> GestureAction {
        if event.is_primary() {
            self.state = GestureState::PressedAwaitingMove {
                origin: event.position,
                target: event.target,
            };
        }
        GestureAction::None
    }

    pub fn motion(&mut self, event: &PointerEvent) -> GestureAction {
        let GestureState::PressedAwaitingMove { origin, target } = self.state else {
            return GestureAction::None;
        };

        let dx = (event.position.x - origin.x).abs();
        let dy = (event.position.y - origin.y).abs();
        if dx < self.threshold_px && dy < self.threshold_px {
            return GestureAction::None;
        }

        self.state = GestureState::Dragging { target };
        self.last_click = None;
        GestureAction::StartDrag(target)
    }

    pub fn release(&mut self, event: &PointerEvent) -> GestureAction {
        match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::PressedAwaitingMove { target, .. } if event.is_primary() => {
                self.register_click(target, event.timestamp_ms)
            }
            _ => GestureAction::None,
        }
    }

    /// Abandon whatever is in progress, e.g. when the pointer leaves the window.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    fn register_click(&mut self, target: CellRef, at_ms: u64) -> GestureAction {
        let count = match self.last_click {
            Some(last)
                if last.target == target
                    && at_ms.saturating_sub(last.at_ms) <= self.double_click_ms =>
            {
                last.count + 1
            }
            _ => 1,
        };

        if count >= 2 {
            self.last_click = None;
            GestureAction::Launch(target)
        } else {
            self.last_click = Some(ClickRecord {
                target,
                at_ms,
                count,
            });
            GestureAction::Click { target, count }
        }
    }
}
