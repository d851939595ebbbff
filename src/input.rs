use std::time::{Duration, Instant};

use winit::keyboard::KeyCode;

use crate::config::PanConfig;
use crate::coords::{ScreenPoint, TileCoord};
use crate::keybindings::ModifierFlags;

/// Mouse button identifier (decoupled from winit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Input delivered to the view, in view-local pixels.
#[derive(Debug, Clone, Copy)]
pub enum ViewEvent {
    Motion { pos: ScreenPoint, at: Instant },
    /// The pointer left the view.
    Left,
    ButtonDown {
        button: MouseButton,
        pos: ScreenPoint,
        at: Instant,
    },
    ButtonUp { button: MouseButton, pos: ScreenPoint },
    Wheel { up: bool },
    KeyUp { key: KeyCode, modifiers: ModifierFlags },
}

/// Outcome of one pointer sample during a pan drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanStep {
    /// Too soon after the previous sample.
    Debounced,
    /// Pointer has not left the anchor.
    Still,
    /// Implausibly fast; delta dropped.
    Runaway,
    /// Offset change to apply.
    Moved(ScreenPoint),
}

/// A middle-button drag in progress.
///
/// The pointer is warped back to `anchor` after every applied sample, so each
/// sample's offset from the anchor is the motion since the last one.
#[derive(Debug, Clone, Copy)]
pub struct PanGesture {
    pub anchor: ScreenPoint,
    last_sample: Instant,
    /// The pointer left the anchor at least once, applied or not.
    dragged: bool,
}

impl PanGesture {
    pub fn new(anchor: ScreenPoint, at: Instant) -> Self {
        Self {
            anchor,
            last_sample: at,
            dragged: false,
        }
    }

    pub fn sample(&mut self, pos: ScreenPoint, at: Instant, cfg: &PanConfig) -> PanStep {
        if pos != self.anchor {
            self.dragged = true;
        }
        let elapsed = at.saturating_duration_since(self.last_sample);
        if elapsed < Duration::from_millis(cfg.debounce_ms) {
            return PanStep::Debounced;
        }
        self.last_sample = at;

        let delta = pos - self.anchor;
        let distance = delta.length();
        if distance == 0.0 {
            return PanStep::Still;
        }
        let speed = distance / elapsed.as_secs_f32().max(1e-3);
        if speed >= cfg.runaway_speed {
            log::debug!("dropping pan sample at {speed:.0} px/s");
            return PanStep::Runaway;
        }
        PanStep::Moved(delta * cfg.acceleration(speed))
    }

    /// Whether the pointer ever left the anchor, even in samples that were
    /// debounced or dropped. A gesture that never did is a click.
    pub fn moved(&self) -> bool {
        self.dragged
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub enum PointerMode {
    #[default]
    Idle,
    Panning(PanGesture),
    RoadPainting { start: TileCoord },
}

/// Tiles visited walking from `start` to `end`: along x first, then along y.
/// Both ends are included.
pub fn road_path(start: TileCoord, end: TileCoord) -> Vec<TileCoord> {
    let step_x = (end.x - start.x).signum();
    let step_y = (end.y - start.y).signum();
    let mut path = Vec::with_capacity(((end.x - start.x).abs() + (end.y - start.y).abs() + 1) as usize);
    let mut at = start;
    path.push(at);
    while at.x != end.x {
        at.x += step_x;
        path.push(at);
    }
    while at.y != end.y {
        at.y += step_y;
        path.push(at);
    }
    path
}
