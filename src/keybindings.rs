use std::collections::HashMap;

use winit::keyboard::KeyCode;

/// Modifier flags for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierFlags {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl ModifierFlags {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

/// A key combination: modifier flags + a physical key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: ModifierFlags,
    pub key: KeyCode,
}

impl KeyCombo {
    /// Plain key, no modifiers.
    pub const fn plain(key: KeyCode) -> Self {
        Self {
            modifiers: ModifierFlags::NONE,
            key,
        }
    }
}

/// View commands reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewAction {
    /// Toggle drawing of buildings larger than one tile.
    ToggleHideHigh,
    CycleOverlay,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    /// Scroll by half a tile per unit: `dx` in tile-width halves, `dy` in
    /// tile-height halves.
    Scroll { dx: i8, dy: i8 },
    /// Centre the view on the middle of the map.
    CenterMap,
}

/// Keyboard shortcut map for the view.
pub struct KeyBindings {
    map: HashMap<KeyCombo, ViewAction>,
    /// Reverse lookup: action → first combo that maps to it.
    reverse: HashMap<ViewAction, KeyCombo>,
}

impl KeyBindings {
    pub fn defaults() -> Self {
        let mut map = HashMap::new();

        map.insert(KeyCombo::plain(KeyCode::KeyH), ViewAction::ToggleHideHigh);
        map.insert(KeyCombo::plain(KeyCode::KeyV), ViewAction::CycleOverlay);
        map.insert(KeyCombo::plain(KeyCode::NumpadAdd), ViewAction::ZoomIn);
        map.insert(KeyCombo::plain(KeyCode::NumpadSubtract), ViewAction::ZoomOut);
        map.insert(KeyCombo::plain(KeyCode::NumpadEnter), ViewAction::ZoomReset);
        map.insert(KeyCombo::plain(KeyCode::Numpad5), ViewAction::CenterMap);

        let scrolls = [
            (KeyCode::ArrowUp, 0, -1),
            (KeyCode::ArrowDown, 0, 1),
            (KeyCode::ArrowLeft, -1, 0),
            (KeyCode::ArrowRight, 1, 0),
            (KeyCode::Numpad8, 0, -1),
            (KeyCode::Numpad2, 0, 1),
            (KeyCode::Numpad4, -1, 0),
            (KeyCode::Numpad6, 1, 0),
            (KeyCode::Numpad7, -1, -1),
            (KeyCode::Numpad9, 1, -1),
            (KeyCode::Numpad1, -1, 1),
            (KeyCode::Numpad3, 1, 1),
        ];
        for (key, dx, dy) in scrolls {
            map.insert(KeyCombo::plain(key), ViewAction::Scroll { dx, dy });
        }

        let reverse = Self::build_reverse(&map);
        Self { map, reverse }
    }

    /// Look up the action for a key combination. A Shift combo without its
    /// own binding resolves to the unshifted one.
    pub fn lookup(&self, combo: KeyCombo) -> Option<ViewAction> {
        self.map.get(&combo).copied().or_else(|| {
            if !combo.modifiers.shift {
                return None;
            }
            let unshifted = KeyCombo {
                modifiers: ModifierFlags {
                    shift: false,
                    ..combo.modifiers
                },
                key: combo.key,
            };
            self.map.get(&unshifted).copied()
        })
    }

    /// Display label for an action's binding (e.g. "V", "Num+").
    pub fn label_for(&self, action: ViewAction) -> Option<String> {
        self.reverse.get(&action).map(|combo| {
            let mut parts = Vec::new();
            if combo.modifiers.ctrl {
                parts.push("Ctrl");
            }
            if combo.modifiers.alt {
                parts.push("Alt");
            }
            if combo.modifiers.shift {
                parts.push("Shift");
            }
            parts.push(key_name(combo.key));
            parts.join("+")
        })
    }

    fn build_reverse(map: &HashMap<KeyCombo, ViewAction>) -> HashMap<ViewAction, KeyCombo> {
        let mut reverse = HashMap::new();
        // Prefer the lexically smallest label when several keys share an
        // action, so labels are stable across runs.
        let mut combos: Vec<_> = map.iter().collect();
        combos.sort_by_key(|(combo, _)| key_name(combo.key));
        for (&combo, &action) in combos {
            reverse.entry(action).or_insert(combo);
        }
        reverse
    }
}

/// Human-readable name for a key code.
fn key_name(key: KeyCode) -> &'static str {
    match key {
        KeyCode::KeyH => "H",
        KeyCode::KeyV => "V",
        KeyCode::NumpadAdd => "Num+",
        KeyCode::NumpadSubtract => "Num-",
        KeyCode::NumpadEnter => "NumEnter",
        KeyCode::Numpad1 => "Num1",
        KeyCode::Numpad2 => "Num2",
        KeyCode::Numpad3 => "Num3",
        KeyCode::Numpad4 => "Num4",
        KeyCode::Numpad5 => "Num5",
        KeyCode::Numpad6 => "Num6",
        KeyCode::Numpad7 => "Num7",
        KeyCode::Numpad8 => "Num8",
        KeyCode::Numpad9 => "Num9",
        KeyCode::ArrowUp => "Up",
        KeyCode::ArrowDown => "Down",
        KeyCode::ArrowLeft => "Left",
        KeyCode::ArrowRight => "Right",
        _ => "?",
    }
}
