//! Bridges winit keyboard events into the engine's [`KeyboardHub`].
//!
//! Physical key codes are translated into DOM-style key identifiers so game
//! logic can be written against the same names on every host.
//!
//! This is the API a windowed host calls. The host owns one [`KeyForwarder`]
//! next to the hub it handed to the engine and passes every window event
//! through it from its `ApplicationHandler::window_event`:
//!
//! ```ignore
//! fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
//!     self.keys.forward_window_event(&self.hub, &event);
//!     // redraw, resize, close handling...
//! }
//! ```
//!
//! Headless runs skip this layer and drive the hub from an input script.

use std::collections::HashSet;

use tpe_core::input::KeyboardHub;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

// Left and right modifiers share one identifier, as DOM `key` values do.
const KEY_NAMES: &[(KeyCode, &str)] = &[
    (KeyCode::ArrowLeft, "ArrowLeft"),
    (KeyCode::ArrowRight, "ArrowRight"),
    (KeyCode::ArrowUp, "ArrowUp"),
    (KeyCode::ArrowDown, "ArrowDown"),
    (KeyCode::Escape, "Escape"),
    (KeyCode::Space, " "),
    (KeyCode::Enter, "Enter"),
    (KeyCode::Tab, "Tab"),
    (KeyCode::ShiftLeft, "Shift"),
    (KeyCode::ShiftRight, "Shift"),
    (KeyCode::ControlLeft, "Control"),
    (KeyCode::ControlRight, "Control"),
    (KeyCode::KeyA, "a"),
    (KeyCode::KeyD, "d"),
    (KeyCode::KeyE, "e"),
    (KeyCode::KeyQ, "q"),
    (KeyCode::KeyS, "s"),
    (KeyCode::KeyW, "w"),
    (KeyCode::Digit1, "1"),
    (KeyCode::Digit2, "2"),
    (KeyCode::Digit3, "3"),
    (KeyCode::Digit4, "4"),
    (KeyCode::F3, "F3"),
];

pub fn key_name(key_code: KeyCode) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(code, _)| *code == key_code)
        .map(|(_, name)| *name)
}

/// Whether a window host can ever deliver this key identifier.
pub fn is_mapped_name(name: &str) -> bool {
    KEY_NAMES.iter().any(|(_, mapped)| *mapped == name)
}

/// Tracks which physical keys are down so an identifier shared by two keys
/// stays held until both are released.
#[derive(Debug, Default)]
pub struct KeyForwarder {
    pressed: HashSet<KeyCode>,
}

impl KeyForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward one key transition. Returns false for keys without a mapping.
    pub fn forward_key(&mut self, hub: &KeyboardHub, key_code: KeyCode, state: ElementState) -> bool {
        let Some(name) = key_name(key_code) else {
            log::trace!("Ignoring unmapped key {:?}", key_code);
            return false;
        };
        match state {
            ElementState::Pressed => {
                self.pressed.insert(key_code);
                hub.key_down(name);
            }
            ElementState::Released => {
                self.pressed.remove(&key_code);
                let sibling_held = self
                    .pressed
                    .iter()
                    .any(|code| key_name(*code) == Some(name));
                if sibling_held {
                    log::trace!("{:?} released; '{}' still held", key_code, name);
                } else {
                    hub.key_up(name);
                }
            }
        }
        true
    }

    /// Feed a window event into the hub. Losing focus releases every key, since
    /// the matching key-up events go to whichever window gained focus.
    pub fn forward_window_event(&mut self, hub: &KeyboardHub, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => self.forward_key(hub, code, event.state),
                PhysicalKey::Unidentified(_) => false,
            },
            WindowEvent::Focused(false) => {
                self.pressed.clear();
                hub.release_all();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tpe_core::input::{InputManager, ARROW_RIGHT};

    #[test]
    fn arrow_keys_map_to_dom_names() {
        assert_eq!(key_name(KeyCode::ArrowRight), Some("ArrowRight"));
        assert_eq!(key_name(KeyCode::ArrowLeft), Some("ArrowLeft"));
        assert_eq!(key_name(KeyCode::ArrowUp), Some("ArrowUp"));
        assert_eq!(key_name(KeyCode::ArrowDown), Some("ArrowDown"));
        assert_eq!(key_name(KeyCode::ShiftRight), Some("Shift"));
    }

    #[test]
    fn mapped_names_cover_movement_keys() {
        assert!(is_mapped_name("ArrowUp"));
        assert!(is_mapped_name("w"));
        assert!(!is_mapped_name("KeyW"));
        assert!(!is_mapped_name("F12"));
    }

    #[test]
    fn unmapped_key_is_ignored() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        let mut keys = KeyForwarder::new();
        assert!(!keys.forward_key(&hub, KeyCode::F12, ElementState::Pressed));
        assert!(input.held_keys().is_empty());
    }

    #[test]
    fn press_and_release_reach_input_manager() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        let mut keys = KeyForwarder::new();

        assert!(keys.forward_key(&hub, KeyCode::ArrowRight, ElementState::Pressed));
        assert!(input.is_key_down(ARROW_RIGHT));

        assert!(keys.forward_key(&hub, KeyCode::ArrowRight, ElementState::Released));
        assert!(!input.is_key_down(ARROW_RIGHT));
    }

    #[test]
    fn shared_modifier_stays_down_until_both_sides_release() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        let mut keys = KeyForwarder::new();

        keys.forward_key(&hub, KeyCode::ShiftLeft, ElementState::Pressed);
        keys.forward_key(&hub, KeyCode::ShiftRight, ElementState::Pressed);
        keys.forward_key(&hub, KeyCode::ShiftLeft, ElementState::Released);
        assert!(input.is_key_down("Shift"));

        keys.forward_key(&hub, KeyCode::ShiftRight, ElementState::Released);
        assert!(!input.is_key_down("Shift"));

        keys.forward_key(&hub, KeyCode::ControlRight, ElementState::Pressed);
        keys.forward_key(&hub, KeyCode::ControlLeft, ElementState::Released);
        assert!(input.is_key_down("Control"));
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        let mut keys = KeyForwarder::new();
        keys.forward_key(&hub, KeyCode::ArrowRight, ElementState::Pressed);
        keys.forward_key(&hub, KeyCode::ShiftLeft, ElementState::Pressed);

        assert!(keys.forward_window_event(&hub, &WindowEvent::Focused(false)));
        assert!(!input.is_key_down(ARROW_RIGHT));
        assert!(!input.is_key_down("Shift"));
        assert!(!keys.forward_window_event(&hub, &WindowEvent::Focused(true)));

        // Nothing stale survives the focus loss.
        keys.forward_key(&hub, KeyCode::ShiftRight, ElementState::Pressed);
        keys.forward_key(&hub, KeyCode::ShiftRight, ElementState::Released);
        assert!(!input.is_key_down("Shift"));
    }
}
