//! Held-key tracking fed by the host's global keyboard notifications.
//!
//! The host owns a [`KeyboardHub`] and forwards every key-down / key-up it
//! receives. Each [`InputManager`] subscribes to the hub on construction and
//! keeps its own set of currently held key identifiers, so several engines on
//! one page never share input state. `destroy()` (or drop) unsubscribes.
//!
//! Key identifiers are DOM-style names (`"ArrowRight"`, `"a"`, ...). Platform
//! adapters translate native key codes into these names.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

pub const ARROW_RIGHT: &str = "ArrowRight";
pub const ARROW_LEFT: &str = "ArrowLeft";
pub const ARROW_DOWN: &str = "ArrowDown";
pub const ARROW_UP: &str = "ArrowUp";

type HeldKeys = Rc<RefCell<HashSet<String>>>;

#[derive(Default)]
struct HubState {
    next_id: u64,
    listeners: Vec<(u64, Weak<RefCell<HashSet<String>>>)>,
}

/// Broadcast point for host keyboard events. Cloning yields another handle to
/// the same hub.
#[derive(Clone, Default)]
pub struct KeyboardHub {
    state: Rc<RefCell<HubState>>,
}

impl KeyboardHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&self, key: &str) {
        self.broadcast(|held| {
            held.insert(key.to_string());
        });
    }

    pub fn key_up(&self, key: &str) {
        self.broadcast(|held| {
            held.remove(key);
        });
    }

    /// Release every key, e.g. when the host window loses focus and the
    /// matching key-up events will never arrive.
    pub fn release_all(&self) {
        self.broadcast(|held| held.clear());
    }

    pub fn listener_count(&self) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|(_, held)| held.strong_count() > 0)
            .count()
    }

    fn subscribe(&self, held: &HeldKeys) -> u64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, Rc::downgrade(held)));
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.state
            .borrow_mut()
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn broadcast(&self, apply: impl Fn(&mut HashSet<String>)) {
        let mut state = self.state.borrow_mut();
        state.listeners.retain(|(_, held)| held.strong_count() > 0);
        for (_, held) in &state.listeners {
            if let Some(held) = held.upgrade() {
                apply(&mut held.borrow_mut());
            }
        }
    }
}

pub struct InputManager {
    held: HeldKeys,
    hub: KeyboardHub,
    subscription: Option<u64>,
}

impl InputManager {
    pub fn new(hub: &KeyboardHub) -> Self {
        let held: HeldKeys = Rc::new(RefCell::new(HashSet::new()));
        let subscription = Some(hub.subscribe(&held));
        Self {
            held,
            hub: hub.clone(),
            subscription,
        }
    }

    pub fn is_key_down(&self, key: &str) -> bool {
        self.held.borrow().contains(key)
    }

    /// Currently held keys, sorted for stable output.
    pub fn held_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.held.borrow().iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Stop listening to the hub. Held keys are forgotten.
    pub fn destroy(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.hub.unsubscribe(id);
            self.held.borrow_mut().clear();
        }
    }
}

impl Drop for InputManager {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_and_up_track_held_state() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        assert!(!input.is_key_down(ARROW_UP));

        hub.key_down(ARROW_UP);
        assert!(input.is_key_down(ARROW_UP));

        hub.key_up(ARROW_UP);
        assert!(!input.is_key_down(ARROW_UP));
    }

    #[test]
    fn multiple_keys_are_independent() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        hub.key_down(ARROW_UP);
        hub.key_down(ARROW_RIGHT);

        assert!(input.is_key_down(ARROW_UP));
        assert!(input.is_key_down(ARROW_RIGHT));
        assert!(!input.is_key_down(ARROW_DOWN));

        hub.key_up(ARROW_UP);
        assert!(!input.is_key_down(ARROW_UP));
        assert!(input.is_key_down(ARROW_RIGHT));
    }

    #[test]
    fn key_up_without_down_is_no_op() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        hub.key_up(ARROW_LEFT);
        assert!(input.held_keys().is_empty());
    }

    #[test]
    fn destroy_unsubscribes_from_hub() {
        let hub = KeyboardHub::new();
        let mut input = InputManager::new(&hub);
        assert_eq!(hub.listener_count(), 1);

        input.destroy();
        assert_eq!(hub.listener_count(), 0);
        assert!(!input.is_subscribed());

        hub.key_down(ARROW_DOWN);
        assert!(!input.is_key_down(ARROW_DOWN));

        // Second destroy is harmless.
        input.destroy();
    }

    #[test]
    fn dropping_manager_releases_listener() {
        let hub = KeyboardHub::new();
        {
            let _input = InputManager::new(&hub);
            assert_eq!(hub.listener_count(), 1);
        }
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn managers_on_one_hub_do_not_share_state() {
        let hub = KeyboardHub::new();
        let first = InputManager::new(&hub);
        let mut second = InputManager::new(&hub);

        hub.key_down("a");
        assert!(first.is_key_down("a"));
        assert!(second.is_key_down("a"));

        second.destroy();
        hub.key_down("b");
        assert!(first.is_key_down("b"));
        assert!(!second.is_key_down("b"));
    }

    #[test]
    fn release_all_clears_every_listener() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        hub.key_down(ARROW_UP);
        hub.key_down(ARROW_LEFT);
        hub.release_all();
        assert!(input.held_keys().is_empty());
    }

    #[test]
    fn held_keys_are_sorted() {
        let hub = KeyboardHub::new();
        let input = InputManager::new(&hub);
        hub.key_down("b");
        hub.key_down("a");
        assert_eq!(input.held_keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
