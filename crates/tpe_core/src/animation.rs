//! Looping frame-animation state machine.
//!
//! Every animation plays at a fixed [`FRAME_DURATION_MS`] per frame and always
//! loops. The state only stores *which* animation is active and where in it we
//! are; the frame lists themselves belong to the sprite record, so the state is
//! advanced by passing the active list's length to [`AnimationState::tick`].

/// Display time of one animation frame, in milliseconds.
pub const FRAME_DURATION_MS: f64 = 100.0;

/// Animation a fresh sprite instance starts in.
pub const DEFAULT_ANIMATION: &str = "idle";

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub current: String,
    /// Position within the current animation's frame list (not a sheet index).
    pub frame_index: usize,
    pub elapsed_ms: f64,
}

impl AnimationState {
    pub fn new(animation: &str) -> Self {
        Self {
            current: animation.to_string(),
            frame_index: 0,
            elapsed_ms: 0.0,
        }
    }

    /// Advance by `dt_ms`. Each whole frame duration consumed moves one frame
    /// forward; the remainder carries into the next tick. `frame_count` is the
    /// length of the active animation (0 when the sprite does not define it).
    pub fn tick(&mut self, dt_ms: f64, frame_count: usize) {
        self.elapsed_ms += dt_ms.max(0.0);
        let steps = (self.elapsed_ms / FRAME_DURATION_MS).floor();
        if steps < 1.0 {
            return;
        }
        self.elapsed_ms -= steps * FRAME_DURATION_MS;

        if frame_count == 0 {
            self.frame_index = 0;
            return;
        }
        let advance = (steps as u64 % frame_count as u64) as usize;
        self.frame_index = (self.frame_index + advance) % frame_count;
    }

    /// Switch to `animation` if it differs from the current one and is
    /// `defined`. Switching restarts at frame 0 with no carried time.
    /// Returns whether a switch happened.
    pub fn switch_to(&mut self, animation: &str, defined: bool) -> bool {
        if self.current == animation || !defined {
            return false;
        }
        self.current = animation.to_string();
        self.frame_index = 0;
        self.elapsed_ms = 0.0;
        true
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new(DEFAULT_ANIMATION)
    }
}
