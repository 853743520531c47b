//! Frame scheduling: the host calls [`GameLoop::on_refresh`] once per display
//! refresh and the loop forwards the elapsed milliseconds to its callback while
//! it is running.
//!
//! The loop does not own a thread or timer. "Registering for the next refresh"
//! is the host's job; a stopped loop simply ignores refreshes, so stop/start
//! cycles never leave a stale callback behind.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;
const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

/// Millisecond time source used to stamp the loop's start.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests and headless runs. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) -> f64 {
        let next = self.now.get() + ms;
        self.now.set(next);
        next
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub frame_count: u64,
    pub last_delta_ms: f64,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

pub struct GameLoop<F: FnMut(f64)> {
    callback: F,
    clock: Box<dyn Clock>,
    running: bool,
    last_time_ms: f64,
    frame_count: u64,
    last_delta_ms: f64,
    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    smoothed_frame_time_ms: f64,
}

impl<F: FnMut(f64)> GameLoop<F> {
    pub fn new(callback: F) -> Self {
        Self::with_clock(callback, Box::new(SystemClock::new()))
    }

    pub fn with_clock(callback: F, clock: Box<dyn Clock>) -> Self {
        Self {
            callback,
            clock,
            running: false,
            last_time_ms: 0.0,
            frame_count: 0,
            last_delta_ms: 0.0,
            fps_samples: [NOMINAL_FRAME_MS; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_frame_time_ms: NOMINAL_FRAME_MS,
        }
    }

    /// Begin forwarding refreshes. No-op while already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_time_ms = self.clock.now_ms();
        log::debug!("Game loop started at {:.1}ms", self.last_time_ms);
    }

    /// Stop forwarding refreshes. Idempotent.
    pub fn stop(&mut self) {
        if self.running {
            log::debug!("Game loop stopped after {} frames", self.frame_count);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Host display refresh at `timestamp_ms` (same time base as the clock).
    /// Returns whether the callback ran.
    pub fn on_refresh(&mut self, timestamp_ms: f64) -> bool {
        if !self.running {
            return false;
        }
        // A refresh can be stamped slightly before start() on some hosts.
        let delta_ms = (timestamp_ms - self.last_time_ms).max(0.0);
        self.last_time_ms = timestamp_ms;
        self.record_frame(delta_ms);
        (self.callback)(delta_ms);
        true
    }

    pub fn stats(&self) -> FrameStats {
        let smoothed_fps = if self.smoothed_frame_time_ms > 0.0 {
            1000.0 / self.smoothed_frame_time_ms
        } else {
            0.0
        };
        FrameStats {
            frame_count: self.frame_count,
            last_delta_ms: self.last_delta_ms,
            smoothed_fps,
            smoothed_frame_time_ms: self.smoothed_frame_time_ms,
        }
    }

    fn record_frame(&mut self, delta_ms: f64) {
        self.frame_count += 1;
        self.last_delta_ms = delta_ms;
        self.fps_samples[self.fps_sample_index] = delta_ms;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        self.smoothed_frame_time_ms =
            self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
    }
}
