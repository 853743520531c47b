//! Injectable diagnostics. The engine reports to one [`DiagnosticsHook`]
//! instead of publishing its scene through a global handle.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tpe_core::time::FrameStats;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSnapshot {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub animation: String,
    pub frame_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: String,
    pub kind: String,
    pub x: i32,
    pub y: i32,
    pub has_sprite: bool,
}

/// Plain-data copy of what the scene holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneSnapshot {
    pub map_id: Option<String>,
    pub tile_size: f32,
    pub characters: Vec<CharacterSnapshot>,
    pub entities: Vec<EntitySnapshot>,
}

impl SceneSnapshot {
    pub fn player(&self) -> Option<&CharacterSnapshot> {
        self.characters.first()
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize scene snapshot: {e}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RenderStats {
    pub draw_calls: u64,
    pub character_count: usize,
    pub entity_count: usize,
}

pub trait DiagnosticsHook {
    /// After a successful engine init.
    fn scene_ready(&mut self, _snapshot: &SceneSnapshot) {}
    /// After each rendered frame.
    fn frame_end(&mut self, _stats: &FrameStats, _render: &RenderStats) {}
}

#[derive(Debug, Default)]
pub struct NoopDiagnostics;

impl DiagnosticsHook for NoopDiagnostics {}

/// Both hooks see every report, first `A` then `B`.
impl<A: DiagnosticsHook, B: DiagnosticsHook> DiagnosticsHook for (A, B) {
    fn scene_ready(&mut self, snapshot: &SceneSnapshot) {
        self.0.scene_ready(snapshot);
        self.1.scene_ready(snapshot);
    }

    fn frame_end(&mut self, stats: &FrameStats, render: &RenderStats) {
        self.0.frame_end(stats, render);
        self.1.frame_end(stats, render);
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    snapshot: Option<SceneSnapshot>,
    stats: Option<FrameStats>,
    render: Option<RenderStats>,
    frames: u64,
}

/// Records the latest reports. Clones share the recording, so a test can
/// hand one clone to the engine and inspect another.
#[derive(Debug, Clone, Default)]
pub struct SceneProbe {
    state: Rc<RefCell<ProbeState>>,
}

impl SceneProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<SceneSnapshot> {
        self.state.borrow().snapshot.clone()
    }

    pub fn frame_stats(&self) -> Option<FrameStats> {
        self.state.borrow().stats
    }

    pub fn render_stats(&self) -> Option<RenderStats> {
        self.state.borrow().render
    }

    pub fn frames_seen(&self) -> u64 {
        self.state.borrow().frames
    }
}

impl DiagnosticsHook for SceneProbe {
    fn scene_ready(&mut self, snapshot: &SceneSnapshot) {
        self.state.borrow_mut().snapshot = Some(snapshot.clone());
    }

    fn frame_end(&mut self, stats: &FrameStats, render: &RenderStats) {
        let mut state = self.state.borrow_mut();
        state.stats = Some(*stats);
        state.render = Some(*render);
        state.frames += 1;
    }
}
