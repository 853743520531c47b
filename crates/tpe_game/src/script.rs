//! Scripted keyboard input for headless runs.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tpe_core::input::KeyboardHub;
use tpe_platform::is_mapped_name;

#[derive(Debug, Deserialize, Clone)]
pub struct InputScript {
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScriptStep {
    /// Keys held for the whole step; everything else is released.
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl InputScript {
    /// No keys held for `frames` frames.
    pub fn idle(frames: u32) -> Self {
        Self {
            frame_ms: default_frame_ms(),
            steps: vec![ScriptStep {
                keys: Vec::new(),
                repeat: frames,
            }],
        }
    }

    /// Held keys per frame.
    pub fn expanded_frames(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        for step in &self.steps {
            for _ in 0..step.repeat.max(1) {
                out.push(step.keys.clone());
            }
        }
        out
    }
}

pub fn load_script_from_path(path: &Path) -> Result<InputScript, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let script: InputScript = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse input script JSON {}: {e}", path.display()))?;
    validate_script(&script)?;
    for step in &script.steps {
        for key in step.keys.iter().filter(|k| !is_mapped_name(k)) {
            log::warn!("Input script key '{key}' is not produced by any keyboard mapping");
        }
    }
    Ok(script)
}

fn validate_script(script: &InputScript) -> Result<(), String> {
    if !(script.frame_ms > 0.0) {
        return Err("Input script validation failed: frame_ms must be > 0".to_string());
    }
    if script.steps.is_empty() {
        return Err("Input script validation failed: steps list is empty".to_string());
    }
    Ok(())
}

/// Replays an expanded script into a keyboard hub one frame at a time,
/// sending only the transitions between consecutive frames.
pub struct ScriptPlayback {
    frames: Vec<Vec<String>>,
    cursor: usize,
    held: Vec<String>,
}

impl ScriptPlayback {
    pub fn new(script: &InputScript) -> Self {
        Self {
            frames: script.expanded_frames(),
            cursor: 0,
            held: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Apply the next frame's keys. Past the end every key is released and
    /// false is returned.
    pub fn advance(&mut self, hub: &KeyboardHub) -> bool {
        let next = self.frames.get(self.cursor).cloned().unwrap_or_default();
        for key in self.held.iter().filter(|k| !next.contains(k)) {
            hub.key_up(key);
        }
        for key in next.iter().filter(|k| !self.held.contains(k)) {
            hub.key_down(key);
        }
        self.held = next;
        let applied = self.cursor < self.frames.len();
        self.cursor += 1;
        applied
    }
}

const fn default_frame_ms() -> f64 {
    16.0
}

const fn default_repeat() -> u32 {
    1
}
