//! Text debug overlay. Produces the same read-outs a HUD would show and
//! writes them to the log every `interval` frames while visible.

use tpe_core::time::FrameStats;

use crate::diagnostics::{DiagnosticsHook, RenderStats, SceneSnapshot};

pub fn overlay_lines(time: &FrameStats, render: Option<&RenderStats>) -> Vec<String> {
    let mut lines = vec![
        format!("FPS: {:.1}", time.smoothed_fps),
        format!("Frame time: {:.2} ms", time.smoothed_frame_time_ms),
        format!("Frame: {}", time.frame_count),
    ];
    if let Some(render) = render {
        lines.push(format!("Draw calls: {}", render.draw_calls));
        lines.push(format!("Characters: {}", render.character_count));
        lines.push(format!("Entities: {}", render.entity_count));
    }
    lines
}

pub struct DebugOverlay {
    pub visible: bool,
    interval: u64,
    last_lines: Vec<String>,
}

impl DebugOverlay {
    pub fn new(interval: u64) -> Self {
        Self {
            visible: true,
            interval: interval.max(1),
            last_lines: Vec::new(),
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn last_lines(&self) -> &[String] {
        &self.last_lines
    }
}

impl DiagnosticsHook for DebugOverlay {
    fn scene_ready(&mut self, snapshot: &SceneSnapshot) {
        log::info!(
            "Scene ready: map {:?}, {} characters, {} entities",
            snapshot.map_id,
            snapshot.characters.len(),
            snapshot.entities.len()
        );
    }

    fn frame_end(&mut self, stats: &FrameStats, render: &RenderStats) {
        if !self.visible || stats.frame_count % self.interval != 0 {
            return;
        }
        self.last_lines = overlay_lines(stats, Some(render));
        log::info!("{}", self.last_lines.join(" | "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(frame_count: u64) -> FrameStats {
        FrameStats {
            frame_count,
            last_delta_ms: 16.0,
            smoothed_fps: 62.5,
            smoothed_frame_time_ms: 16.0,
        }
    }

    #[test]
    fn lines_include_render_stats_when_present() {
        let render = RenderStats {
            draw_calls: 12,
            character_count: 1,
            entity_count: 3,
        };
        let lines = overlay_lines(&stats(5), Some(&render));
        assert_eq!(lines[0], "FPS: 62.5");
        assert!(lines.contains(&"Draw calls: 12".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Entities: 3"));
        assert_eq!(overlay_lines(&stats(5), None).len(), 3);
    }

    #[test]
    fn reports_only_on_interval_while_visible() {
        let mut overlay = DebugOverlay::new(10);
        overlay.frame_end(&stats(9), &RenderStats::default());
        assert!(overlay.last_lines().is_empty());
        overlay.frame_end(&stats(10), &RenderStats::default());
        assert_eq!(overlay.last_lines()[2], "Frame: 10");

        overlay.toggle();
        overlay.frame_end(&stats(20), &RenderStats::default());
        assert_eq!(overlay.last_lines()[2], "Frame: 10");
    }
}
