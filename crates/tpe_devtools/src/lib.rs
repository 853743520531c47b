pub mod diagnostics;
pub mod overlay;

pub use diagnostics::{
    CharacterSnapshot, DiagnosticsHook, EntitySnapshot, NoopDiagnostics, RenderStats,
    SceneProbe, SceneSnapshot,
};
pub use overlay::DebugOverlay;
