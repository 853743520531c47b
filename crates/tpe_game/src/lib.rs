pub mod engine;
pub mod scene;
pub mod script;

pub use engine::{load_config_from_path, EngineConfig, EngineState, GameEngine};
pub use scene::{Scene, SceneCharacter, CHARACTER_SIZE, MOVE_SPEED_PX_PER_MS};
pub use script::{load_script_from_path, InputScript, ScriptPlayback, ScriptStep};
