pub mod animation;
pub mod input;
pub mod model;
pub mod time;
