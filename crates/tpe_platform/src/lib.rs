pub mod keyboard;

pub use keyboard::{is_mapped_name, key_name, KeyForwarder};
