pub mod fallback;
pub mod loader;
pub mod source;

pub use loader::{AssetLoadResult, AssetLoader, CacheStats, LoadOptions, MAX_RETRIES};
pub use source::{decode_data_url, FsImageSource, ImageFuture, ImageSource};
