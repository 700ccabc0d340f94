//! Async raster tile fetching: URL templates, a shared download worker and
//! per-source LRU caches

pub mod cache;
pub mod loader;
pub mod source;

// Re-exports for convenience
pub use cache::TileCache;
pub use loader::{TileLoader, TileLoaderConfig, TileResult};
pub use source::{TileSource, TileUrlTemplate};
