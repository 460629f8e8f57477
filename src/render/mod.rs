/// Bitmap lists produced by backends.
pub mod bitmap;
pub(crate) mod cache;

pub use cache::CacheStats;
