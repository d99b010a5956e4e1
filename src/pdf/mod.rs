//! Reading source PDFs

pub mod cache;
pub mod metadata;
pub mod reader;
pub mod repair;

// Re-export commonly used items
pub use cache::{CacheStats, DocumentCache};
pub use metadata::DocumentInfo;
pub use reader::{PageHandle, SourceDocument};
