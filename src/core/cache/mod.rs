pub mod content;
pub mod memo;

pub use content::{key_for, CacheStats, ClearResult, ContentCache, DEFAULT_TTL};
pub use memo::{MemoCache, ScriptCache, SourceListCache};
