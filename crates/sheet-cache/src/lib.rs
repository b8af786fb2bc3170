//! # Sheet Cache
//!
//! 問題簽章、評估緩存與簽章追蹤模組

pub mod evaluation_cache;
pub mod signature;
pub mod signature_tracking;

// Re-export 主要類型
pub use evaluation_cache::{CacheEntry, CacheStats, EvaluationCache};
pub use signature::{
    build_signature, create_cache_key, format_round_trip, normalize_mode, ProblemSignature,
};
pub use signature_tracking::{SignatureChange, SignatureTracker};
