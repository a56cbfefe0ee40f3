// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod corpus;
pub mod filters;
pub mod metrics;
pub mod normalize;
pub mod parse_ai;
pub mod ratelimit;
pub mod search;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;
pub use crate::corpus::{CorpusHandle, ProgramRecord};
pub use crate::filters::QueryFilters;
pub use crate::search::{search, SearchResultPage};
