pub mod llm_service;
pub mod session_cache;
pub mod summary;

pub use llm_service::{LlmProvider, LlmService};
pub use session_cache::{Clock, ManualClock, SessionStore, SystemClock};
pub use summary::SummaryController;
