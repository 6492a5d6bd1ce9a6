pub mod settings;

pub use settings::{
    CacheConfig, ExtractorConfig, LlmConfig, ServerConfig, Settings, SummaryConfig, SummaryMode,
    TriggerMatch,
};
