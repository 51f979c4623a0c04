// src/config/mod.rs
pub mod ai;
pub mod app;
pub mod feeds;

pub use ai::AiConfig;
pub use app::PipelineSettings;
pub use feeds::FeedRegistry;
