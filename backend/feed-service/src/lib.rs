pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;

pub use cache::{CacheConfig, FeedCache};
pub use config::Config;
pub use error::{AppError, Result};

// Re-export the pipeline components
pub use services::{
    CandidateAggregator, CandidateSource, Diversifier, FeedPipeline, FeedbackHandle,
    FeedbackRecorder, RealtimeAdapter, ScoringEngine, SourceRequest,
};
