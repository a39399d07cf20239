//! Service layer for feed-service
//!
//! The generation pipeline runs sources → scoring → diversity →
//! realtime inside one request; feedback runs on its own path and only
//! meets the pipeline through the signal store.

pub mod diversity;
pub mod feedback;
pub mod pipeline;
pub mod realtime;
pub mod scoring;
pub mod sources;

pub use diversity::Diversifier;
pub use feedback::{FeedbackHandle, FeedbackRecorder};
pub use pipeline::FeedPipeline;
pub use realtime::RealtimeAdapter;
pub use scoring::ScoringEngine;
pub use sources::{CandidateAggregator, CandidateSource, ContentClient, SourceRequest};
