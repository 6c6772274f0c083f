#![deny(missing_docs)]

//! Core library for the mediascribe server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Hosted model-inference endpoint clients.
pub mod inference;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline activity counters.
pub mod metrics;
/// Media processing pipeline: frames, captions, documents, summaries, QA.
pub mod pipeline;
/// Bounded exponential backoff with jitter for remote calls.
pub mod retry;
