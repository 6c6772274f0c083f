//! Hosted model-inference endpoint integration.

pub mod client;
pub mod types;

pub use client::InferenceClient;
pub use types::{GenerationParams, InferenceError};
