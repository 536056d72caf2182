//! Text summarization over HTTP with a pretrained encoder-decoder model.
//!
//! The model is loaded once and moved onto the [`SummarizerEngine`]'s
//! inference thread. HTTP handlers from [`server::router`] validate requests,
//! resolve generation parameters from the active [`Profile`] and wait for the
//! engine's answer.

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod messages;
pub mod model;
pub mod pipeline;
pub mod profile;
pub mod server;
pub mod t5;

pub use engine::{EngineState, SummarizerEngine};
pub use error::{ApiError, SummarizeError};
pub use model::{GenerationParams, Seq2SeqModel};
pub use profile::{LengthOverrides, Profile};
