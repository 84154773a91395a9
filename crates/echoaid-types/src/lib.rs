//! Shared types for the EchoAid voice relay.
//!
//! This crate holds the values that cross crate boundaries: the inbound
//! audio clip, the aggregated turn result returned to the browser, and the
//! stage labels used when logging a pipeline run.

pub mod turn;

pub use turn::{AudioClip, TurnResult, TurnStage, DEFAULT_AUDIO_CONTENT_TYPE};
