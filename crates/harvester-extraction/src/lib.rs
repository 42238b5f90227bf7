//! # Chaos Harvester Extraction
//!
//! Turns raw chaos text into [`Signals`](chaos_harvester_core::events::Signals):
//! - [`llm`]: client for the external text-generation API
//! - [`extractor`]: combines the generated insight with randomized heuristics

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod extractor;
pub mod llm;

pub use extractor::{extract_keywords, ExtractionSettings, SignalExtractor, FAILURE_PREFIX};
pub use llm::{ChatMessage, CompletionRequest, LlmError, OpenAiClient, TextGenerator};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::extractor::{ExtractionSettings, SignalExtractor};
    pub use crate::llm::{CompletionRequest, LlmError, OpenAiClient, TextGenerator};
}
