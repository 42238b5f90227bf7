//! Signal extraction.
//!
//! The insight comes from the text generator. Keywords and threat level
//! are randomized heuristics that ignore the generator's output, so two
//! identical inputs can yield different signals. The random source is
//! owned by the extractor and can be seeded.

use std::sync::{Arc, Mutex};

use chaos_harvester_core::config::LlmConfig;
use chaos_harvester_core::events::{Signals, ThreatLevel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{instrument, warn};

use crate::llm::{ChatMessage, CompletionRequest, TextGenerator};

/// System turn sent with every extraction
pub const SYSTEM_PROMPT: &str =
    "You are a paranoid AI embedded in a collapsing reality. Analyze the chaos for meaning.";

/// Prefix of the insight recorded when generation fails
pub const FAILURE_PREFIX: &str = "GPT failure: ";

/// Words must be strictly longer than this to be keyword candidates
pub const MIN_KEYWORD_CHARS: usize = 6;

/// Probability that a candidate word is kept
pub const KEYWORD_KEEP_PROBABILITY: f64 = 0.5;

/// Generation parameters sent with each request
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for ExtractionSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Pick keyword candidates from `text`.
///
/// Splits on whitespace, keeps words longer than six characters, then
/// keeps each survivor independently with probability one half. Order is
/// first-seen order.
pub fn extract_keywords<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Vec<String> {
    text.split_whitespace()
        .filter(|word| word.chars().count() > MIN_KEYWORD_CHARS)
        .filter(|_| rng.gen_bool(KEYWORD_KEEP_PROBABILITY))
        .map(str::to_string)
        .collect()
}

/// LLM-backed extractor for chaos signals
pub struct SignalExtractor {
    generator: Arc<dyn TextGenerator>,
    settings: ExtractionSettings,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for SignalExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalExtractor")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SignalExtractor {
    /// Create an extractor with an entropy-seeded random source
    pub fn new(generator: Arc<dyn TextGenerator>, settings: ExtractionSettings) -> Self {
        Self {
            generator,
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Pin the random source so keyword and threat draws are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Build the two-turn request for `text`
    pub fn completion_request(&self, text: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(text)],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// Extract signals from raw text. Never fails: generation errors are
    /// folded into the insight.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn extract(&self, text: &str) -> Signals {
        let request = self.completion_request(text);
        let insight = match self.generator.generate(&request).await {
            Ok(insight) => insight,
            Err(e) => {
                warn!(error = %e, "Text generation failed, recording failure insight");
                ::metrics::counter!("harvester_extraction_failures_total").increment(1);
                format!("{}{}", FAILURE_PREFIX, e)
            }
        };

        // A poisoned lock still holds a usable generator state.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let keywords = extract_keywords(text, &mut *rng);
        let threat_level = ThreatLevel::random(&mut *rng);

        Signals {
            insight,
            keywords,
            threat_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use async_trait::async_trait;

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::Connection("connection refused".to_string()))
        }
    }

    const CONTENT: &str = "anomalous quantumfluctuation detected everywhere";

    #[test]
    fn test_short_words_never_selected() {
        let mut rng = StdRng::seed_from_u64(1);
        let text = "a tiny sixsix sevenXX eight888 words here exactly";
        for _ in 0..100 {
            for word in extract_keywords(text, &mut rng) {
                assert!(word.chars().count() > MIN_KEYWORD_CHARS, "{} is too short", word);
            }
        }
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut rng = StdRng::seed_from_u64(3);
        // Six characters, twelve bytes.
        let text = "éééééé";
        for _ in 0..50 {
            assert!(extract_keywords(text, &mut rng).is_empty());
        }
    }

    #[test]
    fn test_keywords_keep_first_seen_order() {
        let mut rng = StdRng::seed_from_u64(11);
        let candidates = ["anomalous", "quantumfluctuation", "detected", "everywhere"];
        for _ in 0..100 {
            let keywords = extract_keywords(CONTENT, &mut rng);
            let positions: Vec<usize> = keywords
                .iter()
                .map(|k| candidates.iter().position(|c| c == k).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_selection_is_random() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut sizes = std::collections::HashSet::new();
        for _ in 0..200 {
            sizes.insert(extract_keywords(CONTENT, &mut rng).len());
        }
        assert!(sizes.contains(&0));
        assert!(sizes.contains(&4));
    }

    #[test]
    fn test_request_shape() {
        let extractor =
            SignalExtractor::new(Arc::new(FixedGenerator("x")), ExtractionSettings::default());
        let request = extractor.completion_request(CONTENT);

        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.max_tokens, 100);
        assert!((request.temperature - 1.2).abs() < f32::EPSILON);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0], ChatMessage::system(SYSTEM_PROMPT));
        assert_eq!(request.messages[1], ChatMessage::user(CONTENT));
    }

    #[tokio::test]
    async fn test_extract_uses_generated_insight() {
        let extractor = SignalExtractor::new(
            Arc::new(FixedGenerator("The static is a message.")),
            ExtractionSettings::default(),
        );

        let signals = extractor.extract(CONTENT).await;

        assert_eq!(signals.insight, "The static is a message.");
        assert!(ThreatLevel::ALL.contains(&signals.threat_level));
    }

    #[tokio::test]
    async fn test_generation_failure_becomes_insight() {
        let extractor =
            SignalExtractor::new(Arc::new(FailingGenerator), ExtractionSettings::default());

        let signals = extractor.extract(CONTENT).await;

        assert!(signals.insight.starts_with(FAILURE_PREFIX));
        assert!(signals.insight.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_seeded_extractors_agree() {
        let a = SignalExtractor::new(Arc::new(FixedGenerator("x")), ExtractionSettings::default())
            .with_seed(42);
        let b = SignalExtractor::new(Arc::new(FixedGenerator("x")), ExtractionSettings::default())
            .with_seed(42);

        for _ in 0..10 {
            assert_eq!(a.extract(CONTENT).await, b.extract(CONTENT).await);
        }
    }
}
