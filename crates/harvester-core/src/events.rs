//! Chaos event types.
//!
//! A [`ChaosPayload`] arrives over HTTP, its source tag is checked against
//! the [`ChaosSource`] allow-list, the extractor turns its content into
//! [`Signals`], and the result is persisted as a [`ChaosEvent`].

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Separator used when flattening keywords into a stored row
pub const KEYWORD_SEPARATOR: &str = ", ";

// =============================================================================
// SOURCES
// =============================================================================

/// Recognized chaos source tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosSource {
    WebScrapes,
    Darkfeeds,
    InternalLogs,
    RandomNoiseFeeds,
    DreamLeaks,
    QuantumFluctuations,
    HallucinatedMemories,
}

impl ChaosSource {
    /// The full allow-list
    pub const ALL: [ChaosSource; 7] = [
        ChaosSource::WebScrapes,
        ChaosSource::Darkfeeds,
        ChaosSource::InternalLogs,
        ChaosSource::RandomNoiseFeeds,
        ChaosSource::DreamLeaks,
        ChaosSource::QuantumFluctuations,
        ChaosSource::HallucinatedMemories,
    ];

    /// Wire tag for this source
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebScrapes => "web_scrapes",
            Self::Darkfeeds => "darkfeeds",
            Self::InternalLogs => "internal_logs",
            Self::RandomNoiseFeeds => "random_noise_feeds",
            Self::DreamLeaks => "dream_leaks",
            Self::QuantumFluctuations => "quantum_fluctuations",
            Self::HallucinatedMemories => "hallucinated_memories",
        }
    }

    /// Look up a tag in the allow-list. Matching is exact and case-sensitive.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|source| source.as_str() == tag)
    }
}

impl fmt::Display for ChaosSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChaosSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::validation(format!("Unknown chaos source: {}", s)))
    }
}

// =============================================================================
// THREAT LEVELS
// =============================================================================

/// Randomly assigned severity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Moderate,
    High,
    Apocalyptic,
}

impl ThreatLevel {
    /// Every threat level
    pub const ALL: [ThreatLevel; 4] = [
        ThreatLevel::Low,
        ThreatLevel::Moderate,
        ThreatLevel::High,
        ThreatLevel::Apocalyptic,
    ];

    /// Uniform draw over [`ThreatLevel::ALL`]. Content plays no part in it.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Apocalyptic => "apocalyptic",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown threat level: {}", s)))
    }
}

// =============================================================================
// PAYLOADS AND EVENTS
// =============================================================================

/// Inbound submission.
///
/// `source` stays a raw string so that unknown tags reach allow-list
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaosPayload {
    /// Claimed source tag
    pub source: String,
    /// Raw text to analyze
    pub content: String,
}

impl ChaosPayload {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Output of signal extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    /// Model-generated insight, or a `GPT failure: ...` placeholder
    pub insight: String,
    /// Heuristically selected words, first-seen order
    pub keywords: Vec<String>,
    /// Random severity label
    pub threat_level: ThreatLevel,
}

/// A stored chaos event. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosEvent {
    /// UUID assigned at ingestion
    pub id: String,
    /// Allow-listed source tag
    pub source: String,
    /// Extracted insight text
    pub insight: String,
    /// Keywords joined with [`KEYWORD_SEPARATOR`]
    pub keywords: String,
    /// One of `low`, `moderate`, `high`, `apocalyptic`
    pub threat_level: String,
}

impl ChaosEvent {
    /// Build the row written for an ingested payload
    pub fn from_signals(id: impl Into<String>, source: ChaosSource, signals: &Signals) -> Self {
        Self {
            id: id.into(),
            source: source.as_str().to_string(),
            insight: signals.insight.clone(),
            keywords: signals.keywords.join(KEYWORD_SEPARATOR),
            threat_level: signals.threat_level.as_str().to_string(),
        }
    }

    /// Split the stored keyword column back into words
    pub fn keyword_list(&self) -> Vec<&str> {
        if self.keywords.is_empty() {
            return Vec::new();
        }
        self.keywords.split(KEYWORD_SEPARATOR).collect()
    }
}
