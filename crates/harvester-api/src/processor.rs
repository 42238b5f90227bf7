//! Background processing of accepted chaos payloads.
//!
//! Each accepted ingestion becomes one tokio task that extracts signals,
//! writes one row and prints a summary. The ingestion endpoint drops the
//! returned [`ProcessingHandle`], so the client never learns whether the
//! row was written. Callers that care can await the handle or subscribe
//! to [`ProcessingReport`]s.

use std::fmt;
use std::sync::Arc;

use chaos_harvester_core::events::{ChaosEvent, ChaosPayload, ChaosSource, Signals};
use chaos_harvester_extraction::SignalExtractor;
use chaos_harvester_storage::EventStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

/// Capacity of the report channel. Slow subscribers miss old reports.
const REPORT_CHANNEL_CAPACITY: usize = 256;

/// How a background job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The row was written
    Stored(ChaosEvent),
    /// The row was not written
    Failed(String),
}

/// Completion notice for one event id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingReport {
    pub event_id: String,
    pub outcome: ProcessingOutcome,
}

impl ProcessingReport {
    pub fn is_stored(&self) -> bool {
        matches!(self.outcome, ProcessingOutcome::Stored(_))
    }
}

/// Handle to a scheduled job. Dropping it detaches the job.
#[derive(Debug)]
pub struct ProcessingHandle {
    event_id: String,
    task: JoinHandle<ProcessingReport>,
}

impl ProcessingHandle {
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> ProcessingReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => ProcessingReport {
                event_id: self.event_id,
                outcome: ProcessingOutcome::Failed(format!("Background task aborted: {}", e)),
            },
        }
    }
}

/// Runs extraction and persistence for accepted payloads
#[derive(Clone)]
pub struct Processor {
    extractor: Arc<SignalExtractor>,
    store: Arc<dyn EventStore>,
    reports: broadcast::Sender<ProcessingReport>,
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("extractor", &self.extractor)
            .field("subscribers", &self.reports.receiver_count())
            .finish_non_exhaustive()
    }
}

impl Processor {
    pub fn new(extractor: Arc<SignalExtractor>, store: Arc<dyn EventStore>) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            extractor,
            store,
            reports,
        }
    }

    /// Receive a report for every job that finishes after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingReport> {
        self.reports.subscribe()
    }

    /// Spawn one background job. Returns immediately.
    pub fn schedule(
        &self,
        payload: ChaosPayload,
        source: ChaosSource,
        event_id: String,
    ) -> ProcessingHandle {
        let processor = self.clone();
        let id = event_id.clone();
        let task = tokio::spawn(async move { processor.process(payload, source, id).await });

        ProcessingHandle { event_id, task }
    }

    /// Extract, persist and report. Persistence is attempted once.
    #[instrument(skip(self, payload), fields(event_id = %event_id, source = %source))]
    pub async fn process(
        &self,
        payload: ChaosPayload,
        source: ChaosSource,
        event_id: String,
    ) -> ProcessingReport {
        let signals = self.extractor.extract(&payload.content).await;
        let event = ChaosEvent::from_signals(event_id.clone(), source, &signals);

        let outcome = match self.store.insert(&event).await {
            Ok(()) => {
                ::metrics::counter!("harvester_events_stored_total").increment(1);
                info!(threat_level = %signals.threat_level, "Chaos event stored");
                println!("{}", summary_block(&event, &signals));
                ProcessingOutcome::Stored(event)
            }
            Err(e) => {
                ::metrics::counter!("harvester_storage_errors_total").increment(1);
                error!(error = %e, "Failed to store chaos event");
                ProcessingOutcome::Failed(e.to_string())
            }
        };

        let report = ProcessingReport { event_id, outcome };
        // No subscribers is the normal case.
        let _ = self.reports.send(report.clone());
        report
    }
}

/// Operator-facing summary printed after a successful write
pub fn summary_block(event: &ChaosEvent, signals: &Signals) -> String {
    format!(
        "\nCHAOS EVENT [{}]\n\u{250c} Source: {}\n\u{251c} Threat Level: {}\n\u{251c} Insight: {}\n\u{2514} Keywords: {:?}\n",
        event.id, event.source, signals.threat_level, signals.insight, signals.keywords
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chaos_harvester_core::events::ThreatLevel;
    use chaos_harvester_core::{Error, Result};
    use chaos_harvester_extraction::{
        CompletionRequest, ExtractionSettings, LlmError, TextGenerator, FAILURE_PREFIX,
    };
    use chaos_harvester_storage::SqliteEventStore;
    use tempfile::TempDir;

    struct Oracle;

    #[async_trait]
    impl TextGenerator for Oracle {
        async fn generate(
            &self,
            _request: &CompletionRequest,
        ) -> std::result::Result<String, LlmError> {
            Ok("Entropy is rising.".to_string())
        }
    }

    struct Silence;

    #[async_trait]
    impl TextGenerator for Silence {
        async fn generate(
            &self,
            _request: &CompletionRequest,
        ) -> std::result::Result<String, LlmError> {
            Err(LlmError::Authentication("invalid api key".to_string()))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl EventStore for BrokenStore {
        async fn insert(&self, _event: &ChaosEvent) -> Result<()> {
            Err(Error::storage("database is locked"))
        }
        async fn list(&self) -> Result<Vec<ChaosEvent>> {
            Ok(vec![])
        }
        async fn get(&self, _id: &str) -> Result<Option<ChaosEvent>> {
            Ok(None)
        }
        async fn count(&self) -> Result<u64> {
            Ok(0)
        }
        async fn health_check(&self) -> Result<()> {
            Err(Error::storage("database is locked"))
        }
    }

    fn test_processor(
        generator: Arc<dyn TextGenerator>,
    ) -> (TempDir, Processor, Arc<SqliteEventStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteEventStore::open(dir.path().join("chaos.db")).unwrap());
        let extractor = Arc::new(SignalExtractor::new(generator, ExtractionSettings::default()));
        (dir, Processor::new(extractor, store.clone()), store)
    }

    fn payload() -> ChaosPayload {
        ChaosPayload::new("darkfeeds", "anomalous quantumfluctuation detected everywhere")
    }

    #[tokio::test]
    async fn test_process_stores_event() {
        let (_dir, processor, store) = test_processor(Arc::new(Oracle));

        let report = processor
            .process(payload(), ChaosSource::Darkfeeds, "evt-1".to_string())
            .await;

        assert!(report.is_stored());
        let stored = store.get("evt-1").await.unwrap().expect("row written");
        assert_eq!(stored.source, "darkfeeds");
        assert_eq!(stored.insight, "Entropy is rising.");
        assert!(stored.threat_level.parse::<ThreatLevel>().is_ok());
    }

    #[tokio::test]
    async fn test_generation_failure_still_stores_row() {
        let (_dir, processor, store) = test_processor(Arc::new(Silence));

        processor
            .process(payload(), ChaosSource::Darkfeeds, "evt-2".to_string())
            .await;

        let stored = store.get("evt-2").await.unwrap().unwrap();
        assert!(stored.insight.starts_with(FAILURE_PREFIX));
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported_not_raised() {
        let extractor = Arc::new(SignalExtractor::new(
            Arc::new(Oracle),
            ExtractionSettings::default(),
        ));
        let processor = Processor::new(extractor, Arc::new(BrokenStore));

        let report = processor
            .process(payload(), ChaosSource::DreamLeaks, "evt-3".to_string())
            .await;

        assert_eq!(report.event_id, "evt-3");
        assert!(matches!(
            report.outcome,
            ProcessingOutcome::Failed(ref reason) if reason.contains("locked")
        ));
    }

    #[tokio::test]
    async fn test_schedule_publishes_report() {
        let (_dir, processor, _store) = test_processor(Arc::new(Oracle));
        let mut reports = processor.subscribe();

        let handle = processor.schedule(payload(), ChaosSource::WebScrapes, "evt-4".to_string());
        assert_eq!(handle.event_id(), "evt-4");

        let published = reports.recv().await.unwrap();
        let awaited = handle.wait().await;
        assert_eq!(published, awaited);
        assert!(awaited.is_stored());
    }

    #[tokio::test]
    async fn test_duplicate_id_fails_second_job() {
        let (_dir, processor, store) = test_processor(Arc::new(Oracle));

        let first = processor
            .process(payload(), ChaosSource::Darkfeeds, "dup".to_string())
            .await;
        let second = processor
            .process(payload(), ChaosSource::InternalLogs, "dup".to_string())
            .await;

        assert!(first.is_stored());
        assert!(!second.is_stored());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[test]
    fn test_summary_block() {
        let signals = Signals {
            insight: "They know.".to_string(),
            keywords: vec!["anomalous".to_string()],
            threat_level: ThreatLevel::Apocalyptic,
        };
        let event = ChaosEvent::from_signals("evt-5", ChaosSource::Darkfeeds, &signals);

        let block = summary_block(&event, &signals);

        assert!(block.contains("CHAOS EVENT [evt-5]"));
        assert!(block.contains("Source: darkfeeds"));
        assert!(block.contains("Threat Level: apocalyptic"));
        assert!(block.contains("Keywords: [\"anomalous\"]"));
    }
}
