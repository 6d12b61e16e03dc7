//! Batch processor implementation.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::ConversionCandidate;
use crate::converter::{AudioFormat, Bitrate, ConversionJob, Converter};

use super::config::ProcessorConfig;
use super::types::{BatchProgress, BatchReport, BatchSnapshot, CandidateOutcome, ConversionOutcome};

/// Live counters of a batch.
#[derive(Debug, Default)]
pub struct BatchStats {
    active: AtomicUsize,
    processed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl BatchStats {
    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            active: self.active.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &ConversionOutcome) -> BatchSnapshot {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if outcome.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.snapshot()
    }

    fn reset(&self) {
        self.active.store(0, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

/// Marks a conversion as running for as long as it is alive.
struct ActiveSlot(Arc<BatchStats>);

impl ActiveSlot {
    fn enter(stats: &Arc<BatchStats>) -> Self {
        stats.active.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(stats))
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// What each conversion task needs, shared across the batch.
struct TaskContext<C> {
    converter: Arc<C>,
    stats: Arc<BatchStats>,
    progress_tx: Option<mpsc::Sender<BatchProgress>>,
    format: AudioFormat,
    bitrate: Bitrate,
    dry_run: bool,
}

/// Runs conversions for a list of candidates with bounded parallelism.
pub struct BatchProcessor<C: Converter> {
    config: ProcessorConfig,
    converter: Arc<C>,
    stats: Arc<BatchStats>,
}

impl<C: Converter + 'static> BatchProcessor<C> {
    /// Creates a new batch processor.
    pub fn new(config: ProcessorConfig, converter: C) -> Self {
        Self {
            config,
            converter: Arc::new(converter),
            stats: Arc::new(BatchStats::default()),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Current counters of the running (or last) batch.
    pub fn stats(&self) -> BatchSnapshot {
        self.stats.snapshot()
    }

    /// Converts every candidate and returns once all have finished or the
    /// batch was cancelled.
    ///
    /// Each candidate is converted independently; a failure or panic in one
    /// conversion is recorded as that candidate's outcome and does not affect
    /// the others. A conversion task is only spawned once a worker slot is
    /// free, so at most `max_parallel_conversions` tasks exist at a time. On
    /// cancellation no further conversions start and running ones are
    /// abandoned.
    pub async fn run(
        &self,
        candidates: Vec<ConversionCandidate>,
        cancel: CancellationToken,
        progress_tx: Option<mpsc::Sender<BatchProgress>>,
    ) -> BatchReport {
        let start = Instant::now();
        let total = candidates.len();
        let concurrency = self.config.max_parallel_conversions.max(1);
        self.stats.reset();

        info!(
            total,
            concurrency,
            dry_run = self.config.dry_run,
            "Starting conversion batch"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let context = Arc::new(TaskContext {
            converter: Arc::clone(&self.converter),
            stats: Arc::clone(&self.stats),
            progress_tx: progress_tx.clone(),
            format: self.config.target_format,
            bitrate: self.config.bitrate,
            dry_run: self.config.dry_run,
        });

        let mut pending = candidates.into_iter();
        let mut next = pending.next();
        let mut tasks: JoinSet<CandidateOutcome> = JoinSet::new();
        let mut outcomes = Vec::with_capacity(total);
        let mut cancelled = false;

        loop {
            if tasks.is_empty() && (cancelled || next.is_none()) {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled(), if !cancelled => {
                    warn!(
                        not_started = next.iter().count() + pending.len(),
                        "Batch cancelled, abandoning pending conversions"
                    );
                    cancelled = true;
                    tasks.abort_all();
                }

                joined = tasks.join_next(), if !tasks.is_empty() => {
                    let Some(joined) = joined else { continue };
                    match joined {
                        Ok(outcome) => {
                            let snapshot = self.stats.record(&outcome.outcome);
                            if let Some(ref tx) = progress_tx {
                                let _ = tx
                                    .send(BatchProgress::Finished {
                                        outcome: outcome.clone(),
                                        snapshot,
                                        total,
                                    })
                                    .await;
                            }
                            outcomes.push(outcome);
                        }
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => error!("Conversion task ended abnormally: {}", e),
                    }
                }

                permit = Arc::clone(&semaphore).acquire_owned(), if !cancelled && next.is_some() => {
                    let Ok(permit) = permit else { break };
                    if let Some(candidate) = next.take() {
                        tasks.spawn(run_candidate(Arc::clone(&context), candidate, permit));
                        next = pending.next();
                    }
                }
            }
        }

        let snapshot = self.stats.snapshot();
        let report = BatchReport {
            outcomes,
            total,
            processed: snapshot.processed,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            elapsed: start.elapsed(),
            cancelled,
        };

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis() as u64,
            files_per_second = report.files_per_second(),
            "Conversion batch finished"
        );

        report
    }
}

/// Converts one candidate, holding its worker slot until done.
async fn run_candidate<C: Converter>(
    context: Arc<TaskContext<C>>,
    candidate: ConversionCandidate,
    _permit: OwnedSemaphorePermit,
) -> CandidateOutcome {
    let _slot = ActiveSlot::enter(&context.stats);
    if let Some(ref tx) = context.progress_tx {
        let _ = tx.try_send(BatchProgress::Started {
            source: candidate.source.clone(),
            active: context.stats.active.load(Ordering::Relaxed),
        });
    }

    let outcome = if context.dry_run {
        debug!(file = %candidate.source.display(), "Dry run, skipping conversion");
        ConversionOutcome::Succeeded
    } else {
        let job = ConversionJob {
            input_path: candidate.source.clone(),
            output_path: candidate.output.clone(),
            format: context.format,
            bitrate: context.bitrate,
        };

        match AssertUnwindSafe(context.converter.convert(job))
            .catch_unwind()
            .await
        {
            Ok(Ok(report)) => {
                debug!(
                    file = %candidate.source.display(),
                    output = %report.output_path.display(),
                    size_bytes = report.output_size_bytes,
                    duration_ms = report.duration_ms,
                    tags = report.tags_written,
                    "Converted"
                );
                if report.tags_dropped {
                    warn!(file = %candidate.source.display(), "Converted without tags");
                }
                ConversionOutcome::Succeeded
            }
            Ok(Err(e)) => {
                warn!(file = %candidate.source.display(), error = %e, "Conversion failed");
                ConversionOutcome::Failed(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    file = %candidate.source.display(),
                    "Unexpected error during conversion: {}",
                    message
                );
                ConversionOutcome::Failed(format!("unexpected error: {}", message))
            }
        }
    };

    CandidateOutcome { candidate, outcome }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConverter;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::time::Duration;

    fn candidates(count: usize) -> Vec<ConversionCandidate> {
        (0..count)
            .map(|i| {
                ConversionCandidate::new(
                    format!("/music/track{:02}.ogg", i),
                    format!("/music/track{:02}.mp3", i),
                )
            })
            .collect()
    }

    fn processor(converter: MockConverter, concurrency: usize) -> BatchProcessor<MockConverter> {
        BatchProcessor::new(
            ProcessorConfig::default().with_max_conversions(concurrency),
            converter,
        )
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let converter = MockConverter::new();
        converter.set_delay(Duration::from_millis(30)).await;
        let processor = processor(converter, 3);

        let report = processor
            .run(candidates(12), CancellationToken::new(), None)
            .await;

        assert_eq!(report.processed, 12);
        assert_eq!(report.succeeded, 12);
        assert!(report.is_complete_success());
        let max = processor.converter().max_in_flight();
        assert!(max <= 3, "saw {} conversions at once", max);
        assert!(max >= 1);
        assert_eq!(processor.stats().active, 0);
    }

    #[tokio::test]
    async fn test_exactly_one_outcome_per_candidate() {
        let converter = MockConverter::new();
        converter.fail_on("/music/track03.ogg", "encoder exploded").await;
        let processor = processor(converter, 4);
        let input = candidates(8);

        let report = processor
            .run(input.clone(), CancellationToken::new(), None)
            .await;

        assert_eq!(report.outcomes.len(), 8);
        let seen: HashSet<PathBuf> = report
            .outcomes
            .iter()
            .map(|o| o.candidate.source.clone())
            .collect();
        let expected: HashSet<PathBuf> = input.iter().map(|c| c.source.clone()).collect();
        assert_eq!(seen, expected);
        assert_eq!(processor.converter().conversion_count().await, 8);
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_do_not_stop_the_batch() {
        let converter = MockConverter::new();
        converter.fail_on("/music/track01.ogg", "bad file").await;
        let processor = processor(converter, 2);

        let report = processor
            .run(candidates(4), CancellationToken::new(), None)
            .await;

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        assert!(!report.cancelled);
        assert!(!report.is_complete_success());

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].candidate.source,
            PathBuf::from("/music/track01.ogg")
        );
        match &failures[0].outcome {
            ConversionOutcome::Failed(reason) => assert!(reason.contains("bad file")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let converter = MockConverter::new();
        converter.panic_on("/music/track02.ogg").await;
        let processor = processor(converter, 2);

        let report = processor
            .run(candidates(5), CancellationToken::new(), None)
            .await;

        assert_eq!(report.processed, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 1);
        let failed = report.failures().next().unwrap();
        assert_eq!(failed.candidate.source, PathBuf::from("/music/track02.ogg"));
        match &failed.outcome {
            ConversionOutcome::Failed(reason) => assert!(reason.starts_with("unexpected error")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(processor.stats().active, 0);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_convert() {
        let converter = MockConverter::new();
        let processor = BatchProcessor::new(
            ProcessorConfig::default().with_dry_run(true),
            converter,
        );

        let report = processor
            .run(candidates(3), CancellationToken::new(), None)
            .await;

        assert_eq!(report.succeeded, 3);
        assert_eq!(processor.converter().conversion_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let processor = processor(MockConverter::new(), 2);
        let report = processor.run(Vec::new(), CancellationToken::new(), None).await;

        assert_eq!(report.total, 0);
        assert_eq!(report.processed, 0);
        assert!(report.is_complete_success());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let converter = MockConverter::new();
        let processor = processor(converter, 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = processor.run(candidates(5), cancel, None).await;

        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        assert!(!report.is_complete_success());
        assert_eq!(processor.converter().conversion_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_returns_promptly() {
        let converter = MockConverter::new();
        converter.set_delay(Duration::from_millis(200)).await;
        let processor = processor(converter, 1);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let report = processor.run(candidates(10), cancel, None).await;

        assert!(report.cancelled);
        assert!(report.processed < 10);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(processor.stats().active, 0);
    }

    #[tokio::test]
    async fn test_no_conversion_starts_after_cancel() {
        let converter = MockConverter::new();
        converter.set_delay(Duration::from_millis(100)).await;
        let processor = processor(converter, 2);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let report = processor.run(candidates(50), cancel, None).await;

        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        // Only the two conversions holding a slot were ever started.
        assert_eq!(processor.converter().max_in_flight(), 2);
        assert_eq!(processor.converter().conversion_count().await, 0);
    }

    #[tokio::test]
    async fn test_progress_events() {
        let processor = processor(MockConverter::new(), 2);
        let (tx, mut rx) = mpsc::channel(64);

        let report = processor
            .run(candidates(4), CancellationToken::new(), Some(tx))
            .await;

        let mut finished = 0;
        let mut last_processed = 0;
        while let Ok(event) = rx.try_recv() {
            if let BatchProgress::Finished {
                snapshot, total, ..
            } = event
            {
                finished += 1;
                assert_eq!(total, 4);
                assert!(snapshot.processed > last_processed);
                last_processed = snapshot.processed;
            }
        }
        assert_eq!(finished, report.processed);
        assert_eq!(last_processed, 4);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "task panicked");
    }
}
