//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{ConversionJob, ConversionReport, Converter, ConverterError};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Fail or panic on chosen input paths
/// - Simulate conversion time
/// - Optionally write the output file, so a second scan sees it as converted
/// - Track how many conversions ran at the same time
///
/// Clones share state, so a test can keep a handle after moving the mock into
/// a processor.
///
/// # Example
///
/// ```rust,ignore
/// use mp3cator_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.fail_on("/music/broken.ogg", "corrupt").await;
/// converter.set_write_outputs(true).await;
///
/// let processor = BatchProcessor::new(config, converter.clone());
/// let report = processor.run(candidates, CancellationToken::new(), None).await;
///
/// assert_eq!(converter.conversion_count().await, report.processed);
/// ```
#[derive(Debug, Clone)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// Input paths that fail, with the failure reason.
    failures: Arc<RwLock<HashMap<PathBuf, String>>>,
    /// Input paths whose conversion panics.
    panics: Arc<RwLock<HashSet<PathBuf>>>,
    /// Simulated conversion duration in milliseconds.
    conversion_duration_ms: Arc<RwLock<u64>>,
    /// Whether successful conversions create the output file.
    write_outputs: Arc<RwLock<bool>>,
    /// Executables reported missing by `validate`.
    missing_dependencies: Arc<RwLock<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts a conversion as running until dropped.
struct InFlight<'a>(&'a MockConverter);

impl<'a> InFlight<'a> {
    fn enter(mock: &'a MockConverter) -> Self {
        let now = mock.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        mock.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(mock)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockConverter {
    /// Create a new mock converter. Conversions complete immediately.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            panics: Arc::new(RwLock::new(HashSet::new())),
            conversion_duration_ms: Arc::new(RwLock::new(0)),
            write_outputs: Arc::new(RwLock::new(false)),
            missing_dependencies: Arc::new(RwLock::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Clear recorded conversions.
    pub async fn clear_recorded(&self) {
        self.conversions.write().await.clear();
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Make conversions of `path` fail with `reason`.
    pub async fn fail_on(&self, path: impl AsRef<Path>, reason: impl Into<String>) {
        self.failures
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), reason.into());
    }

    /// Make conversions of `path` panic.
    pub async fn panic_on(&self, path: impl AsRef<Path>) {
        self.panics.write().await.insert(path.as_ref().to_path_buf());
    }

    /// Set the simulated conversion duration.
    pub async fn set_delay(&self, duration: Duration) {
        *self.conversion_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Write a small file at the output path of each successful conversion.
    pub async fn set_write_outputs(&self, enabled: bool) {
        *self.write_outputs.write().await = enabled;
    }

    /// Report these executables as missing from `validate`.
    pub async fn set_missing_dependencies(&self, missing: Vec<String>) {
        *self.missing_dependencies.write().await = missing;
    }

    /// Highest number of conversions seen running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let missing = self.missing_dependencies.read().await.clone();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConverterError::DependenciesMissing { missing })
        }
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionReport, ConverterError> {
        let _in_flight = InFlight::enter(self);

        let duration_ms = *self.conversion_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        let failure = self.failures.read().await.get(&job.input_path).cloned();
        let success = failure.is_none();
        self.conversions.write().await.push(RecordedConversion {
            job: job.clone(),
            success,
        });

        let should_panic = self.panics.read().await.contains(&job.input_path);
        if should_panic {
            panic!("mock converter panic for {}", job.input_path.display());
        }

        if let Some(reason) = failure {
            return Err(ConverterError::conversion_failed(reason, None));
        }

        let mut output_size_bytes = 0;
        if *self.write_outputs.read().await {
            if let Some(parent) = job.output_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let contents = b"mock audio";
            tokio::fs::write(&job.output_path, contents).await?;
            output_size_bytes = contents.len() as u64;
        }

        Ok(ConversionReport {
            output_path: job.output_path,
            output_size_bytes,
            duration_ms,
            tags_written: 0,
            tags_dropped: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{AudioFormat, Bitrate};
    use tempfile::TempDir;

    fn create_test_job(input: &str, output: impl Into<PathBuf>) -> ConversionJob {
        ConversionJob {
            input_path: PathBuf::from(input),
            output_path: output.into(),
            format: AudioFormat::Mp3,
            bitrate: Bitrate::DEFAULT,
        }
    }

    #[tokio::test]
    async fn test_basic_conversion() {
        let converter = MockConverter::new();

        let report = converter
            .convert(create_test_job("/in/a.ogg", "/out/a.mp3"))
            .await
            .unwrap();

        assert_eq!(report.output_path, PathBuf::from("/out/a.mp3"));
        assert_eq!(converter.conversion_count().await, 1);
        assert_eq!(converter.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let converter = MockConverter::new();
        converter.fail_on("/in/bad.ogg", "test error").await;

        let result = converter
            .convert(create_test_job("/in/bad.ogg", "/out/bad.mp3"))
            .await;
        assert!(matches!(result, Err(ConverterError::ConversionFailed { .. })));

        converter
            .convert(create_test_job("/in/good.ogg", "/out/good.mp3"))
            .await
            .unwrap();

        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 2);
        assert!(!conversions[0].success);
        assert!(conversions[1].success);
    }

    #[tokio::test]
    async fn test_writes_outputs_when_enabled() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nested").join("a.mp3");
        let converter = MockConverter::new();
        converter.set_write_outputs(true).await;

        let report = converter
            .convert(create_test_job("/in/a.ogg", output.clone()))
            .await
            .unwrap();

        assert!(output.exists());
        assert_eq!(report.output_size_bytes, 10);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let converter = MockConverter::new();
        let handle = converter.clone();
        converter.clear_recorded().await;

        converter
            .convert(create_test_job("/in/a.ogg", "/out/a.mp3"))
            .await
            .unwrap();

        assert_eq!(handle.conversion_count().await, 1);
    }

    #[test]
    fn test_validate_reports_missing() {
        let converter = MockConverter::new();
        tokio_test::block_on(async {
            assert!(converter.validate().await.is_ok());
            converter
                .set_missing_dependencies(vec!["ffprobe".to_string()])
                .await;
            let result = converter.validate().await;
            assert!(matches!(
                result,
                Err(ConverterError::DependenciesMissing { ref missing }) if missing.len() == 1 && missing[0] == "ffprobe"
            ));
        });
    }
}
