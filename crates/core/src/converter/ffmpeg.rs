//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::probe::TagReader;
use super::tags::normalize_tags;
use super::traits::Converter;
use super::types::{ConversionJob, ConversionReport, TagSet};

/// ffmpeg stderr lines that mean the input itself could not be read.
static DECODE_ERROR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(invalid data found when processing input|could not find codec parameters|error while decoding|header missing|end of file|no such file or directory|failed to read)",
    )
    .expect("decode error pattern is valid")
});

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
    tag_reader: TagReader,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        let tag_reader = TagReader::ffprobe(&config);
        Self { config, tag_reader }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Replaces the metadata strategies.
    pub fn with_tag_reader(mut self, tag_reader: TagReader) -> Self {
        self.tag_reader = tag_reader;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Returns the configured executables that cannot be started.
    pub async fn missing_dependencies(&self) -> Result<Vec<String>, ConverterError> {
        let mut missing = Vec::new();

        for path in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            let status = Command::new(path)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await;

            match status {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    missing.push(path.display().to_string());
                }
                Err(e) => return Err(ConverterError::Io(e)),
            }
        }

        Ok(missing)
    }

    /// Builds ffmpeg arguments for a constant bit rate encode.
    fn build_args(&self, job: &ConversionJob, output_path: &Path, tags: &TagSet) -> Vec<String> {
        let bitrate = job.bitrate.to_string();

        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            // Drop cover art streams and inherited metadata; only normalized
            // tags end up in the output.
            "-vn".to_string(),
            "-map_metadata".to_string(),
            "-1".to_string(),
        ];

        args.extend([
            "-c:a".to_string(),
            job.format.ffmpeg_codec().to_string(),
            "-b:a".to_string(),
            bitrate.clone(),
            "-minrate".to_string(),
            bitrate.clone(),
            "-maxrate".to_string(),
            bitrate,
        ]);

        for (key, value) in tags {
            args.extend(["-metadata".to_string(), format!("{}={}", key, value)]);
        }

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // The output name carries a temporary suffix, so the muxer is explicit.
        args.extend(["-f".to_string(), job.format.ffmpeg_muxer().to_string()]);
        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Runs one ffmpeg encode into `output_path`.
    async fn encode(
        &self,
        job: &ConversionJob,
        output_path: &Path,
        tags: &TagSet,
    ) -> Result<(), ConverterError> {
        let args = self.build_args(job, output_path, tags);
        debug!(
            "Running {} {}",
            self.config.ffmpeg_path.display(),
            args.join(" ")
        );

        let encode = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = timeout(Duration::from_secs(self.config.encode_timeout_secs), encode)
            .await
            .map_err(|_| ConverterError::Timeout {
                process: "ffmpeg",
                timeout_secs: self.config.encode_timeout_secs,
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(classify_failure(
            &job.input_path,
            output.status.code(),
            stderr,
        ))
    }

    async fn run_conversion(&self, job: &ConversionJob) -> Result<ConversionReport, ConverterError> {
        let start = Instant::now();

        if !job.input_path.exists() {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| {
                ConverterError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }

        let raw = self.tag_reader.read(&job.input_path).await;
        let tags = normalize_tags(&raw);
        debug!(file = %job.input_path.display(), ?tags, "Normalized tags");

        let partial = PartialOutput::new(&job.output_path);

        let (tags_written, tags_dropped) = match self.encode(job, partial.path(), &tags).await {
            Ok(()) => (tags.len(), false),
            Err(e) if tags.is_empty() || !retry_without_tags(&e) => return Err(e),
            Err(e) => {
                warn!(
                    file = %job.input_path.display(),
                    error = %e,
                    "Tagged encode failed, retrying without tags"
                );
                self.encode(job, partial.path(), &TagSet::new()).await?;
                (0, true)
            }
        };

        let output_meta = tokio::fs::metadata(partial.path())
            .await
            .map_err(|_| ConverterError::conversion_failed("Output file not created", None))?;

        partial.commit(&job.output_path).await?;

        Ok(ConversionReport {
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            tags_written,
            tags_dropped,
        })
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let missing = self.missing_dependencies().await?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConverterError::DependenciesMissing { missing })
        }
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionReport, ConverterError> {
        self.run_conversion(&job).await
    }
}

/// Turns a failed ffmpeg exit into a decode or encode error.
fn classify_failure(input: &Path, code: Option<i32>, stderr: String) -> ConverterError {
    let stderr = (!stderr.is_empty()).then_some(stderr);

    if stderr
        .as_deref()
        .is_some_and(|s| DECODE_ERROR_PATTERN.is_match(s))
    {
        return ConverterError::DecodeFailed {
            path: input.to_path_buf(),
            stderr,
        };
    }

    ConverterError::conversion_failed(format!("FFmpeg exited with code: {:?}", code), stderr)
}

/// Whether an encode failure is worth repeating without tags.
fn retry_without_tags(error: &ConverterError) -> bool {
    !error.is_decode_failure()
        && !matches!(
            error,
            ConverterError::Timeout { .. } | ConverterError::FfmpegNotFound { .. }
        )
}

/// A temporary output file, removed on drop unless committed.
struct PartialOutput {
    path: PathBuf,
    committed: bool,
}

impl PartialOutput {
    fn new(output: &Path) -> Self {
        let mut name = OsString::from(output.as_os_str());
        name.push(".part");
        Self {
            path: PathBuf::from(name),
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn commit(mut self, target: &Path) -> Result<(), ConverterError> {
        tokio::fs::rename(&self.path, target).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
