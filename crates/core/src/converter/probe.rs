//! Metadata probing.
//!
//! Tags are read through an ordered list of [`TagSource`]s. The first source
//! that returns a non-empty set wins; failures are logged and the next source
//! is tried. A file without readable tags is converted without tags.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::types::RawTags;

/// A way of reading raw tags from a media file.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Returns the name of this source, for logs.
    fn name(&self) -> &str;

    /// Reads the raw tags of `path`.
    async fn read_tags(&self, path: &Path) -> Result<RawTags, ConverterError>;
}

/// Which parts of the ffprobe report to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSections {
    /// Only the format and stream tag entries.
    TagEntries,
    /// The full format and stream sections.
    FormatAndStreams,
}

/// Reads tags by running ffprobe with JSON output.
#[derive(Debug, Clone)]
pub struct FfprobeTagSource {
    ffprobe_path: PathBuf,
    timeout_secs: u64,
    sections: ProbeSections,
}

impl FfprobeTagSource {
    pub fn new(config: &ConverterConfig, sections: ProbeSections) -> Self {
        Self {
            ffprobe_path: config.ffprobe_path.clone(),
            timeout_secs: config.probe_timeout_secs,
            sections,
        }
    }

    fn args(&self) -> Vec<&'static str> {
        let mut args = vec!["-v", "quiet", "-print_format", "json"];
        match self.sections {
            ProbeSections::TagEntries => {
                args.extend(["-show_entries", "format_tags:stream_tags"]);
            }
            ProbeSections::FormatAndStreams => {
                args.extend(["-show_format", "-show_streams"]);
            }
        }
        args
    }
}

#[async_trait]
impl TagSource for FfprobeTagSource {
    fn name(&self) -> &str {
        match self.sections {
            ProbeSections::TagEntries => "ffprobe-tag-entries",
            ProbeSections::FormatAndStreams => "ffprobe-format-streams",
        }
    }

    async fn read_tags(&self, path: &Path) -> Result<RawTags, ConverterError> {
        if !path.exists() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let args = self.args();
        debug!(
            "Running {} {} {}",
            self.ffprobe_path.display(),
            args.join(" "),
            path.display()
        );

        let probe = Command::new(&self.ffprobe_path)
            .args(&args)
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = timeout(Duration::from_secs(self.timeout_secs), probe)
            .await
            .map_err(|_| ConverterError::Timeout {
                process: "ffprobe",
                timeout_secs: self.timeout_secs,
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe exited with code {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_tags(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extracts tags from ffprobe JSON output.
///
/// Tags are merged from `format.tags`, then the first stream's tags, then a
/// top-level `tags` object; later sources overwrite earlier ones.
pub fn parse_probe_tags(output: &str) -> Result<RawTags, ConverterError> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        #[serde(default)]
        format: Option<TagHolder>,
        #[serde(default)]
        streams: Vec<TagHolder>,
        #[serde(default)]
        tags: BTreeMap<String, serde_json::Value>,
    }

    #[derive(Deserialize)]
    struct TagHolder {
        #[serde(default)]
        tags: BTreeMap<String, serde_json::Value>,
    }

    let probe: ProbeOutput =
        serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
            reason: format!("Failed to parse ffprobe output: {}", e),
        })?;

    let mut raw = RawTags::new();
    let sections = probe
        .format
        .map(|f| f.tags)
        .into_iter()
        .chain(probe.streams.into_iter().next().map(|s| s.tags))
        .chain(std::iter::once(probe.tags));

    for tags in sections {
        for (key, value) in tags {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            raw.insert(key, value);
        }
    }

    Ok(raw)
}

/// Tries a list of tag sources in order.
pub struct TagReader {
    sources: Vec<Box<dyn TagSource>>,
}

impl TagReader {
    pub fn new(sources: Vec<Box<dyn TagSource>>) -> Self {
        Self { sources }
    }

    /// The default chain: a light tag-only probe, then a full probe.
    pub fn ffprobe(config: &ConverterConfig) -> Self {
        Self::new(vec![
            Box::new(FfprobeTagSource::new(config, ProbeSections::TagEntries)),
            Box::new(FfprobeTagSource::new(config, ProbeSections::FormatAndStreams)),
        ])
    }

    /// Returns the first non-empty tag set, or an empty set if every source
    /// failed or found nothing.
    pub async fn read(&self, path: &Path) -> RawTags {
        for source in &self.sources {
            match source.read_tags(path).await {
                Ok(tags) if !tags.is_empty() => {
                    debug!(
                        file = %path.display(),
                        source = source.name(),
                        ?tags,
                        "Read raw tags"
                    );
                    return tags;
                }
                Ok(_) => {
                    debug!(file = %path.display(), source = source.name(), "No tags found");
                }
                Err(e) => {
                    debug!(file = %path.display(), source = source.name(), error = %e, "Tag probe failed");
                }
            }
        }
        RawTags::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedSource {
        name: &'static str,
        result: Result<RawTags, String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TagSource for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn read_tags(&self, _path: &Path) -> Result<RawTags, ConverterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(ConverterError::probe_failed)
        }
    }

    fn tags(pairs: &[(&str, &str)]) -> RawTags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_format_and_stream_tags() {
        let json = r#"{
            "streams": [
                { "codec_type": "audio", "tags": { "TITLE": "Stream Title", "ARTIST": "Band" } },
                { "codec_type": "audio", "tags": { "TITLE": "Ignored" } }
            ],
            "format": {
                "format_name": "ogg",
                "tags": { "TITLE": "Format Title", "ALBUM": "Record" }
            }
        }"#;

        let raw = parse_probe_tags(json).unwrap();
        assert_eq!(raw.get("TITLE").map(String::as_str), Some("Stream Title"));
        assert_eq!(raw.get("ALBUM").map(String::as_str), Some("Record"));
        assert_eq!(raw.get("ARTIST").map(String::as_str), Some("Band"));
    }

    #[test]
    fn test_parse_without_tags() {
        let raw = parse_probe_tags(r#"{ "format": { "format_name": "ogg" } }"#).unwrap();
        assert!(raw.is_empty());
        let raw = parse_probe_tags("{}").unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn test_parse_non_string_values() {
        let raw = parse_probe_tags(r#"{ "tags": { "track": 7, "skip": null } }"#).unwrap();
        assert_eq!(raw.get("track").map(String::as_str), Some("7"));
        assert!(!raw.contains_key("skip"));
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_probe_tags("not json");
        assert!(matches!(result, Err(ConverterError::ParseError { .. })));
    }

    #[test]
    fn test_probe_args() {
        let config = ConverterConfig::default();
        let light = FfprobeTagSource::new(&config, ProbeSections::TagEntries);
        assert!(light.args().contains(&"format_tags:stream_tags"));
        let full = FfprobeTagSource::new(&config, ProbeSections::FormatAndStreams);
        assert!(full.args().contains(&"-show_streams"));
    }

    #[tokio::test]
    async fn test_reader_falls_back_on_error_and_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reader = TagReader::new(vec![
            Box::new(FixedSource {
                name: "broken",
                result: Err("boom".to_string()),
                calls: Arc::clone(&calls),
            }),
            Box::new(FixedSource {
                name: "empty",
                result: Ok(RawTags::new()),
                calls: Arc::clone(&calls),
            }),
            Box::new(FixedSource {
                name: "good",
                result: Ok(tags(&[("title", "Found")])),
                calls: Arc::clone(&calls),
            }),
            Box::new(FixedSource {
                name: "never",
                result: Ok(tags(&[("title", "Too late")])),
                calls: Arc::clone(&calls),
            }),
        ]);

        let raw = reader.read(Path::new("/a.ogg")).await;
        assert_eq!(raw.get("title").map(String::as_str), Some("Found"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_reader_returns_empty_when_nothing_found() {
        let reader = TagReader::new(vec![]);
        assert!(reader.read(Path::new("/a.ogg")).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_input_is_reported() {
        let source = FfprobeTagSource::new(&ConverterConfig::default(), ProbeSections::TagEntries);
        let result = source.read_tags(Path::new("/nonexistent/file.ogg")).await;
        assert!(matches!(result, Err(ConverterError::InputNotFound { .. })));
    }
}
