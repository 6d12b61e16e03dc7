//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionReport};

/// A converter that can transcode a single audio file.
///
/// Implementations read the source metadata themselves and write it into the
/// output, so callers only describe where the file comes from and goes to.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Checks that everything the converter needs is available.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// Converts one file. The parent directory of the output is created if
    /// needed. On failure no file is left at the output path.
    async fn convert(&self, job: ConversionJob) -> Result<ConversionReport, ConverterError>;
}
