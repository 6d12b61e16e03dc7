//! Converter module for transcoding audio files.
//!
//! This module provides the `Converter` trait and an FFmpeg implementation that
//! re-encodes a lossy source at a constant bit rate while carrying its tags
//! over.
//!
//! # Features
//!
//! - Constant bit rate encoding (bitrate, min rate and max rate pinned)
//! - Tag probing through an ordered list of ffprobe strategies
//! - Tag normalization (key mapping, track/disc/date formatting)
//! - One retry without tags when a tagged encode fails
//! - Atomic outputs: nothing is left at the output path on failure
//!
//! # Example
//!
//! ```ignore
//! use mp3cator_core::converter::{AudioFormat, Bitrate, ConversionJob, Converter, FfmpegConverter};
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! let report = converter
//!     .convert(ConversionJob {
//!         input_path: PathBuf::from("/music/album/01.ogg"),
//!         output_path: PathBuf::from("/music/album/01.mp3"),
//!         format: AudioFormat::Mp3,
//!         bitrate: "320k".parse()?,
//!     })
//!     .await?;
//! println!("Converted in {} ms", report.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod probe;
mod tags;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use probe::{parse_probe_tags, FfprobeTagSource, ProbeSections, TagReader, TagSource};
pub use tags::{format_date, format_track_number, normalize_tags};
pub use traits::Converter;
pub use types::{
    AudioFormat, Bitrate, ConversionJob, ConversionReport, InvalidBitrate, RawTags, TagSet,
    UnknownFormat,
};
