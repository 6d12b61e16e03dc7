//! Processor module for running a batch of conversions.
//!
//! The `BatchProcessor` hands every candidate to a `Converter` with bounded
//! parallelism:
//! - A semaphore limits how many conversions run at once
//! - Outcomes are collected as they complete, in any order
//! - Live counters are kept in atomics and reported over a channel
//! - Cancellation stops new conversions and abandons running ones
//!
//! # Example
//!
//! ```ignore
//! use mp3cator_core::processor::{BatchProcessor, ProcessorConfig};
//! use mp3cator_core::converter::FfmpegConverter;
//! use tokio_util::sync::CancellationToken;
//!
//! let processor = BatchProcessor::new(
//!     ProcessorConfig::default().with_max_conversions(4),
//!     FfmpegConverter::with_defaults(),
//! );
//!
//! let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel(100);
//! tokio::spawn(async move {
//!     while let Some(progress) = progress_rx.recv().await {
//!         println!("Progress: {:?}", progress);
//!     }
//! });
//!
//! let report = processor
//!     .run(scan.candidates, CancellationToken::new(), Some(progress_tx))
//!     .await;
//! println!("{}/{} converted", report.succeeded, report.total);
//! ```

mod batch;
mod config;
mod types;

pub use batch::{BatchProcessor, BatchStats};
pub use config::{default_concurrency, ProcessorConfig};
pub use types::{BatchProgress, BatchReport, BatchSnapshot, CandidateOutcome, ConversionOutcome};
