pub mod catalog;
pub mod config;
pub mod converter;
pub mod policy;
pub mod postcheck;
pub mod processor;
pub mod testing;

pub use catalog::{CandidateScan, Catalog, CatalogError, ConversionCandidate};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ConversionSettings,
};
pub use converter::{
    AudioFormat, Bitrate, ConversionJob, ConversionReport, Converter, ConverterConfig,
    ConverterError, FfmpegConverter,
};
pub use policy::{compute_output_path, to_camel_case, OutputPolicy, PathPlanner};
pub use postcheck::{DeletionOutcome, PostCheck, PostCheckReport};
pub use processor::{
    default_concurrency, BatchProcessor, BatchProgress, BatchReport, CandidateOutcome,
    ConversionOutcome, ProcessorConfig,
};
