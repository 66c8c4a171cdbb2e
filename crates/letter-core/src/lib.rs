//! Letter Core Library
//!
//! Business logic for the waste collection letter generator: recipient
//! queries, letter rendering, staging, PDF conversion and merging, and the
//! run log.

pub mod config;
pub mod db;
pub mod error;
pub mod letters;
pub mod paths;
pub mod pdf;
pub mod pipeline;
pub mod status;

// Re-export main types for easy access
pub use config::LetterConfig;
pub use error::{LetterError, Result};

pub use db::{LetterSource, LetterStore, QuerySet};
pub use letters::{DocumentWriter, LetterRenderer, RenderedDocument, StagedFile};
pub use paths::StagingLayout;
pub use pdf::{BatchMerger, MergedBatch, PdfConverter};
pub use pipeline::{run_and_record, run_letters, LetterPipeline, PipelineOptions};
pub use status::RunLog;
