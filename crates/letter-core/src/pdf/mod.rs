//! PDF conversion and batch merging

pub mod convert;
pub mod merge;

pub use convert::PdfConverter;
pub use merge::{BatchMerger, MergedBatch};
