//! Merging matched notification/ZEPB pairs.

pub mod pipeline;
pub mod register;

pub use pipeline::{MergeEvent, MergeOptions, MergePipeline, MergeSummary, concat_documents};
pub use register::{CsvRegisterWriter, RegisterWriter};
