pub mod csv_parser;
pub mod engine;
pub mod export;
pub mod pipeline;
pub mod run_log;
pub mod treatments;

pub use crate::domain::model::{BatchRun, BatchSummary, LogEntry, PipelineOutcome, Row};
pub use crate::domain::ports::{RtmApi, Storage};
pub use crate::utils::error::Result;
