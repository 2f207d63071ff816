pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
#[cfg(feature = "proxy")]
pub mod proxy;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::RtmConfig;

pub use adapters::{http::HttpRtmApi, storage::LocalStorage};
pub use crate::core::{
    csv_parser::{parse_csv, CsvOptions, CsvTable},
    engine::{BatchEngine, BatchReport},
    pipeline::RowPipelineRunner,
};
pub use utils::error::{Result, RtmError};
