pub mod config;
pub mod core;
pub mod domain;
pub mod tasks;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{engine::StatusEngine, pipeline::StatusPipeline};
pub use domain::model::{OutputFormat, ProjectRecord, StatusReport};
pub use domain::status::PackagingStatus;
pub use domain::version::Version;
pub use utils::error::{Result, StatusError};
