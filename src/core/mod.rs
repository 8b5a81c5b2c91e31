pub mod engine;
pub mod pipeline;
pub mod render;
pub mod sources;

pub use crate::domain::model::{ProjectRecord, StatusReport};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
