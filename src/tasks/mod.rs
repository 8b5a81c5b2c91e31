//! 開發工作環境 (`tasks.toml`)：安裝工具、lint、透傳指令與產生狀態報表

pub mod lint;
pub mod runner;
pub mod taskfile;

pub use runner::TaskRunner;
pub use taskfile::{EnvConfig, LintConfig, TaskFile};
