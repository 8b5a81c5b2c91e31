use crate::domain::status::PackagingStatus;
use crate::domain::version::Version;
use serde::Serialize;

/// 單一專案在各來源中的版本
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRecord {
    pub name: String,
    pub package_name: String,
    pub release: Version,
    pub upper_constraint: Option<String>,
    pub rpm_packaging: Option<Version>,
    pub obs_published: Option<Version>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    #[serde(flatten)]
    pub record: ProjectRecord,
    pub status: PackagingStatus,
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub release: String,
    pub rows: Vec<StatusRow>,
    pub include_obs: bool,
    pub format: OutputFormat,
    pub rendered: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
    Csv,
    Json,
}

/// 缺少的版本以 "0" 顯示
pub fn display_version(version: Option<&Version>) -> String {
    version.map_or_else(|| "0".to_string(), Version::to_string)
}

/// 沒有 upper-constraints 時以 "-" 顯示
pub fn display_upper_constraint(uc: Option<&str>) -> String {
    uc.unwrap_or("-").to_string()
}
