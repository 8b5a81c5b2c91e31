use crate::domain::model::{OutputFormat, ProjectRecord, StatusReport};
use crate::domain::rpm::PackageNameRules;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 目錄內的項目名稱 (已排序)
    fn list_dir(&self, path: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn releases_dir(&self) -> &str;
    fn rpm_packaging_dir(&self) -> &str;
    fn requirements_dir(&self) -> &str;
    fn release(&self) -> &str;
    fn obs_published_xml(&self) -> Option<&str>;
    fn include_projects(&self) -> &[String];
    fn output_format(&self) -> OutputFormat;
    fn output_file(&self) -> Option<&str>;
    fn project_mapping(&self) -> &HashMap<String, String>;
    fn package_name_rules(&self) -> &PackageNameRules;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ProjectRecord>>;
    async fn transform(&self, records: Vec<ProjectRecord>) -> Result<StatusReport>;
    async fn load(&self, report: StatusReport) -> Result<String>;
}
