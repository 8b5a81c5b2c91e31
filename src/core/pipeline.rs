use crate::core::render::{render, RenderContext};
use crate::core::sources::{
    find_rpm_packaging_version, highest_release_version, list_deliverables, load_obs_listing,
    load_upper_constraints, spec_path,
};
use crate::core::{ConfigProvider, Pipeline, ProjectRecord, StatusReport, Storage};
use crate::domain::model::StatusRow;
use crate::domain::status::PackagingStatus;
use crate::utils::error::Result;
use reqwest::Client;
use std::collections::BTreeMap;
use std::io::Write;

pub struct StatusPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> StatusPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }

    fn is_included(&self, project: &str) -> bool {
        let include = self.config.include_projects();
        include.is_empty() || include.iter().any(|p| p == project)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for StatusPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<ProjectRecord>> {
        let config = &self.config;

        let upper_constraints =
            load_upper_constraints(&self.storage, config.requirements_dir()).await?;
        let deliverables =
            list_deliverables(&self.storage, config.releases_dir(), config.release()).await?;
        tracing::info!(
            "📋 Found {} deliverables for release {}",
            deliverables.len(),
            config.release()
        );

        let obs_listing = match config.obs_published_xml() {
            Some(location) => load_obs_listing(&self.storage, &self.client, location).await?,
            None => None,
        };

        let mut records = Vec::new();
        for (project, path) in deliverables {
            // 有指定 include 清單時略過其他專案
            if !self.is_included(&project) {
                continue;
            }

            let content = self.storage.read_file(&path).await?;
            let Some(release) = highest_release_version(&project, &String::from_utf8_lossy(&content))?
            else {
                tracing::warn!("⚠️ {} has no valid release version, skipping", project);
                continue;
            };

            let package_name = config
                .project_mapping()
                .get(&project)
                .cloned()
                .unwrap_or_else(|| project.clone());

            let rpm_packaging = find_rpm_packaging_version(
                &self.storage,
                &spec_path(config.rpm_packaging_dir(), &package_name),
            )
            .await?;

            let obs_published = obs_listing.as_ref().and_then(|listing| {
                let distro_name = config.package_name_rules().module_to_package(&project);
                listing.find_version(&distro_name)
            });

            tracing::debug!(
                "{}: release={} rpm-packaging={:?}",
                project,
                release,
                rpm_packaging.as_ref().map(ToString::to_string)
            );

            records.push(ProjectRecord {
                upper_constraint: upper_constraints.get(&project).cloned(),
                name: project,
                package_name,
                release,
                rpm_packaging,
                obs_published,
            });
        }

        for wanted in config.include_projects() {
            if !records.iter().any(|r| &r.name == wanted) {
                tracing::warn!("⚠️ Requested project '{}' not found in deliverables", wanted);
            }
        }

        Ok(records)
    }

    async fn transform(&self, records: Vec<ProjectRecord>) -> Result<StatusReport> {
        let mut rows: Vec<StatusRow> = records
            .into_iter()
            .map(|record| {
                let status = PackagingStatus::evaluate(&record);
                StatusRow { record, status }
            })
            .collect();
        rows.sort_by(|a, b| a.record.name.cmp(&b.record.name));

        let mut summary: BTreeMap<&'static str, usize> = BTreeMap::new();
        for row in &rows {
            *summary.entry(row.status.as_str()).or_default() += 1;
        }
        for (status, count) in &summary {
            tracing::info!("   {}: {}", status, count);
        }

        let include_obs = self.config.obs_published_xml().is_some();
        let format = self.config.output_format();
        let rendered = render(
            &RenderContext {
                release: self.config.release(),
                rows: &rows,
                include_obs,
                generated_at: chrono::Utc::now(),
            },
            format,
        )?;

        Ok(StatusReport {
            release: self.config.release().to_string(),
            rows,
            include_obs,
            format,
            rendered,
        })
    }

    async fn load(&self, report: StatusReport) -> Result<String> {
        match self.config.output_file() {
            Some(path) => {
                tracing::debug!("Writing {} bytes to {}", report.rendered.len(), path);
                self.storage
                    .write_file(path, report.rendered.as_bytes())
                    .await?;
                Ok(path.to_string())
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(report.rendered.as_bytes())?;
                stdout.flush()?;
                Ok("stdout".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::OutputFormat;
    use crate::domain::rpm::PackageNameRules;
    use crate::utils::error::StatusError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                StatusError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let prefix = format!("{}/", path);
            let mut names: Vec<String> = files
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .map(|rest| rest.split('/').next().unwrap_or(rest).to_string())
                .collect();
            names.sort();
            names.dedup();
            Ok(names)
        }

        async fn exists(&self, path: &str) -> bool {
            let files = self.files.lock().await;
            let prefix = format!("{}/", path);
            files.keys().any(|k| k == path || k.starts_with(&prefix))
        }
    }

    struct MockConfig {
        release: String,
        include_projects: Vec<String>,
        obs_published_xml: Option<String>,
        format: OutputFormat,
        output: Option<String>,
        mapping: HashMap<String, String>,
        rules: PackageNameRules,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                release: "newton".to_string(),
                include_projects: vec![],
                obs_published_xml: None,
                format: OutputFormat::Text,
                output: Some("html/index.html".to_string()),
                mapping: crate::config::default_project_mapping(),
                rules: PackageNameRules::default(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn releases_dir(&self) -> &str {
            "releases"
        }

        fn rpm_packaging_dir(&self) -> &str {
            "rpm-packaging"
        }

        fn requirements_dir(&self) -> &str {
            "requirements"
        }

        fn release(&self) -> &str {
            &self.release
        }

        fn obs_published_xml(&self) -> Option<&str> {
            self.obs_published_xml.as_deref()
        }

        fn include_projects(&self) -> &[String] {
            &self.include_projects
        }

        fn output_format(&self) -> OutputFormat {
            self.format
        }

        fn output_file(&self) -> Option<&str> {
            self.output.as_deref()
        }

        fn project_mapping(&self) -> &HashMap<String, String> {
            &self.mapping
        }

        fn package_name_rules(&self) -> &PackageNameRules {
            &self.rules
        }
    }

    async fn seeded_storage() -> MockStorage {
        let storage = MockStorage::default();
        storage
            .put(
                "requirements/upper-constraints.txt",
                "nova===14.0.0\nkeystoneauth===2.12.1\nglance===13.0.0\n",
            )
            .await;
        storage
            .put(
                "releases/deliverables/newton/nova.yaml",
                "releases:\n  - version: 14.0.0\n  - version: 14.0.1\n",
            )
            .await;
        storage
            .put(
                "releases/deliverables/newton/keystoneauth.yaml",
                "releases:\n  - version: 2.12.1\n",
            )
            .await;
        storage
            .put(
                "releases/deliverables/newton/glance.yml",
                "releases:\n  - version: 13.0.0\n",
            )
            .await;
        storage
            .put("releases/deliverables/newton/README.rst", "not a deliverable")
            .await;
        storage
            .put(
                "rpm-packaging/openstack/nova/nova.spec.j2",
                "Name: openstack-nova\nVersion: 14.0.0\n",
            )
            .await;
        storage
            .put(
                "rpm-packaging/openstack/keystoneauth1/keystoneauth1.spec.j2",
                "Version: 2.12.1\n",
            )
            .await;
        storage
    }

    #[tokio::test]
    async fn test_extract_reads_all_sources() {
        let storage = seeded_storage().await;
        let pipeline = StatusPipeline::new(storage, MockConfig::new());

        let records = pipeline.extract().await.unwrap();

        assert_eq!(records.len(), 3);
        let by_name: HashMap<&str, &ProjectRecord> =
            records.iter().map(|r| (r.name.as_str(), r)).collect();

        let nova = by_name["nova"];
        assert_eq!(nova.release.to_string(), "14.0.1");
        assert_eq!(nova.upper_constraint.as_deref(), Some("14.0.0"));
        assert_eq!(nova.rpm_packaging.as_ref().unwrap().to_string(), "14.0.0");

        let keystoneauth = by_name["keystoneauth"];
        assert_eq!(keystoneauth.package_name, "keystoneauth1");
        assert!(keystoneauth.rpm_packaging.is_some());

        assert!(by_name["glance"].rpm_packaging.is_none());
    }

    #[tokio::test]
    async fn test_include_projects_filter() {
        let storage = seeded_storage().await;
        let mut config = MockConfig::new();
        config.include_projects = vec!["glance".to_string(), "missing".to_string()];
        let pipeline = StatusPipeline::new(storage, config);

        let records = pipeline.extract().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "glance");
    }

    #[tokio::test]
    async fn test_unknown_release_is_config_error() {
        let storage = seeded_storage().await;
        let mut config = MockConfig::new();
        config.release = "zed".to_string();
        let pipeline = StatusPipeline::new(storage, config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, StatusError::ConfigError { .. }));
    }

    #[tokio::test]
    async fn test_missing_obs_file_keeps_column() {
        let storage = seeded_storage().await;
        let mut config = MockConfig::new();
        config.obs_published_xml = Some("does-not-exist.xml".to_string());
        let pipeline = StatusPipeline::new(storage, config);

        let records = pipeline.extract().await.unwrap();
        assert!(records.iter().all(|r| r.obs_published.is_none()));

        let report = pipeline.transform(records).await.unwrap();
        assert!(report.include_obs);
        assert!(report.rendered.contains("| obs |"));
    }

    #[tokio::test]
    async fn test_transform_sorts_and_evaluates() {
        let storage = seeded_storage().await;
        let pipeline = StatusPipeline::new(storage, MockConfig::new());

        let records = pipeline.extract().await.unwrap();
        let report = pipeline.transform(records).await.unwrap();

        let names: Vec<&str> = report.rows.iter().map(|r| r.record.name.as_str()).collect();
        assert_eq!(names, vec!["glance", "keystoneauth", "nova"]);
        assert_eq!(report.rows[0].status, PackagingStatus::NeedsPackaging);
        assert_eq!(report.rows[1].status, PackagingStatus::Perfect);
        assert_eq!(report.rows[2].status, PackagingStatus::NeedsUpgrade);
    }

    #[tokio::test]
    async fn test_load_writes_output_file() {
        let storage = seeded_storage().await;
        let mut config = MockConfig::new();
        config.format = OutputFormat::Html;
        let pipeline = StatusPipeline::new(storage.clone(), config);

        let records = pipeline.extract().await.unwrap();
        let report = pipeline.transform(records).await.unwrap();
        let location = pipeline.load(report).await.unwrap();

        assert_eq!(location, "html/index.html");
        let html = String::from_utf8(storage.get_file("html/index.html").await.unwrap()).unwrap();
        assert!(html.contains("<td style=\"background-color:LightYellow\">needs upgrade</td>"));
    }
}
