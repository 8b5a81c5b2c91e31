pub mod cli;
pub mod toml_config;

use std::collections::HashMap;

#[cfg(feature = "cli")]
use crate::domain::model::OutputFormat;
#[cfg(feature = "cli")]
use crate::domain::ports::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::rpm::PackageNameRules;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

/// 預設的專案名稱修正
pub fn default_project_mapping() -> HashMap<String, String> {
    HashMap::from([("keystoneauth".to_string(), "keystoneauth1".to_string())])
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, clap::Parser)]
#[command(name = "rpm-packaging-status")]
#[command(about = "Compare rpm-packaging with OpenStack releases")]
pub struct CliConfig {
    /// Base directory of the openstack/releases git repo
    #[arg(value_name = "RELEASES_GIT_DIR", env = "RELEASES")]
    pub releases_dir: String,

    /// Base directory of the openstack/rpm-packaging git repo
    #[arg(value_name = "RPM_PACKAGING_GIT_DIR", env = "RPM_PACKAGING")]
    pub rpm_packaging_dir: String,

    /// Base directory of the openstack/requirements git repo
    #[arg(value_name = "REQUIREMENTS_GIT_DIR", env = "REQUIREMENTS")]
    pub requirements_dir: String,

    /// Name of the release, e.g. "mitaka"
    #[arg(env = "RELEASE")]
    pub release: String,

    /// Path or http(s) URL of a published listing from the Open Build Service
    #[arg(long)]
    pub obs_published_xml: Option<String>,

    /// If non-empty, only the given projects will be checked
    #[arg(long, num_args = 0.., value_name = "PROJECT_NAME")]
    pub include_projects: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the report to this file instead of stdout (parent directories are created)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Optional TOML file with project mappings and package name rules
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(skip = default_project_mapping())]
    pub project_mapping: HashMap<String, String>,

    #[arg(skip)]
    pub package_rules: PackageNameRules,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 合併 `--config` 檔案；命令列參數優先
    pub fn resolve(mut self) -> Result<Self> {
        if self.project_mapping.is_empty() {
            self.project_mapping = default_project_mapping();
        }

        let Some(path) = self.config.clone() else {
            return Ok(self);
        };

        tracing::info!("📁 Loading configuration from: {}", path);
        let file = TomlConfig::from_file(&path)?;
        file.validate()?;
        self.merge(file)
    }

    pub fn merge(mut self, file: TomlConfig) -> Result<Self> {
        self.package_rules = file.package_name_rules()?;
        self.project_mapping.extend(file.projects.mapping.clone());

        if self.include_projects.is_empty() {
            self.include_projects = file.projects.include.clone();
        }
        if self.obs_published_xml.is_none() {
            self.obs_published_xml = file.obs_published_xml().map(str::to_string);
        }
        Ok(self)
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("releases_dir", &self.releases_dir)?;
        validation::validate_path("rpm_packaging_dir", &self.rpm_packaging_dir)?;
        validation::validate_path("requirements_dir", &self.requirements_dir)?;
        validation::validate_non_empty_string("release", &self.release)?;

        // release 會被拼進路徑
        if self.release.contains(['/', '\\']) || self.release.starts_with('.') {
            return Err(crate::utils::error::StatusError::InvalidConfigValueError {
                field: "release".to_string(),
                value: self.release.clone(),
                reason: "Release name must be a plain series name".to_string(),
            });
        }

        if let Some(location) = &self.obs_published_xml {
            validation::validate_location("obs_published_xml", location)?;
        }
        if let Some(output) = &self.output {
            validation::validate_path("output", output)?;
        }
        for project in &self.include_projects {
            validation::validate_non_empty_string("include_projects", project)?;
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn releases_dir(&self) -> &str {
        &self.releases_dir
    }

    fn rpm_packaging_dir(&self) -> &str {
        &self.rpm_packaging_dir
    }

    fn requirements_dir(&self) -> &str {
        &self.requirements_dir
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
        &self.project_mapping
    }

    fn package_name_rules(&self) -> &PackageNameRules {
        &self.package_rules
    }
}
