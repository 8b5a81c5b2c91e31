use crate::domain::rpm::{NameRule, PackageNameRules};
use crate::utils::error::{Result, StatusError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// `--config` 指定的 TOML 設定檔，所有區段皆為選填
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub projects: ProjectsConfig,
    pub obs: Option<ObsConfig>,
    #[serde(default)]
    pub package_names: PackageNamesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default)]
    pub include: Vec<String>,
    /// releases 專案名稱 -> rpm-packaging 目錄名稱
    #[serde(default)]
    pub mapping: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsConfig {
    pub published_xml: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageNamesConfig {
    #[serde(default)]
    pub overrides: HashMap<String, String>,
    #[serde(default)]
    pub rules: Vec<NameRule>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(StatusError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| StatusError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OBS_URL})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn package_name_rules(&self) -> Result<PackageNameRules> {
        PackageNameRules::new(
            self.package_names.overrides.clone(),
            &self.package_names.rules,
        )
    }

    pub fn obs_published_xml(&self) -> Option<&str> {
        self.obs.as_ref().map(|o| o.published_xml.as_str())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(location) = self.obs_published_xml() {
            validation::validate_location("obs.published_xml", location)?;
        }

        for (from, to) in &self.projects.mapping {
            validation::validate_non_empty_string("projects.mapping", from)?;
            validation::validate_non_empty_string("projects.mapping", to)?;
        }

        for rule in &self.package_names.rules {
            if rule.template.trim().is_empty() {
                return Err(StatusError::InvalidConfigValueError {
                    field: "package_names.rules.template".to_string(),
                    value: rule.template.clone(),
                    reason: "Template cannot be empty".to_string(),
                });
            }
        }
        self.package_name_rules()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[projects]
include = ["nova", "glance"]

[projects.mapping]
keystoneauth = "keystoneauth1"

[obs]
published_xml = "https://api.example.org/published/Cloud:OpenStack:Newton/openSUSE_Leap_42.2/noarch"

[package_names.overrides]
nova = "openstack-nova"

[[package_names.rules]]
pattern = '^oslo\.'
template = "python-{name}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.projects.include, vec!["nova", "glance"]);
        assert_eq!(config.projects.mapping["keystoneauth"], "keystoneauth1");
        assert!(config.obs_published_xml().unwrap().starts_with("https://"));
        assert_eq!(config.package_names.rules.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.projects.include.is_empty());
        assert!(config.obs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_OBS_PUBLISHED_URL", "https://obs.test/published");

        let config =
            TomlConfig::from_toml_str("[obs]\npublished_xml = \"${TEST_OBS_PUBLISHED_URL}\"\n")
                .unwrap();
        assert_eq!(config.obs_published_xml(), Some("https://obs.test/published"));

        std::env::remove_var("TEST_OBS_PUBLISHED_URL");
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = TomlConfig::from_toml_str("[source]\nendpoint = \"x\"\n").unwrap_err();
        assert!(matches!(err, StatusError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_bad_rule_fails_validation() {
        let config = TomlConfig::from_toml_str(
            "[[package_names.rules]]\npattern = \"(\"\ntemplate = \"python-{name}\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[projects]\ninclude = [\"heat\"]\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.projects.include, vec!["heat"]);
    }
}
