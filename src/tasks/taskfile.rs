use crate::domain::requirements::{parse_line, Constraint, ConstraintManifest, Operator, Specifier};
use crate::utils::error::{Result, StatusError};
use crate::utils::validation::validate_env_var_name;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{env:([A-Za-z_][A-Za-z0-9_]*)\}").expect("env placeholder pattern is valid")
});

pub const DEFAULT_INSTALL_COMMAND: &str = "cargo install --locked {package} --version {version_req}";

/// 將 PEP 440 版本限制轉為 Cargo 的 version requirement
///
/// `==`/`===` 轉為 `=`，`~=X.Y` 轉為 `>=X.Y, <X+1`，`!=` 沒有對應語法。
/// 沒有任何限制時回傳 `*`。
pub fn cargo_version_req(specifiers: &[Specifier]) -> std::result::Result<String, String> {
    if specifiers.is_empty() {
        return Ok("*".to_string());
    }

    let mut parts = Vec::with_capacity(specifiers.len());
    for spec in specifiers {
        let version = spec.version.as_str();
        match spec.op {
            Operator::Equal if version.ends_with(".*") => parts.push(version.to_string()),
            Operator::Equal | Operator::ArbitraryEqual => parts.push(format!("={}", version)),
            Operator::Compatible => {
                let release = version
                    .split('.')
                    .map(str::parse::<u64>)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| format!("~={} is not a plain release version", version))?;
                let [prefix @ .., bumped, _] = release.as_slice() else {
                    return Err(format!("~={} needs at least two release components", version));
                };
                let upper = prefix
                    .iter()
                    .map(u64::to_string)
                    .chain(std::iter::once((bumped + 1).to_string()))
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!(">={}", version));
                parts.push(format!("<{}", upper));
            }
            Operator::NotEqual => {
                return Err(format!("{} has no cargo equivalent", spec));
            }
            Operator::LessEqual | Operator::GreaterEqual | Operator::Less | Operator::Greater => {
                parts.push(spec.to_string())
            }
        }
    }
    Ok(parts.join(", "))
}

fn default_excludes() -> Vec<String> {
    [
        ".venv",
        ".git",
        ".tox",
        "dist",
        "doc",
        "target",
        "*lib/python*",
        "*egg",
        "build",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_extensions() -> Vec<String> {
    vec!["rs".to_string()]
}

/// `tasks.toml`：lint 設定與命名環境
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFile {
    #[serde(default)]
    pub lint: LintConfig,
    #[serde(default)]
    pub env: BTreeMap<String, EnvConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LintConfig {
    #[serde(default = "default_excludes")]
    pub exclude: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            exclude: default_excludes(),
            extensions: default_extensions(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    pub description: Option<String>,
    /// 內嵌的約束行，例如 `cargo-deny>=0.14`
    #[serde(default)]
    pub deps: Vec<String>,
    /// 約束清單檔案，相對於 tasks.toml 所在目錄
    pub deps_file: Option<String>,
    pub install_command: Option<String>,
    #[serde(default)]
    pub passenv: Vec<String>,
    #[serde(default)]
    pub setenv: BTreeMap<String, String>,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl EnvConfig {
    /// 指令中引用的 `{env:NAME}` 名稱
    pub fn referenced_env_vars(&self) -> BTreeSet<String> {
        self.commands
            .iter()
            .flat_map(|cmd| ENV_PLACEHOLDER.captures_iter(cmd))
            .map(|caps| caps[1].to_string())
            .collect()
    }

    pub fn install_command(&self) -> &str {
        self.install_command
            .as_deref()
            .unwrap_or(DEFAULT_INSTALL_COMMAND)
    }

    /// 依檔案順序列出要安裝的套件：先 deps_file，再 deps
    pub fn dependencies(&self, root: &Path) -> Result<Vec<Constraint>> {
        let mut constraints = Vec::new();
        if let Some(file) = &self.deps_file {
            let manifest = ConstraintManifest::from_file(root.join(file))?;
            constraints.extend(manifest.entries().iter().cloned());
        }
        for (index, line) in self.deps.iter().enumerate() {
            if let Some(constraint) = parse_line(line, index + 1)? {
                constraints.push(constraint);
            }
        }
        Ok(constraints)
    }
}

impl TaskFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 重複的環境名稱會在 TOML 解析時被拒絕
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| StatusError::ConfigValidationError {
            field: "tasks.toml".to_string(),
            message: e.to_string(),
        })
    }

    pub fn env_names(&self) -> impl Iterator<Item = &str> {
        self.env.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&EnvConfig> {
        self.env.get(name).ok_or_else(|| StatusError::TaskDefinitionError {
            env: name.to_string(),
            message: format!(
                "unknown environment; available: {}",
                self.env_names().collect::<Vec<_>>().join(", ")
            ),
        })
    }

    pub fn validate(&self, root: &Path) -> Result<()> {
        for (name, env) in &self.env {
            let invalid = |message: String| StatusError::TaskDefinitionError {
                env: name.clone(),
                message,
            };

            if env.commands.is_empty() {
                return Err(invalid("no commands defined".to_string()));
            }
            if env.commands.iter().any(|c| c.trim().is_empty()) {
                return Err(invalid("empty command".to_string()));
            }

            for var in env.passenv.iter().chain(env.setenv.keys()) {
                validate_env_var_name(&format!("env.{}.passenv", name), var)?;
            }

            // 引用的變數必須被傳遞
            for var in env.referenced_env_vars() {
                if !env.passenv.contains(&var) && !env.setenv.contains_key(&var) {
                    return Err(invalid(format!(
                        "command references {{env:{}}} but it is not in passenv",
                        var
                    )));
                }
            }

            let deps = env.dependencies(root)?;
            if !deps.is_empty() && !env.install_command().contains("{package}") {
                return Err(invalid("install_command must contain {package}".to_string()));
            }
            if env.install_command().contains("{version_req}") {
                for dep in &deps {
                    cargo_version_req(&dep.specifiers)
                        .map_err(|reason| invalid(format!("cannot install {}: {}", dep.name, reason)))?;
                }
            }
        }
        Ok(())
    }
}
