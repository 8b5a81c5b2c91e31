use crate::domain::requirements::Constraint;
use crate::tasks::lint::collect_files;
use crate::tasks::taskfile::{cargo_version_req, EnvConfig, TaskFile};
use crate::utils::error::{Result, StatusError};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::process::Command;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(posargs|files|exclude|root|env:[A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("placeholder pattern is valid")
});

/// 永遠傳給子程序的基本環境變數
const BASE_PASSENV: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LANG",
    "LC_ALL",
    "TERM",
    "TMPDIR",
    "CARGO_HOME",
    "RUSTUP_HOME",
    "RUSTUP_TOOLCHAIN",
    "http_proxy",
    "https_proxy",
    "no_proxy",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "SSL_CERT_FILE",
    "SSL_CERT_DIR",
    "REQUESTS_CA_BUNDLE",
];

pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

fn quote_all(values: &[String]) -> String {
    values
        .iter()
        .map(|v| shell_quote(v))
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct TaskRunner {
    root: PathBuf,
    file: TaskFile,
    vars: HashMap<String, String>,
}

impl TaskRunner {
    pub fn new(root: impl Into<PathBuf>, file: TaskFile) -> Self {
        Self {
            root: root.into(),
            file,
            vars: std::env::vars().collect(),
        }
    }

    /// 以指定的變數取代目前的行程環境
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn task_file(&self) -> &TaskFile {
        &self.file
    }

    /// 安裝依賴後依序執行指令，第一個失敗的指令即中止
    pub async fn run(&self, env_name: &str, posargs: &[String]) -> Result<()> {
        let env = self.file.get(env_name)?;
        tracing::info!(
            "🚀 {}: {}",
            env_name,
            env.description.as_deref().unwrap_or("running commands")
        );

        let deps = env.dependencies(&self.root)?;
        for dep in &deps {
            let command = self.install_command(env_name, env, dep)?;
            tracing::info!("📦 {} install: {}", env_name, command);
            self.execute(env_name, env, &command).await?;
        }

        for template in &env.commands {
            let Some(command) = self.expand(env_name, template, posargs)? else {
                tracing::warn!("⚠️ {}: no files to lint, skipping `{}`", env_name, template);
                continue;
            };
            tracing::info!("▶️ {}: {}", env_name, command);
            self.execute(env_name, env, &command).await?;
        }

        tracing::info!("✅ {}: commands succeeded", env_name);
        Ok(())
    }

    fn install_command(&self, env_name: &str, env: &EnvConfig, dep: &Constraint) -> Result<String> {
        let template = env.install_command();
        let version_req = if template.contains("{version_req}") {
            cargo_version_req(&dep.specifiers).map_err(|reason| StatusError::TaskDefinitionError {
                env: env_name.to_string(),
                message: format!("cannot install {}: {}", dep.name, reason),
            })?
        } else {
            String::new()
        };
        Ok(template
            .replace("{package}", &shell_quote(&dep.name))
            .replace("{version_req}", &shell_quote(&version_req)))
    }

    /// 展開佔位符；`{files}` 沒有任何檔案時回傳 None
    pub fn expand(&self, env_name: &str, template: &str, posargs: &[String]) -> Result<Option<String>> {
        let files = if template.contains("{files}") {
            let files = collect_files(&self.root, &self.file.lint)?;
            if files.is_empty() {
                return Ok(None);
            }
            files
        } else {
            Vec::new()
        };

        let mut missing = None;
        let expanded = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
            match &caps[1] {
                "posargs" => quote_all(posargs),
                "files" => quote_all(&files),
                "exclude" => self.file.lint.exclude.join(","),
                "root" => shell_quote(&self.root.to_string_lossy()),
                name => {
                    let var = name.trim_start_matches("env:");
                    match self.vars.get(var) {
                        Some(value) => shell_quote(value),
                        None => {
                            missing.get_or_insert_with(|| var.to_string());
                            String::new()
                        }
                    }
                }
            }
        });

        if let Some(field) = missing {
            tracing::error!("❌ {}: environment variable {} is not set", env_name, field);
            return Err(StatusError::MissingConfigError { field });
        }
        Ok(Some(expanded.into_owned()))
    }

    fn child_env(&self, env: &EnvConfig) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = BASE_PASSENV
            .iter()
            .copied()
            .chain(env.passenv.iter().map(String::as_str))
            .filter_map(|name| self.vars.get(name).map(|v| (name.to_string(), v.clone())))
            .collect();
        vars.extend(env.setenv.clone());
        vars
    }

    async fn execute(&self, env_name: &str, env: &EnvConfig, command: &str) -> Result<()> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .env_clear()
            .envs(self.child_env(env))
            .status()
            .await?;

        if status.success() {
            return Ok(());
        }

        let code = status.code().unwrap_or(1);
        tracing::error!("❌ {}: `{}` exited with code {}", env_name, command, code);
        Err(StatusError::TaskFailedError {
            env: env_name.to_string(),
            command: command.to_string(),
            code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(toml: &str, vars: &[(&str, &str)]) -> TaskRunner {
        let file = TaskFile::from_toml_str(toml).unwrap();
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TaskRunner::new(".", file).with_vars(vars)
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("html/index.html"), "html/index.html");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote(">=0.14"), "'>=0.14'");
    }

    #[test]
    fn test_expand_env_and_posargs() {
        let runner = runner(
            "[env.status]\npassenv = [\"RELEASE\"]\ncommands = [\"x\"]\n",
            &[("RELEASE", "newton")],
        );
        let expanded = runner
            .expand("status", "gen {env:RELEASE} {posargs}", &["a b".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(expanded, "gen newton 'a b'");
    }

    #[test]
    fn test_expand_missing_variable() {
        let runner = runner("[env.status]\ncommands = [\"x\"]\n", &[]);
        let err = runner.expand("status", "gen {env:RELEASES}", &[]).unwrap_err();
        assert!(matches!(err, StatusError::MissingConfigError { field } if field == "RELEASES"));
    }

    #[test]
    fn test_expand_exclude_list() {
        let runner = runner("[lint]\nexclude = [\".git\", \"target\"]\n", &[]);
        let expanded = runner.expand("pep8", "lint --exclude={exclude}", &[]).unwrap().unwrap();
        assert_eq!(expanded, "lint --exclude=.git,target");
    }

    fn dep(line: &str) -> Constraint {
        crate::domain::requirements::parse_line(line, 1).unwrap().unwrap()
    }

    #[test]
    fn test_install_command_template() {
        let runner = runner("", &[]);
        let env = EnvConfig::default();
        assert_eq!(
            runner.install_command("pep8", &env, &dep("cargo-deny>=0.14.0  # MIT")).unwrap(),
            "cargo install --locked cargo-deny --version '>=0.14.0'"
        );
        assert_eq!(
            runner.install_command("pep8", &env, &dep("taplo-cli==0.9.3  # MIT")).unwrap(),
            "cargo install --locked taplo-cli --version =0.9.3"
        );
        assert_eq!(
            runner.install_command("pep8", &env, &dep("taplo-cli~=0.9  # MIT")).unwrap(),
            "cargo install --locked taplo-cli --version '>=0.9, <1'"
        );
        assert_eq!(
            runner.install_command("pep8", &env, &dep("taplo-cli  # MIT")).unwrap(),
            "cargo install --locked taplo-cli --version '*'"
        );
    }

    #[test]
    fn test_install_command_rejects_not_equal() {
        let runner = runner("", &[]);
        let err = runner
            .install_command("pep8", &EnvConfig::default(), &dep("taplo-cli!=0.9.0"))
            .unwrap_err();
        assert!(matches!(err, StatusError::TaskDefinitionError { env, .. } if env == "pep8"));
    }

    #[test]
    fn test_child_env_keeps_proxy_settings() {
        let runner = runner(
            "[env.venv]\ncommands = [\"x\"]\n",
            &[
                ("https_proxy", "http://proxy:3128"),
                ("no_proxy", "localhost"),
                ("SSL_CERT_FILE", "/etc/ssl/cert.pem"),
                ("SECRET", "x"),
            ],
        );
        let vars = runner.child_env(runner.task_file().get("venv").unwrap());
        assert_eq!(vars.get("https_proxy").map(String::as_str), Some("http://proxy:3128"));
        assert_eq!(vars.get("no_proxy").map(String::as_str), Some("localhost"));
        assert_eq!(vars.get("SSL_CERT_FILE").map(String::as_str), Some("/etc/ssl/cert.pem"));
        assert!(!vars.contains_key("SECRET"));
    }

    #[test]
    fn test_child_env_only_passes_listed_variables() {
        let runner = runner(
            "[env.status]\npassenv = [\"RELEASE\"]\ncommands = [\"x\"]\n[env.status.setenv]\nRUST_LOG = \"debug\"\n",
            &[("RELEASE", "newton"), ("SECRET", "x"), ("PATH", "/usr/bin")],
        );
        let env = runner.task_file().get("status").unwrap();
        let vars = runner.child_env(env);
        assert_eq!(vars.get("RELEASE").map(String::as_str), Some("newton"));
        assert_eq!(vars.get("PATH").map(String::as_str), Some("/usr/bin"));
        assert_eq!(vars.get("RUST_LOG").map(String::as_str), Some("debug"));
        assert!(!vars.contains_key("SECRET"));
    }
}
