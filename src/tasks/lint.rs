use crate::tasks::taskfile::LintConfig;
use crate::utils::error::{Result, StatusError};
use regex::Regex;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// fnmatch 風格的排除規則：`*` 可跨越路徑分隔符
pub struct ExcludeMatcher {
    patterns: Vec<Regex>,
}

impl ExcludeMatcher {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let mut re = String::from("^");
                for c in pattern.chars() {
                    match c {
                        '*' => re.push_str(".*"),
                        '?' => re.push('.'),
                        other => re.push_str(&regex::escape(&other.to_string())),
                    }
                }
                re.push('$');
                Regex::new(&re).map_err(|e| StatusError::InvalidConfigValueError {
                    field: "lint.exclude".to_string(),
                    value: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// 比對檔名或相對路徑
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let full = relative.to_string_lossy();
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.patterns
            .iter()
            .any(|re| re.is_match(&name) || re.is_match(&full))
    }
}

/// 收集需要檢查的原始碼檔案 (相對路徑，已排序)
pub fn collect_files(root: &Path, config: &LintConfig) -> Result<Vec<String>> {
    let matcher = ExcludeMatcher::new(&config.exclude)?;
    let relative = |entry: &DirEntry| entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf();

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !matcher.is_excluded(&relative(entry)));

    for entry in walker {
        let entry = entry.map_err(|e| StatusError::IoError(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let has_extension = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| config.extensions.iter().any(|allowed| allowed == ext));
        if has_extension {
            files.push(relative(&entry).to_string_lossy().into_owned());
        }
    }

    files.sort();
    tracing::debug!("Collected {} files for linting", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, path: &str) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, "fn main() {}\n").unwrap();
    }

    #[test]
    fn test_exclude_patterns() {
        let matcher = ExcludeMatcher::new(&LintConfig::default().exclude).unwrap();
        assert!(matcher.is_excluded(Path::new(".git")));
        assert!(matcher.is_excluded(Path::new("target")));
        assert!(matcher.is_excluded(Path::new("foo.egg")));
        assert!(matcher.is_excluded(Path::new(".venv/lib/python3.5")));
        assert!(!matcher.is_excluded(Path::new("src")));
        assert!(!matcher.is_excluded(Path::new("src/doc.rs")));
    }

    #[test]
    fn test_collect_skips_excluded_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/main.rs");
        touch(dir.path(), "src/core/render.rs");
        touch(dir.path(), "target/debug/build/out.rs");
        touch(dir.path(), "doc/example.rs");
        touch(dir.path(), "README.md");

        let files = collect_files(dir.path(), &LintConfig::default()).unwrap();
        assert_eq!(files, vec!["src/core/render.rs", "src/main.rs"]);
    }

    #[test]
    fn test_custom_extensions() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Cargo.toml");
        touch(dir.path(), "src/lib.rs");

        let config = LintConfig {
            exclude: vec![],
            extensions: vec!["toml".to_string()],
        };
        assert_eq!(collect_files(dir.path(), &config).unwrap(), vec!["Cargo.toml"]);
    }
}
