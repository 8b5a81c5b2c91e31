//! 讀取 releases / requirements / rpm-packaging / OBS 四種來源

use crate::domain::ports::Storage;
use crate::domain::requirements::read_upper_constraints;
use crate::domain::rpm::{split_rpm_filename, RpmFilename};
use crate::domain::version::{find_highest, Version};
use crate::utils::error::{Result, StatusError};
use crate::utils::validation::is_remote_location;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static SPEC_VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Version:\s*(?P<version>.*?)\s*$").expect("spec version pattern is valid")
});

static DELIVERABLE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.ya?ml$").expect("deliverable suffix pattern is valid"));

static OBS_ENTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<entry\b[^>]*?\bname\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("obs entry pattern is valid")
});

pub fn join_path(base: &str, parts: &[&str]) -> String {
    let mut path = Path::new(base).to_path_buf();
    for part in parts {
        path.push(part);
    }
    path.to_string_lossy().into_owned()
}

/// `<requirements>/upper-constraints.txt`
pub async fn load_upper_constraints<S: Storage>(
    storage: &S,
    requirements_dir: &str,
) -> Result<BTreeMap<String, String>> {
    let path = join_path(requirements_dir, &["upper-constraints.txt"]);
    if !storage.exists(&path).await {
        return Err(StatusError::ConfigError {
            message: format!("upper-constraints.txt not found at {}", path),
        });
    }

    let data = storage.read_file(&path).await?;
    let constraints = read_upper_constraints(&String::from_utf8_lossy(&data))?;
    tracing::debug!("Loaded {} upper constraints from {}", constraints.len(), path);
    Ok(constraints)
}

/// 發行系列下的 deliverable 檔案，回傳 (專案名稱, 路徑)
pub async fn list_deliverables<S: Storage>(
    storage: &S,
    releases_dir: &str,
    release: &str,
) -> Result<Vec<(String, String)>> {
    let dir = join_path(releases_dir, &["deliverables", release]);
    if !storage.exists(&dir).await {
        return Err(StatusError::ConfigError {
            message: format!("unknown release '{}': {} does not exist", release, dir),
        });
    }

    let mut deliverables = Vec::new();
    for file_name in storage.list_dir(&dir).await? {
        if !DELIVERABLE_SUFFIX.is_match(&file_name) {
            tracing::debug!("Ignoring non-deliverable file {}", file_name);
            continue;
        }
        let project = DELIVERABLE_SUFFIX.replace(&file_name, "").into_owned();
        deliverables.push((project, join_path(&dir, &[&file_name])));
    }
    Ok(deliverables)
}

#[derive(Debug, Deserialize)]
struct Deliverable {
    #[serde(default)]
    releases: Vec<ReleaseEntry>,
}

#[derive(Debug, Deserialize)]
struct ReleaseEntry {
    version: Option<serde_yaml::Value>,
}

/// deliverable YAML 中的最高版本；沒有任何有效版本時回傳 None
pub fn highest_release_version(project: &str, content: &str) -> Result<Option<Version>> {
    let deliverable: Deliverable =
        serde_yaml::from_str(content).map_err(|e| StatusError::DeliverableError {
            project: project.to_string(),
            message: e.to_string(),
        })?;

    // 未加引號的版本號會被 YAML 解析成數字
    let versions: Vec<String> = deliverable
        .releases
        .iter()
        .filter_map(|r| match &r.version {
            Some(serde_yaml::Value::String(s)) => Some(s.clone()),
            Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .collect();

    Ok(find_highest(versions.iter().map(String::as_str)))
}

/// `Version:` 行的內容
pub fn parse_spec_version(content: &str) -> Option<&str> {
    content.lines().find_map(|line| {
        SPEC_VERSION_PATTERN
            .captures(line)
            .and_then(|caps| caps.name("version"))
            .map(|m| m.as_str())
    })
}

/// `<rpm-packaging>/openstack/<pkg>/<pkg>.spec.j2` 中的版本
pub async fn find_rpm_packaging_version<S: Storage>(
    storage: &S,
    spec_path: &str,
) -> Result<Option<Version>> {
    if !storage.exists(spec_path).await {
        return Ok(None);
    }

    let data = storage.read_file(spec_path).await?;
    let content = String::from_utf8_lossy(&data);
    match parse_spec_version(&content) {
        Some(raw) => Ok(Version::parse_lenient(raw)),
        None => {
            tracing::error!("❌ No version in {} found", spec_path);
            Ok(None)
        }
    }
}

pub fn spec_path(rpm_packaging_dir: &str, package: &str) -> String {
    join_path(
        rpm_packaging_dir,
        &["openstack", package, &format!("{}.spec.j2", package)],
    )
}

/// OBS published 目錄清單中的二進位 RPM
#[derive(Debug, Clone, Default)]
pub struct ObsListing {
    binaries: Vec<RpmFilename>,
}

impl ObsListing {
    pub fn parse(xml: &str) -> Self {
        let binaries = OBS_ENTRY_PATTERN
            .captures_iter(xml)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| unescape_xml(m.as_str()))
            .filter(|name| {
                !name.starts_with('_') && name.ends_with(".rpm") && !name.ends_with(".src.rpm")
            })
            .map(|name| split_rpm_filename(&name))
            .collect();
        Self { binaries }
    }

    pub fn len(&self) -> usize {
        self.binaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binaries.is_empty()
    }

    /// 第一個名稱相符的二進位套件版本
    pub fn find_version(&self, package: &str) -> Option<Version> {
        self.binaries
            .iter()
            .find(|rpm| rpm.name == package)
            .and_then(|rpm| Version::parse_lenient(&rpm.version))
    }
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// 從本地路徑或 http(s) 位址讀取 OBS 清單；本地檔案不存在時回傳 None
pub async fn load_obs_listing<S: Storage>(
    storage: &S,
    client: &Client,
    location: &str,
) -> Result<Option<ObsListing>> {
    let xml = if is_remote_location(location) {
        tracing::debug!("Fetching OBS published listing from {}", location);
        let response = client.get(location).send().await?;
        if !response.status().is_success() {
            return Err(StatusError::HttpStatusError {
                url: location.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.text().await?
    } else {
        if !storage.exists(location).await {
            tracing::warn!("⚠️ OBS published listing {} does not exist", location);
            return Ok(None);
        }
        String::from_utf8_lossy(&storage.read_file(location).await?).into_owned()
    };

    let listing = ObsListing::parse(&xml);
    tracing::info!("📦 OBS listing contains {} binary packages", listing.len());
    Ok(Some(listing))
}
