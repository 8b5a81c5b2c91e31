use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 完整 RPM 檔名拆解結果 (`[epoch:]name-version-release.arch.rpm`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpmFilename {
    pub name: String,
    pub version: String,
    pub release: String,
    pub epoch: String,
    pub arch: String,
}

/// 由右往左拆解 RPM 檔名
///
/// `foo-1.0-1.i386.rpm` -> (foo, 1.0, 1, "", i386)
/// `1:bar-9-123a.ia64.rpm` -> (bar, 9, 123a, 1, ia64)
pub fn split_rpm_filename(filename: &str) -> RpmFilename {
    let filename = filename.strip_suffix(".rpm").unwrap_or(filename);

    let arch_index = filename.rfind('.').unwrap_or(filename.len());
    let arch = filename.get(arch_index + 1..).unwrap_or("");

    let rel_index = filename[..arch_index].rfind('-').unwrap_or(0);
    let release = filename.get(rel_index + 1..arch_index).unwrap_or("");

    let ver_index = filename[..rel_index].rfind('-').unwrap_or(0);
    let version = filename.get(ver_index + 1..rel_index).unwrap_or("");

    let (epoch, name_start) = match filename.find(':') {
        Some(i) => (&filename[..i], i + 1),
        None => ("", 0),
    };
    let name = filename.get(name_start..ver_index).unwrap_or("");

    RpmFilename {
        name: name.to_string(),
        version: version.to_string(),
        release: release.to_string(),
        epoch: epoch.to_string(),
        arch: arch.to_string(),
    }
}

/// OpenStack 服務在 SUSE 上以 `openstack-` 前綴打包
pub const OPENSTACK_SERVICES: &[&str] = &[
    "aodh",
    "barbican",
    "ceilometer",
    "cinder",
    "cloudkitty",
    "designate",
    "glance",
    "gnocchi",
    "heat",
    "horizon",
    "ironic",
    "keystone",
    "magnum",
    "manila",
    "mistral",
    "monasca",
    "murano",
    "neutron",
    "nova",
    "octavia",
    "panko",
    "sahara",
    "searchlight",
    "senlin",
    "swift",
    "tempest",
    "trove",
    "watcher",
    "zaqar",
];

/// 自訂規則：正規表達式比對模組名稱，`{name}` 代入原名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRule {
    pub pattern: String,
    pub template: String,
}

/// 上游模組名稱 -> 發行版套件名稱
#[derive(Debug, Clone, Default)]
pub struct PackageNameRules {
    overrides: HashMap<String, String>,
    rules: Vec<(Regex, String)>,
}

impl PackageNameRules {
    pub fn new(
        overrides: HashMap<String, String>,
        rules: &[NameRule],
    ) -> crate::utils::error::Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (re, rule.template.clone()))
                    .map_err(|e| crate::utils::error::StatusError::InvalidConfigValueError {
                        field: "package_names.rules.pattern".to_string(),
                        value: rule.pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<crate::utils::error::Result<Vec<_>>>()?;
        Ok(Self { overrides, rules })
    }

    pub fn module_to_package(&self, module: &str) -> String {
        if let Some(package) = self.overrides.get(module) {
            return package.clone();
        }
        if let Some((_, template)) = self.rules.iter().find(|(re, _)| re.is_match(module)) {
            return template.replace("{name}", module);
        }

        if module.starts_with("python-") || module.starts_with("openstack-") {
            module.to_string()
        } else if OPENSTACK_SERVICES.contains(&module) {
            format!("openstack-{}", module)
        } else {
            format!("python-{}", module)
        }
    }
}
