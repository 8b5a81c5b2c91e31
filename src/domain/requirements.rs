//! 需求/約束清單解析
//!
//! 支援 `upper-constraints.txt` 與工具清單 (`tool-requirements.txt`) 共用的行格式：
//! `name[extras] <op><version>[, ...] ; marker  # comment`

use crate::utils::error::{Result, StatusError};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<rest>.*)$")
        .expect("name pattern is valid")
});

static SPECIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<op>===|==|!=|~=|<=|>=|<|>)\s*(?P<version>[^\s,;]+)$")
        .expect("specifier pattern is valid")
});

static NORMALIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("normalize pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    #[serde(rename = "===")]
    ArbitraryEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "~=")]
    Compatible,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
}

impl Operator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "===" => Operator::ArbitraryEqual,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "~=" => Operator::Compatible,
            "<=" => Operator::LessEqual,
            ">=" => Operator::GreaterEqual,
            "<" => Operator::Less,
            ">" => Operator::Greater,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::ArbitraryEqual => "===",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Compatible => "~=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Specifier {
    pub op: Operator,
    pub version: String,
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub name: String,
    pub extras: Vec<String>,
    pub specifiers: Vec<Specifier>,
    pub marker: Option<String>,
    pub comment: Option<String>,
}

impl Constraint {
    /// PEP 503 正規化名稱
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// 版本限制的文字表示，例如 `>=1.0,<2`
    pub fn specifier_string(&self) -> String {
        self.specifiers
            .iter()
            .map(Specifier::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub fn normalize_name(name: &str) -> String {
    NORMALIZE_PATTERN
        .replace_all(&name.to_ascii_lowercase(), "-")
        .into_owned()
}

/// 解析單行；空行、註解行與選項行 (`-r`, `--index-url` 等) 回傳 None
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<Constraint>> {
    let (body, comment) = split_comment(line);
    let body = body.trim();
    if body.is_empty() || body.starts_with('-') {
        return Ok(None);
    }

    let (spec_part, marker) = match body.split_once(';') {
        Some((spec, marker)) => (spec.trim(), Some(marker.trim().to_string())),
        None => (body, None),
    };

    let caps = NAME_PATTERN
        .captures(spec_part)
        .ok_or_else(|| StatusError::RequirementParseError {
            line: line_no,
            reason: format!("cannot find a package name in '{}'", spec_part),
        })?;

    let extras = caps
        .name("extras")
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let rest = caps.name("rest").map_or("", |m| m.as_str()).trim();
    let specifiers = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',')
            .map(|raw| {
                let raw = raw.trim();
                let spec = SPECIFIER_PATTERN.captures(raw).ok_or_else(|| {
                    StatusError::RequirementParseError {
                        line: line_no,
                        reason: format!("invalid version specifier '{}'", raw),
                    }
                })?;
                let op = Operator::from_symbol(&spec["op"]).ok_or_else(|| {
                    StatusError::RequirementParseError {
                        line: line_no,
                        reason: format!("unknown operator in '{}'", raw),
                    }
                })?;
                Ok(Specifier {
                    op,
                    version: spec["version"].to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    Ok(Some(Constraint {
        name: caps["name"].to_string(),
        extras,
        specifiers,
        marker: marker.filter(|m| !m.is_empty()),
        comment,
    }))
}

/// `#` 只有在行首或空白之後才算註解
fn split_comment(line: &str) -> (&str, Option<String>) {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            let comment = line[i + 1..].trim();
            let comment = (!comment.is_empty()).then(|| comment.to_string());
            return (&line[..i], comment);
        }
    }
    (line, None)
}

/// 依檔案順序排列的約束清單，名稱不得重複
#[derive(Debug, Clone, Default)]
pub struct ConstraintManifest {
    entries: Vec<Constraint>,
}

impl ConstraintManifest {
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            let Some(constraint) = parse_line(line, line_no)? else {
                continue;
            };

            let key = constraint.normalized_name();
            if let Some(first) = seen.insert(key, line_no) {
                return Err(StatusError::RequirementParseError {
                    line: line_no,
                    reason: format!(
                        "duplicate package '{}' (first listed on line {})",
                        constraint.name, first
                    ),
                });
            }
            entries.push(constraint);
        }

        Ok(Self { entries })
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn entries(&self) -> &[Constraint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Constraint> {
        let key = normalize_name(name);
        self.entries.iter().find(|c| c.normalized_name() == key)
    }
}

/// 讀取 upper-constraints：忽略 marker，每個套件取第一個版本限制
///
/// 同一套件因 marker 不同而重複出現時保留第一筆。
pub fn read_upper_constraints(content: &str) -> Result<BTreeMap<String, String>> {
    let mut constraints = BTreeMap::new();

    for (index, line) in content.lines().enumerate() {
        let Some(constraint) = parse_line(line, index + 1)? else {
            continue;
        };
        let Some(first) = constraint.specifiers.first() else {
            tracing::debug!("Skipping unpinned constraint '{}'", constraint.name);
            continue;
        };
        constraints
            .entry(constraint.name.clone())
            .or_insert_with(|| first.version.clone());
    }

    Ok(constraints)
}
