use crate::domain::model::ProjectRecord;
use crate::domain::version::Version;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// 打包狀態判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagingStatus {
    NeedsPackaging,
    NeedsUpgrade,
    Perfect,
    NeedsDowngrade,
    NeedsDowngradeUpperConstraints,
}

impl PackagingStatus {
    pub fn evaluate(record: &ProjectRecord) -> Self {
        let Some(rpm) = &record.rpm_packaging else {
            return PackagingStatus::NeedsPackaging;
        };

        match rpm.cmp(&record.release) {
            Ordering::Less => PackagingStatus::NeedsUpgrade,
            Ordering::Greater => PackagingStatus::NeedsDowngrade,
            Ordering::Equal => {
                let uc = record
                    .upper_constraint
                    .as_deref()
                    .and_then(|uc| Version::parse(uc).ok());
                match uc {
                    Some(uc) if record.release > uc => {
                        PackagingStatus::NeedsDowngradeUpperConstraints
                    }
                    _ => PackagingStatus::Perfect,
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackagingStatus::NeedsPackaging => "needs packaging",
            PackagingStatus::NeedsUpgrade => "needs upgrade",
            PackagingStatus::Perfect => "perfect",
            PackagingStatus::NeedsDowngrade => "needs downgrade",
            PackagingStatus::NeedsDowngradeUpperConstraints => "needs downgrade (u-c)",
        }
    }

    /// HTML 報表的背景色
    pub fn html_color(&self) -> &'static str {
        match self {
            PackagingStatus::NeedsPackaging => "yellow",
            PackagingStatus::NeedsUpgrade => "LightYellow",
            PackagingStatus::Perfect => "green",
            PackagingStatus::NeedsDowngrade
            | PackagingStatus::NeedsDowngradeUpperConstraints => "red",
        }
    }
}

impl fmt::Display for PackagingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PackagingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
