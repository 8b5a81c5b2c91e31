use crate::utils::error::{Result, StatusError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(StatusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(StatusError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(StatusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// 判斷字串是否為 http(s) 位址，否則視為本地路徑
pub fn is_remote_location(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(StatusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(StatusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// 本地路徑或 http(s) 位址皆可
pub fn validate_location(field_name: &str, location: &str) -> Result<()> {
    if is_remote_location(location) {
        validate_url(field_name, location)
    } else {
        validate_path(field_name, location)
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| StatusError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StatusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 環境變數名稱：字母或底線開頭，其後為字母、數字或底線
pub fn validate_env_var_name(field_name: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if !valid {
        return Err(StatusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: "Not a valid environment variable name".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("obs_published_xml", "https://example.com").is_ok());
        assert!(validate_url("obs_published_xml", "http://example.com").is_ok());
        assert!(validate_url("obs_published_xml", "").is_err());
        assert!(validate_url("obs_published_xml", "invalid-url").is_err());
        assert!(validate_url("obs_published_xml", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_location() {
        assert!(validate_location("obs", "./published.xml").is_ok());
        assert!(validate_location("obs", "https://api.example.org/published/x").is_ok());
        assert!(validate_location("obs", "").is_err());
        assert!(validate_location("obs", "https://").is_err());
    }

    #[test]
    fn test_validate_env_var_name() {
        assert!(validate_env_var_name("passenv", "RELEASES").is_ok());
        assert!(validate_env_var_name("passenv", "_PRIVATE_1").is_ok());
        assert!(validate_env_var_name("passenv", "1BAD").is_err());
        assert!(validate_env_var_name("passenv", "WITH-DASH").is_err());
        assert!(validate_env_var_name("passenv", "").is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some("newton".to_string());
        let missing: Option<String> = None;
        assert_eq!(validate_required_field("release", &present).unwrap(), "newton");
        assert!(matches!(
            validate_required_field("release", &missing),
            Err(StatusError::MissingConfigError { .. })
        ));
    }
}
