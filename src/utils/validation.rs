use crate::utils::error::{Result, RtmError};
use std::path::Path;
use url::Url;

/// 允許作為批次輸入的副檔名
pub const INPUT_EXTENSIONS: [&str; 2] = ["csv", "txt"];

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> RtmError {
    RtmError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// RTM API 與 proxy upstream 都只接受 http(s)
pub fn validate_url(field: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| invalid(field, raw, format!("Invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(field, raw, format!("Unsupported URL scheme: {}", scheme))),
    }
}

/// 必填值：`${VAR}` 沒被替換視為缺少設定，空白視為無效
pub fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(RtmError::MissingConfigError {
            field: format!("{} (unresolved {})", field, value),
        });
    }
    if value.trim().is_empty() || value.contains('\0') {
        return Err(invalid(field, value, "Value cannot be empty"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field, value, format!("Value must be between {} and {}", min, max)));
    }
    Ok(())
}

pub fn validate_input_file(field: &str, path: &str) -> Result<()> {
    validate_required(field, path)?;
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) if INPUT_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(invalid(
            field,
            path,
            format!("Expected a .{} file", INPUT_EXTENSIONS.join(" or .")),
        )),
    }
}
