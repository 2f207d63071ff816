use crate::core::csv_parser::CsvOptions;
use crate::core::export::ExportOptions;
use crate::core::pipeline::{Credentials, RunSettings, VisitWindow};
use crate::domain::model::PATIENT_ID_COLUMN;
use crate::utils::error::{Result, RtmError};
use crate::utils::validation::{validate_range, validate_required, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5002";
const MAX_ROW_DELAY_MS: u64 = 60_000;
const MAX_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RtmConfig {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
    pub visit: VisitConfig,
    pub csv: CsvConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitConfig {
    pub start_time: String,
    pub end_time: String,
}

impl Default for VisitConfig {
    fn default() -> Self {
        let window = VisitWindow::default();
        Self {
            start_time: window.start_time,
            end_time: window.end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub required_field: String,
    pub keep_all_rows: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            required_field: PATIENT_ID_COLUMN.to_string(),
            keep_all_rows: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub row_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { row_delay_ms: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_path: String,
    pub include_logs: bool,
    pub write_log_file: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            include_logs: true,
            write_log_file: false,
        }
    }
}

impl RtmConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RtmError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RtmError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RTM_PASSWORD})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RtmError::ConfigError {
            message: format!("invalid env placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_range("api.timeout_seconds", self.api.timeout_seconds, 1, MAX_TIMEOUT_SECONDS)?;

        validate_required("credentials.email", &self.credentials.email)?;
        validate_required("credentials.password", &self.credentials.password)?;
        validate_required("visit.start_time", &self.visit.start_time)?;
        validate_required("visit.end_time", &self.visit.end_time)?;
        if !self.csv.keep_all_rows {
            validate_required("csv.required_field", &self.csv.required_field)?;
        }
        validate_range("run.row_delay_ms", self.run.row_delay_ms, 0, MAX_ROW_DELAY_MS)?;
        validate_required("output.output_path", &self.output.output_path)?;

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            credentials: Credentials {
                email: self.credentials.email.clone(),
                password: self.credentials.password.clone(),
            },
            visit_window: VisitWindow {
                start_time: self.visit.start_time.clone(),
                end_time: self.visit.end_time.clone(),
            },
            row_delay: Duration::from_millis(self.run.row_delay_ms),
        }
    }

    pub fn csv_options(&self) -> CsvOptions {
        if self.csv.keep_all_rows {
            CsvOptions::keep_all()
        } else {
            CsvOptions::requiring(self.csv.required_field.clone())
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            include_logs: self.output.include_logs,
            write_log_file: self.output.write_log_file,
        }
    }
}

impl Validate for RtmConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[api]
base_url = "https://rtm.example.com"
timeout_seconds = 10

[credentials]
email = "ops@clinic.test"
password = "hunter2"

[visit]
start_time = "2026/01/05/0900"
end_time = "2026/01/05/0935"

[csv]
keep_all_rows = true

[run]
row_delay_ms = 0

[output]
output_path = "./results"
write_log_file = true
"#;

        let config = RtmConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.api.base_url, "https://rtm.example.com");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.csv_options(), CsvOptions::keep_all());
        assert!(config.export_options().write_log_file);
        assert!(config.export_options().include_logs);

        let settings = config.run_settings();
        assert_eq!(settings.visit_window.start_time, "2026/01/05/0900");
        assert!(settings.row_delay.is_zero());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_apply_to_missing_sections() {
        let config = RtmConfig::from_toml_str("[credentials]\nemail = \"a@b.test\"\npassword = \"x\"\n").unwrap();

        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.run.row_delay_ms, 100);
        assert_eq!(config.visit.end_time, "2025/11/21/0135");
        assert_eq!(config.csv_options(), CsvOptions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RTM_TEST_PASSWORD_SUBST", "from-env");

        let toml_content = r#"
[credentials]
email = "ops@clinic.test"
password = "${RTM_TEST_PASSWORD_SUBST}"
"#;

        let config = RtmConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.credentials.password, "from-env");

        std::env::remove_var("RTM_TEST_PASSWORD_SUBST");
    }

    #[test]
    fn test_unresolved_env_var_fails_validation() {
        let toml_content = r#"
[credentials]
email = "ops@clinic.test"
password = "${RTM_TEST_SURELY_UNSET_VAR}"
"#;

        let config = RtmConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(RtmError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = RtmConfig::default();
        config.credentials.email = "ops@clinic.test".into();
        config.credentials.password = "pw".into();
        assert!(config.validate().is_ok());

        config.api.base_url = "localhost:5002".into();
        assert!(config.validate().is_err());

        config.api.base_url = DEFAULT_BASE_URL.into();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config.api.timeout_seconds = 301;
        assert!(config.validate().is_err());

        config.api.timeout_seconds = 5;
        config.credentials.password = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[api]\nbase_url = \"http://127.0.0.1:9000\"\n")
            .unwrap();

        let config = RtmConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = RtmConfig::from_toml_str("[api\nbase_url = 1").unwrap_err();
        assert!(matches!(err, RtmError::ConfigValidationError { .. }));
    }
}
