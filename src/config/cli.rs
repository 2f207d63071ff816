use crate::config::toml_config::RtmConfig;
use crate::utils::error::Result;
use crate::utils::validation::{validate_input_file, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "rtm-batch")]
#[command(about = "Run the RTM visit/treatment workflow for every patient in a CSV file")]
pub struct CliConfig {
    /// CSV file with one patient per row
    #[arg(long)]
    pub csv: String,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, help = "Override api.base_url")]
    pub api_base_url: Option<String>,

    #[arg(long, env = "RTM_EMAIL", help = "Login email")]
    pub email: Option<String>,

    #[arg(long, env = "RTM_PASSWORD", hide_env_values = true, help = "Login password")]
    pub password: Option<String>,

    #[arg(long, help = "Override output.output_path")]
    pub output_path: Option<String>,

    #[arg(long, help = "Delay between rows in milliseconds")]
    pub row_delay_ms: Option<u64>,

    #[arg(long, help = "Keep rows without a Patient ID")]
    pub keep_all_rows: bool,

    #[arg(long, help = "Also write a separate rtm-logs-<date>.json file")]
    pub write_log_file: bool,

    #[arg(long, help = "Parse the CSV and show the rows without calling the API")]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 載入 TOML（若有指定），再以命令列參數覆寫
    pub fn resolve(&self) -> Result<RtmConfig> {
        let mut config = match &self.config {
            Some(path) => RtmConfig::from_file(path)?,
            None => RtmConfig::default(),
        };

        if let Some(base_url) = &self.api_base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(email) = &self.email {
            config.credentials.email = email.clone();
        }
        if let Some(password) = &self.password {
            config.credentials.password = password.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.output.output_path = output_path.clone();
        }
        if let Some(delay) = self.row_delay_ms {
            config.run.row_delay_ms = delay;
        }
        if self.keep_all_rows {
            config.csv.keep_all_rows = true;
        }
        if self.write_log_file {
            config.output.write_log_file = true;
        }

        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_input_file("csv", &self.csv)
    }
}
