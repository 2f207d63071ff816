use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const PATIENT_ID_COLUMN: &str = "Patient ID";
pub const FIRST_NAME_COLUMN: &str = "First";
pub const LAST_NAME_COLUMN: &str = "Last";
pub const CASE_COLUMN: &str = "Case";
pub const CLINIC_LOCATION_COLUMN: &str = "Clinic Location";
pub const PROVIDER_ID_COLUMN: &str = "ProviderId";
pub const COMMENTS_COLUMN: &str = "Comments";

/// CSV 中的一列資料（欄位名稱 → 字串值），依標題列順序保存，未知欄位原樣保留
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    pub data: IndexMap<String, String>,
}

impl Row {
    pub fn new(data: IndexMap<String, String>) -> Self {
        Self { data }
    }

    /// 缺少的欄位視為空字串
    pub fn get(&self, column: &str) -> &str {
        self.data.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn patient_id(&self) -> &str {
        self.get(PATIENT_ID_COLUMN)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.get(FIRST_NAME_COLUMN), self.get(LAST_NAME_COLUMN))
            .trim()
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentOutcome {
    pub cpt_code: String,
    pub units: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 單一病患列的處理結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub input: Row,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkin_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_visit_success: Option<bool>,
    pub treatments: Vec<TreatmentOutcome>,
}

impl PipelineOutcome {
    pub fn pending(input: Row) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    pub fn failed(input: Row, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            input,
            success: false,
            message: Some(format!("Processing failed: {}", error)),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn treatments_added(&self) -> usize {
        self.treatments.iter().filter(|t| t.success).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Api,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Api => "api",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    AuthenticationFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub treatments_added: usize,
    pub elapsed_ms: u64,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[PipelineOutcome], elapsed: Duration) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            treatments_added: outcomes.iter().map(PipelineOutcome::treatments_added).sum(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// 成功率（百分比）
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64 * 100.0
    }

    pub fn average_per_row(&self) -> Duration {
        if self.total == 0 {
            return Duration::ZERO;
        }
        self.elapsed() / self.total as u32
    }
}

/// 一次完整批次執行的結果，執行完畢後不再變動
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRun {
    pub status: RunStatus,
    pub outcomes: Vec<PipelineOutcome>,
    pub logs: Vec<LogEntry>,
    pub summary: BatchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        Row::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_row_missing_column_reads_empty() {
        let r = row(&[("Patient ID", "P-1"), ("First", "Ada")]);
        assert_eq!(r.patient_id(), "P-1");
        assert_eq!(r.get("Comments"), "");
        assert_eq!(r.display_name(), "Ada");
    }

    #[test]
    fn test_summary_counts_sum_to_total() {
        let mut ok = PipelineOutcome::pending(row(&[("Patient ID", "1")]));
        ok.success = true;
        ok.treatments = vec![
            TreatmentOutcome {
                cpt_code: "98975".into(),
                units: 1.0,
                modifier: None,
                success: true,
                message: None,
            },
            TreatmentOutcome {
                cpt_code: "98977".into(),
                units: 2.0,
                modifier: Some("GP".into()),
                success: false,
                message: Some("rejected".into()),
            },
        ];
        let bad = PipelineOutcome::failed(row(&[("Patient ID", "2")]), "boom");

        let summary = BatchSummary::from_outcomes(&[ok, bad], Duration::from_millis(400));

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded + summary.failed, summary.total);
        assert_eq!(summary.treatments_added, 1);
        assert_eq!(summary.success_rate(), 50.0);
        assert_eq!(summary.average_per_row(), Duration::from_millis(200));
    }

    #[test]
    fn test_failed_outcome_message() {
        let outcome = PipelineOutcome::failed(Row::default(), "No visit_id received from patient-workflow");
        assert!(!outcome.success);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Processing failed: No visit_id received from patient-workflow")
        );
    }

    #[test]
    fn test_log_entry_serializes_with_type_and_patient_id() {
        let entry = LogEntry {
            id: "3".into(),
            timestamp: Utc::now(),
            level: LogLevel::Api,
            message: "Check-in: PUT /api/check-in".into(),
            details: None,
            patient_id: Some("P-9".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "api");
        assert_eq!(json["patientId"], "P-9");
        assert!(json.get("details").is_none());
    }
}
