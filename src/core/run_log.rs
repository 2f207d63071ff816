use crate::domain::model::{LogEntry, LogLevel};
use chrono::Utc;
use serde_json::Value;

const REDACTED: &str = "<redacted>";
const SECRET_KEYS: [&str; 5] = ["token", "access_token", "id_token", "refresh_token", "password"];

/// 批次執行期間的操作日誌。每筆同時輸出到 tracing，
/// 並保留下來供匯出使用；pipeline 從不讀回這些內容。
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        details: Option<Value>,
        patient_id: Option<&str>,
    ) {
        let message = message.into();
        let patient = patient_id.unwrap_or("-");

        match level {
            LogLevel::Info => tracing::info!(patient_id = patient, "ℹ️ {}", message),
            LogLevel::Success => tracing::info!(patient_id = patient, "✅ {}", message),
            LogLevel::Api => tracing::debug!(patient_id = patient, "📡 {}", message),
            LogLevel::Warning => tracing::warn!(patient_id = patient, "⚠️ {}", message),
            LogLevel::Error => tracing::error!(patient_id = patient, "❌ {}", message),
        }

        self.entries.push(LogEntry {
            id: (self.entries.len() + 1).to_string(),
            timestamp: Utc::now(),
            level,
            message,
            details: details.map(redact_token),
            patient_id: patient_id.map(str::to_string),
        });
    }

    pub fn info(&mut self, message: impl Into<String>, patient_id: Option<&str>) {
        self.record(LogLevel::Info, message, None, patient_id);
    }

    pub fn success(&mut self, message: impl Into<String>, details: Option<Value>, patient_id: Option<&str>) {
        self.record(LogLevel::Success, message, details, patient_id);
    }

    pub fn warning(&mut self, message: impl Into<String>, details: Option<Value>, patient_id: Option<&str>) {
        self.record(LogLevel::Warning, message, details, patient_id);
    }

    pub fn error(&mut self, message: impl Into<String>, details: Option<Value>, patient_id: Option<&str>) {
        self.record(LogLevel::Error, message, details, patient_id);
    }

    pub fn api(&mut self, message: impl Into<String>, details: Option<Value>, patient_id: Option<&str>) {
        self.record(LogLevel::Api, message, details, patient_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// access token 與密碼不寫進日誌內容（包含巢狀物件）
fn redact_token(mut details: Value) -> Value {
    redact_in_place(&mut details);
    details
}

fn redact_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if SECRET_KEYS.contains(&key.as_str()) && !inner.is_null() {
                    *inner = Value::String(REDACTED.to_string());
                } else {
                    redact_in_place(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_in_place),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entries_get_sequential_ids_and_patient_tag() {
        let mut log = RunLog::new();
        log.info("Starting", None);
        log.api("Check-in: PUT /api/check-in", None, Some("P-1"));

        let entries = log.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "1");
        assert_eq!(entries[1].id, "2");
        assert_eq!(entries[1].level, LogLevel::Api);
        assert_eq!(entries[1].patient_id.as_deref(), Some("P-1"));
        assert!(entries[0].patient_id.is_none());
    }

    #[test]
    fn test_token_is_redacted_from_details() {
        let mut log = RunLog::new();
        log.api(
            "Creating workflow",
            Some(json!({ "token": "secret", "patient_id": "P-1" })),
            Some("P-1"),
        );

        let entries = log.into_entries();
        let details = entries[0].details.as_ref().unwrap();
        assert_eq!(details["token"], "<redacted>");
        assert_eq!(details["patient_id"], "P-1");
    }

    #[test]
    fn test_nested_tokens_are_redacted() {
        let mut log = RunLog::new();
        log.success(
            "Authentication successful",
            Some(json!({ "data": { "tokens": { "access_token": "abc", "refresh_token": null } } })),
            None,
        );

        let entries = log.into_entries();
        let tokens = &entries[0].details.as_ref().unwrap()["data"]["tokens"];
        assert_eq!(tokens["access_token"], "<redacted>");
        assert!(tokens["refresh_token"].is_null());
    }
}
