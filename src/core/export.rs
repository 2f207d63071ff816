use crate::domain::model::{BatchRun, LogEntry, LogLevel, PipelineOutcome};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsMetadata<'a> {
    pub total_rows: usize,
    pub export_date: DateTime<Utc>,
    pub original_headers: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct ResultsDocument<'a> {
    pub metadata: ResultsMetadata<'a>,
    pub results: &'a [PipelineOutcome],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<&'a [LogEntry]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsMetadata {
    pub total_logs: usize,
    pub export_date: DateTime<Utc>,
    pub log_types: Vec<LogLevel>,
}

#[derive(Debug, Serialize)]
pub struct LogsDocument<'a> {
    pub metadata: LogsMetadata,
    pub logs: &'a [LogEntry],
}

pub fn results_document<'a>(
    run: &'a BatchRun,
    headers: &'a [String],
    include_logs: bool,
    exported_at: DateTime<Utc>,
) -> ResultsDocument<'a> {
    ResultsDocument {
        metadata: ResultsMetadata {
            total_rows: run.outcomes.len(),
            export_date: exported_at,
            original_headers: headers,
        },
        results: &run.outcomes,
        logs: include_logs.then_some(run.logs.as_slice()),
    }
}

pub fn logs_document(logs: &[LogEntry], exported_at: DateTime<Utc>) -> LogsDocument<'_> {
    let mut log_types = Vec::new();
    for entry in logs {
        if !log_types.contains(&entry.level) {
            log_types.push(entry.level);
        }
    }

    LogsDocument {
        metadata: LogsMetadata {
            total_logs: logs.len(),
            export_date: exported_at,
            log_types,
        },
        logs,
    }
}

/// 例如 `rtm-results-2025-11-21.json`
pub fn export_file_name(kind: &str, exported_at: DateTime<Utc>) -> String {
    format!("rtm-{}-{}.json", kind, exported_at.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub include_logs: bool,
    pub write_log_file: bool,
}

/// 將結果（與日誌）寫成 JSON 檔，回傳寫入的檔名
pub async fn write_exports<S: Storage>(
    storage: &S,
    run: &BatchRun,
    headers: &[String],
    options: ExportOptions,
) -> Result<Vec<String>> {
    let exported_at = Utc::now();
    let mut written = Vec::new();

    let results = results_document(run, headers, options.include_logs, exported_at);
    let file_name = export_file_name("results", exported_at);
    storage
        .write_file(&file_name, &serde_json::to_vec_pretty(&results)?)
        .await?;
    tracing::info!("💾 Results written to {}", file_name);
    written.push(file_name);

    if options.write_log_file && !run.logs.is_empty() {
        let logs = logs_document(&run.logs, exported_at);
        let file_name = export_file_name("logs", exported_at);
        storage
            .write_file(&file_name, &serde_json::to_vec_pretty(&logs)?)
            .await?;
        tracing::info!("💾 Logs written to {}", file_name);
        written.push(file_name);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BatchSummary, Row, RunStatus};
    use chrono::TimeZone;

    fn entry(id: &str, level: LogLevel) -> LogEntry {
        LogEntry {
            id: id.into(),
            timestamp: Utc::now(),
            level,
            message: format!("entry {}", id),
            details: None,
            patient_id: None,
        }
    }

    fn sample_run() -> BatchRun {
        let outcomes = vec![PipelineOutcome::failed(Row::default(), "boom")];
        let summary = BatchSummary::from_outcomes(&outcomes, std::time::Duration::ZERO);
        BatchRun {
            status: RunStatus::Completed,
            outcomes,
            logs: vec![
                entry("1", LogLevel::Info),
                entry("2", LogLevel::Api),
                entry("3", LogLevel::Info),
                entry("4", LogLevel::Error),
            ],
            summary,
        }
    }

    #[test]
    fn test_results_document_shape() {
        let run = sample_run();
        let headers = vec!["Patient ID".to_string(), "Case".to_string()];
        let at = Utc.with_ymd_and_hms(2025, 11, 21, 8, 30, 0).unwrap();

        let json = serde_json::to_value(results_document(&run, &headers, true, at)).unwrap();

        assert_eq!(json["metadata"]["totalRows"], 1);
        assert_eq!(json["metadata"]["originalHeaders"][1], "Case");
        assert!(json["metadata"]["exportDate"]
            .as_str()
            .unwrap()
            .starts_with("2025-11-21T08:30:00"));
        assert_eq!(json["results"][0]["success"], false);
        assert_eq!(json["logs"].as_array().unwrap().len(), 4);

        let without_logs = serde_json::to_value(results_document(&run, &headers, false, at)).unwrap();
        assert!(without_logs.get("logs").is_none());
    }

    #[test]
    fn test_logs_document_lists_distinct_types_in_order() {
        let run = sample_run();
        let json = serde_json::to_value(logs_document(&run.logs, Utc::now())).unwrap();

        assert_eq!(json["metadata"]["totalLogs"], 4);
        assert_eq!(
            json["metadata"]["logTypes"],
            serde_json::json!(["info", "api", "error"])
        );
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2025, 11, 21, 23, 59, 0).unwrap();
        assert_eq!(export_file_name("results", at), "rtm-results-2025-11-21.json");
        assert_eq!(export_file_name("logs", at), "rtm-logs-2025-11-21.json");
    }
}
