use crate::domain::model::{Row, PATIENT_ID_COLUMN};
use csv::{ReaderBuilder, StringRecord, Trim};
use indexmap::IndexMap;

/// 列保留規則：`required_field` 有值時，該欄位為空白的列會被略過
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub required_field: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            required_field: Some(PATIENT_ID_COLUMN.to_string()),
        }
    }
}

impl CsvOptions {
    pub fn keep_all() -> Self {
        Self {
            required_field: None,
        }
    }

    pub fn requiring(field: impl Into<String>) -> Self {
        Self {
            required_field: Some(field.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// 解析 CSV 文字：第一個非空白行為標題列，其餘為資料列。
///
/// 每一行各自切欄位，引號不會跨行，所以一個沒有關閉的引號只影響該行。
/// 引號只在欄位開頭才被視為開引號，所以 `"Smith, Jr."` 會是同一個欄位。
/// 格式錯誤的行會被略過，不會回傳錯誤。
pub fn parse_csv(text: &str, options: &CsvOptions) -> CsvTable {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let headers = match lines.next().map(tokenize_line) {
        Some(Ok(fields)) => fields,
        Some(Err(e)) => {
            tracing::warn!("⚠️ Could not read CSV header row: {}", e);
            return CsvTable::default();
        }
        None => return CsvTable::default(),
    };

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        let fields = match tokenize_line(line) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!("⚠️ Skipping malformed CSV line {}: {}", index + 1, e);
                continue;
            }
        };

        if fields.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let data: IndexMap<String, String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), fields.get(i).cloned().unwrap_or_default()))
            .collect();
        let row = Row::new(data);

        if let Some(required) = &options.required_field {
            if row.get(required).trim().is_empty() {
                tracing::debug!("Skipping CSV record {}: '{}' is empty", index + 1, required);
                continue;
            }
        }

        rows.push(row);
    }

    tracing::debug!(
        "Parsed CSV: {} columns, {} rows kept",
        headers.len(),
        rows.len()
    );

    CsvTable { headers, rows }
}

fn tokenize_line(line: &str) -> csv::Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(clean_fields(&record))
}

fn clean_fields(record: &StringRecord) -> Vec<String> {
    record.iter().map(strip_quotes).collect()
}

fn strip_quotes(field: &str) -> String {
    let field = field.strip_prefix('"').unwrap_or(field);
    field.strip_suffix('"').unwrap_or(field).to_string()
}
