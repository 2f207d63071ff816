use crate::core::csv_parser::{parse_csv, CsvOptions, CsvTable};
use crate::core::export::{write_exports, ExportOptions};
use crate::core::pipeline::RowPipelineRunner;
use crate::domain::model::BatchRun;
use crate::domain::ports::{RtmApi, Storage};
use crate::utils::error::{Result, RtmError};

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub headers: Vec<String>,
    pub run: BatchRun,
    pub output_files: Vec<String>,
}

/// CSV → pipeline → 匯出檔
pub struct BatchEngine<A: RtmApi, S: Storage> {
    runner: RowPipelineRunner<A>,
    storage: S,
    csv_options: CsvOptions,
    export_options: ExportOptions,
}

impl<A: RtmApi, S: Storage> BatchEngine<A, S> {
    pub fn new(
        runner: RowPipelineRunner<A>,
        storage: S,
        csv_options: CsvOptions,
        export_options: ExportOptions,
    ) -> Self {
        Self {
            runner,
            storage,
            csv_options,
            export_options,
        }
    }

    pub fn parse(&self, csv_text: &str) -> Result<CsvTable> {
        let table = parse_csv(csv_text, &self.csv_options);
        tracing::info!(
            "📄 CSV loaded: {} rows, {} columns",
            table.rows.len(),
            table.headers.len()
        );

        if table.rows.is_empty() {
            return Err(RtmError::ValidationError {
                message: match &self.csv_options.required_field {
                    Some(field) => format!("CSV contains no rows with a non-empty '{}'", field),
                    None => "CSV contains no data rows".to_string(),
                },
            });
        }

        Ok(table)
    }

    pub async fn run(&self, csv_text: &str) -> Result<BatchReport> {
        // Extract
        let table = self.parse(csv_text)?;

        // Process
        let run = self.runner.run(&table.rows).await;

        // Export
        let output_files =
            write_exports(&self.storage, &run, &table.headers, self.export_options).await?;

        Ok(BatchReport {
            headers: table.headers,
            run,
            output_files,
        })
    }
}
