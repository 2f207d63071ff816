use clap::Parser;
use rtm_batch::domain::model::{BatchSummary, RunStatus};
use rtm_batch::utils::error::{ErrorSeverity, RtmError};
use rtm_batch::utils::{logger, validation::Validate};
use rtm_batch::{BatchEngine, CliConfig, HttpRtmApi, LocalStorage, RowPipelineRunner, RtmConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting rtm-batch");

    let config = match cli.validate().and_then(|_| cli.resolve()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if cli.verbose {
        tracing::debug!(
            "Resolved config: api={} output={} row_delay_ms={}",
            config.api.base_url,
            config.output.output_path,
            config.run.row_delay_ms
        );
    }

    let csv_text = match tokio::fs::read_to_string(&cli.csv).await {
        Ok(text) => text,
        Err(e) => exit_with(&RtmError::IoError(e)),
    };
    tracing::info!(
        "📁 Loading CSV file: {} ({:.1} KB)",
        cli.csv,
        csv_text.len() as f64 / 1024.0
    );

    if cli.dry_run {
        return dry_run(&config, &csv_text);
    }

    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    let api = match HttpRtmApi::new(&config.api.base_url, config.timeout()) {
        Ok(api) => api,
        Err(e) => exit_with(&e),
    };
    let engine = BatchEngine::new(
        RowPipelineRunner::new(api, config.run_settings()),
        LocalStorage::new(config.output.output_path.clone()),
        config.csv_options(),
        config.export_options(),
    );

    match engine.run(&csv_text).await {
        Ok(report) => {
            print_summary(&report.run.summary);
            for file in &report.output_files {
                println!("📁 Output saved to: {}/{}", config.output.output_path, file);
            }

            if report.run.status == RunStatus::AuthenticationFailed {
                let reason = report
                    .run
                    .outcomes
                    .first()
                    .and_then(|o| o.error.clone())
                    .unwrap_or_else(|| "Login failed".to_string());
                exit_with(&RtmError::AuthenticationError { message: reason });
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

fn dry_run(config: &RtmConfig, csv_text: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("🔍 DRY RUN MODE - No API calls will be made");
    let table = rtm_batch::parse_csv(csv_text, &config.csv_options());

    println!("Columns ({}): {}", table.headers.len(), table.headers.join(", "));
    println!("Rows to process: {}", table.rows.len());
    for (index, row) in table.rows.iter().enumerate() {
        let treatments = rtm_batch::core::treatments::plan_treatments(row);
        println!(
            "  {:>3}. {} ({}) case={} treatments=[{}]",
            index + 1,
            row.display_name(),
            row.patient_id(),
            row.get("Case"),
            treatments
                .iter()
                .map(|t| format!("{}x{}", t.cpt_code, t.units))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!(
        "✅ RTM processing completed in {:.2}s: {} successful, {} failed, {} treatments added",
        summary.elapsed().as_secs_f64(),
        summary.succeeded,
        summary.failed,
        summary.treatments_added
    );
    println!(
        "📊 Success rate {:.1}%, average {:.2}s per patient",
        summary.success_rate(),
        summary.average_per_row().as_secs_f64()
    );
}

fn exit_with(e: &RtmError) -> ! {
    tracing::error!("❌ rtm-batch failed: {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
