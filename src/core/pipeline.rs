use crate::core::run_log::RunLog;
use crate::core::treatments::plan_treatments;
use crate::domain::model::{
    BatchRun, BatchSummary, PipelineOutcome, Row, RunStatus, TreatmentOutcome, CASE_COLUMN,
    CLINIC_LOCATION_COLUMN, COMMENTS_COLUMN, PROVIDER_ID_COLUMN,
};
use crate::domain::ports::{
    ApiReply, LoginRequest, RtmApi, TreatmentRequest, VisitRequest, WorkflowRequest,
};
use crate::utils::error::{Result, RtmError};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// 建立 workflow 時使用的固定看診時段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitWindow {
    pub start_time: String,
    pub end_time: String,
}

impl Default for VisitWindow {
    fn default() -> Self {
        Self {
            start_time: "2025/11/21/0100".to_string(),
            end_time: "2025/11/21/0135".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub credentials: Credentials,
    pub visit_window: VisitWindow,
    /// 每列處理完後的等待時間，只為了讓日誌容易閱讀
    pub row_delay: Duration,
}

/// 依序處理每一列：登入一次，然後每列執行
/// workflow → check-in → start visit → treatments。
pub struct RowPipelineRunner<A: RtmApi> {
    api: A,
    settings: RunSettings,
}

impl<A: RtmApi> RowPipelineRunner<A> {
    pub fn new(api: A, settings: RunSettings) -> Self {
        Self { api, settings }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn run(&self, rows: &[Row]) -> BatchRun {
        let mut log = RunLog::new();
        let started = Instant::now();

        log.info(format!("Starting RTM processing for {} patients", rows.len()), None);

        let token = match self.authenticate(&mut log).await {
            Ok(token) => token,
            Err(e) => {
                let message = format!("Login failed: {}", e);
                log.error(message.clone(), None, None);
                let outcomes = vec![PipelineOutcome::failed(Row::default(), message)];
                let summary = BatchSummary::from_outcomes(&outcomes, started.elapsed());
                return BatchRun {
                    status: RunStatus::AuthenticationFailed,
                    outcomes,
                    logs: log.into_entries(),
                    summary,
                };
            }
        };

        let mut outcomes = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let patient_id = row.patient_id();
            log.info(
                format!(
                    "Processing patient {}/{}: {} ({})",
                    index + 1,
                    rows.len(),
                    row.display_name(),
                    patient_id
                ),
                Some(patient_id),
            );

            outcomes.push(self.process_row(row, &token, &mut log).await);

            if !self.settings.row_delay.is_zero() {
                tokio::time::sleep(self.settings.row_delay).await;
            }
        }

        let summary = BatchSummary::from_outcomes(&outcomes, started.elapsed());
        log.success(
            format!(
                "RTM processing completed in {:.2}s: {} successful, {} failed, {} treatments added",
                summary.elapsed().as_secs_f64(),
                summary.succeeded,
                summary.failed,
                summary.treatments_added
            ),
            Some(json!({
                "totalTime": format!("{:.2}", summary.elapsed().as_secs_f64()),
                "successRate": format!("{:.1}%", summary.success_rate()),
                "averageTimePerPatient": format!("{:.2}s", summary.average_per_row().as_secs_f64()),
            })),
            None,
        );

        BatchRun {
            status: RunStatus::Completed,
            outcomes,
            logs: log.into_entries(),
            summary,
        }
    }

    async fn authenticate(&self, log: &mut RunLog) -> Result<String> {
        log.info("Attempting to authenticate with RTM system...", None);

        let request = LoginRequest {
            email: self.settings.credentials.email.clone(),
            password: self.settings.credentials.password.clone(),
        };
        let reply = self.api.login(&request).await?;

        log.api(
            format!("Login API call: POST /api/login - Status: {}", reply.status),
            Some(json!({ "status": reply.status })),
            None,
        );

        if !reply.is_success() {
            return Err(RtmError::AuthenticationError {
                message: format!("Login failed with status: {}", reply.status),
            });
        }

        let token = reply
            .body
            .pointer("/data/tokens/access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RtmError::AuthenticationError {
                message: "Failed to get access token".to_string(),
            })?;

        log.success("Authentication successful", Some(reply.body.clone()), None);
        Ok(token.to_string())
    }

    /// 單列的錯誤在這裡被攔下，記錄到該列結果，不影響其他列
    async fn process_row(&self, row: &Row, token: &str, log: &mut RunLog) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::pending(row.clone());
        let patient_id = row.patient_id();

        match self.run_steps(row, token, &mut outcome, log).await {
            Ok(()) => {
                outcome.success = true;
                outcome.message = Some("Processing completed successfully".to_string());
                log.success(
                    format!(
                        "Patient {} processed successfully with {} treatments",
                        row.display_name(),
                        outcome.treatments_added()
                    ),
                    None,
                    Some(patient_id),
                );
            }
            Err(e) => {
                let error = e.to_string();
                log.error(
                    format!("Patient {} processing failed: {}", row.display_name(), error),
                    None,
                    Some(patient_id),
                );
                outcome.success = false;
                outcome.message = Some(format!("Processing failed: {}", error));
                outcome.error = Some(error);
            }
        }

        outcome
    }

    async fn run_steps(
        &self,
        row: &Row,
        token: &str,
        outcome: &mut PipelineOutcome,
        log: &mut RunLog,
    ) -> Result<()> {
        let patient_id = Some(row.patient_id());
        let name = row.display_name();

        // Step 1: workflow
        log.info(format!("Creating patient workflow for {}...", name), patient_id);
        let request = WorkflowRequest {
            token: token.to_string(),
            patient_id: row.patient_id().to_string(),
            clinic_location: row.get(CLINIC_LOCATION_COLUMN).to_string(),
            provider_id: row.get(PROVIDER_ID_COLUMN).to_string(),
            start_time: self.settings.visit_window.start_time.clone(),
            end_time: self.settings.visit_window.end_time.clone(),
            case: row.get(CASE_COLUMN).to_string(),
        };
        log.api(
            "Creating workflow: POST /api/patient-workflow",
            serde_json::to_value(&request).ok(),
            patient_id,
        );
        let reply = self.api.create_workflow(&request).await?;
        log_reply(log, "Workflow", &reply, patient_id);

        if let Some(data) = reply.body.get("data").filter(|data| data.is_object()) {
            outcome.case_id = id_field(data, "case_id");
            outcome.organization_id = id_field(data, "organization_id");
            outcome.person_id = id_field(data, "person_id");
            outcome.visit_id = id_field(data, "visit_id");
        }

        let visit_id = outcome
            .visit_id
            .clone()
            .ok_or_else(|| RtmError::WorkflowError {
                message: "No visit_id received from patient-workflow".to_string(),
            })?;
        log.success(
            format!("Workflow created successfully. Visit ID: {}", visit_id),
            Some(json!({ "case_id": outcome.case_id, "visit_id": visit_id })),
            patient_id,
        );
        let visit = VisitRequest {
            token: token.to_string(),
            visit_id: visit_id.clone(),
        };

        // Step 2: check-in
        log.info(format!("Checking in patient {}...", name), patient_id);
        log.api("Check-in: PUT /api/check-in", serde_json::to_value(&visit).ok(), patient_id);
        let reply = self.api.check_in(&visit).await?;
        log_reply(log, "Check-in", &reply, patient_id);
        outcome.checkin_success = Some(reply.is_success());
        if reply.is_success() {
            log.success("Patient checked in successfully", None, patient_id);
        } else {
            log.warning(
                format!("Check-in failed: {}", reply_message(&reply)),
                Some(reply.body.clone()),
                patient_id,
            );
        }

        // Step 3: start visit
        log.info(format!("Starting visit for {}...", name), patient_id);
        log.api("Start visit: PUT /api/start-visit", serde_json::to_value(&visit).ok(), patient_id);
        let reply = self.api.start_visit(&visit).await?;
        log_reply(log, "Start visit", &reply, patient_id);
        outcome.start_visit_success = Some(reply.is_success());
        if reply.is_success() {
            log.success("Visit started successfully", None, patient_id);
        } else {
            log.warning(
                format!("Start visit failed: {}", reply_message(&reply)),
                Some(reply.body.clone()),
                patient_id,
            );
        }

        // Step 4: treatments
        let plan = plan_treatments(row);
        log.info(format!("Processing {} treatments...", plan.len()), patient_id);

        for treatment in plan {
            let modifier_note = treatment
                .modifier
                .as_deref()
                .map(|m| format!(" with modifier {}", m))
                .unwrap_or_default();
            log.info(
                format!(
                    "Adding treatment: {} ({} units){}",
                    treatment.cpt_code, treatment.units, modifier_note
                ),
                patient_id,
            );

            let request = TreatmentRequest {
                token: token.to_string(),
                cpt_code: treatment.cpt_code.clone(),
                modifier_order: treatment.modifier_order(),
                units: treatment.units_json(),
                exercise_details: row.get(COMMENTS_COLUMN).to_string(),
            };
            log.api(
                format!("Adding treatment: PUT /api/visits/{}/treatment", visit_id),
                serde_json::to_value(&request).ok(),
                patient_id,
            );

            let (success, message) = match self.api.add_treatment(&visit_id, &request).await {
                Ok(reply) => {
                    log_reply(log, "Treatment", &reply, patient_id);
                    if reply.is_success() {
                        log.success(
                            format!("Treatment {} added successfully", treatment.cpt_code),
                            None,
                            patient_id,
                        );
                    } else {
                        log.error(
                            format!(
                                "Treatment {} failed: {}",
                                treatment.cpt_code,
                                reply_message(&reply)
                            ),
                            Some(reply.body.clone()),
                            patient_id,
                        );
                    }
                    (reply.is_success(), reply.message())
                }
                Err(e) => {
                    let error = e.to_string();
                    log.error(
                        format!("Treatment {} error: {}", treatment.cpt_code, error),
                        None,
                        patient_id,
                    );
                    (false, Some(error))
                }
            };

            outcome.treatments.push(TreatmentOutcome {
                cpt_code: treatment.cpt_code,
                units: treatment.units,
                modifier: treatment.modifier,
                success,
                message,
            });
        }

        Ok(())
    }
}

fn log_reply(log: &mut RunLog, step: &str, reply: &ApiReply, patient_id: Option<&str>) {
    log.api(
        format!("{} API response: Status {}", step, reply.status),
        Some(json!({ "status": reply.status, "response": reply.body })),
        patient_id,
    );
}

fn reply_message(reply: &ApiReply) -> String {
    reply.message().unwrap_or_else(|| "Unknown error".to_string())
}

/// 外部系統的 id 可能是字串或數字
fn id_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
