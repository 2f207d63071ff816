use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRequest {
    pub token: String,
    pub patient_id: String,
    pub clinic_location: String,
    pub provider_id: String,
    pub start_time: String,
    pub end_time: String,
    pub case: String,
}

/// check-in 與 start-visit 共用的請求內容
#[derive(Debug, Clone, Serialize)]
pub struct VisitRequest {
    pub token: String,
    pub visit_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreatmentRequest {
    pub token: String,
    pub cpt_code: String,
    pub modifier_order: Vec<String>,
    pub units: Value,
    pub exercise_details: String,
}

/// 外部 API 的回應：HTTP 狀態碼加上（可能為 Null 的）JSON 內容
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn message(&self) -> Option<String> {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// 外部 RTM 服務（登入、建立 workflow、報到、開始看診、新增治療）
#[async_trait]
pub trait RtmApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<ApiReply>;
    async fn create_workflow(&self, request: &WorkflowRequest) -> Result<ApiReply>;
    async fn check_in(&self, request: &VisitRequest) -> Result<ApiReply>;
    async fn start_visit(&self, request: &VisitRequest) -> Result<ApiReply>;
    async fn add_treatment(&self, visit_id: &str, request: &TreatmentRequest) -> Result<ApiReply>;
}
