use crate::domain::ports::{
    ApiReply, LoginRequest, RtmApi, TreatmentRequest, VisitRequest, WorkflowRequest,
};
use crate::utils::error::{Result, RtmError};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// 透過 HTTP 呼叫 RTM 服務的 `RtmApi` 實作
#[derive(Debug, Clone)]
pub struct HttpRtmApi {
    client: Client,
    base_url: Url,
}

impl HttpRtmApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(RtmError::ConfigError {
                message: format!("api.base_url cannot be used as a base URL: {}", base_url),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 以路徑片段組出端點，visit id 等參數會被正確編碼
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RtmError::ConfigError {
                message: format!("api.base_url cannot be used as a base URL: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &T,
    ) -> Result<ApiReply> {
        let url = self.endpoint(segments)?;
        tracing::debug!("Making API request: {} {}", method, url);

        let response = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::debug!("API response (status {}) is not JSON: {}", status, e);
                serde_json::Value::Null
            })
        };

        tracing::debug!("API response status: {}", status);
        Ok(ApiReply::new(status, body))
    }
}

#[async_trait]
impl RtmApi for HttpRtmApi {
    async fn login(&self, request: &LoginRequest) -> Result<ApiReply> {
        self.send(Method::POST, &["api", "login"], request).await
    }

    async fn create_workflow(&self, request: &WorkflowRequest) -> Result<ApiReply> {
        self.send(Method::POST, &["api", "patient-workflow"], request)
            .await
    }

    async fn check_in(&self, request: &VisitRequest) -> Result<ApiReply> {
        self.send(Method::PUT, &["api", "check-in"], request).await
    }

    async fn start_visit(&self, request: &VisitRequest) -> Result<ApiReply> {
        self.send(Method::PUT, &["api", "start-visit"], request).await
    }

    async fn add_treatment(&self, visit_id: &str, request: &TreatmentRequest) -> Result<ApiReply> {
        self.send(Method::PUT, &["api", "visits", visit_id, "treatment"], request)
            .await
    }
}
