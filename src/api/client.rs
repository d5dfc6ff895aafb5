use crate::api::error::{error_message_from_body, ApiError, ApiResult};
use crate::api::models::*;
use crate::config::ApiConfig;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// What `GET /feedback/{id}/export` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportedReport {
    Text(ExportPayload),
    Binary(Vec<u8>),
}

/// Thin REST wrapper. One method per backend call; no retries.
///
/// Cloning is cheap (the underlying `reqwest::Client` is reference counted),
/// so spawned tasks take their own copy via [`ApiClient::with_token`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_http(&config.base_url, http))
    }

    pub(crate) fn with_http(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            token: None,
        }
    }

    /// Copy of this client that authenticates as `token`.
    pub fn with_token(&self, token: Option<&str>) -> Self {
        Self {
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            token: token.map(str::to_string),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- auth --------------------------------------------------------------

    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthResponse> {
        self.json(self.request(Method::POST, "/auth/login").json(credentials))
            .await
    }

    pub async fn register(&self, data: &RegisterData) -> ApiResult<AuthResponse> {
        self.json(self.request(Method::POST, "/auth/register").json(data))
            .await
    }

    pub async fn profile(&self) -> ApiResult<User> {
        self.json(self.request(Method::GET, "/auth/profile")).await
    }

    // -- feedback ----------------------------------------------------------

    pub async fn feedback_list(&self) -> ApiResult<Vec<Feedback>> {
        self.json(self.request(Method::GET, "/feedback/")).await
    }

    pub async fn submit_feedback(&self, feedback: &NewFeedback) -> ApiResult<Created> {
        self.json(self.request(Method::POST, "/feedback/").json(feedback))
            .await
    }

    pub async fn dashboard(&self) -> ApiResult<DashboardData> {
        self.json(self.request(Method::GET, "/feedback/dashboard"))
            .await
    }

    pub async fn request_feedback(&self, request: &NewFeedbackRequest) -> ApiResult<Created> {
        self.json(self.request(Method::POST, "/feedback/request").json(request))
            .await
    }

    pub async fn feedback_requests(&self) -> ApiResult<Vec<FeedbackRequest>> {
        self.json(self.request(Method::GET, "/feedback/requests"))
            .await
    }

    pub async fn add_comment(&self, feedback_id: u64, comment: &NewComment) -> ApiResult<Created> {
        let path = format!("/feedback/{}/comments", feedback_id);
        self.json(self.request(Method::POST, &path).json(comment))
            .await
    }

    pub async fn export_feedback(&self, feedback_id: u64) -> ApiResult<ExportedReport> {
        let path = format!("/feedback/{}/export", feedback_id);
        let response = self.execute(self.request(Method::GET, &path)).await?;
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);
        let bytes = response.bytes().await?;
        if is_json {
            if let Ok(payload) = serde_json::from_slice::<ExportPayload>(&bytes) {
                return Ok(ExportedReport::Text(payload));
            }
        }
        Ok(ExportedReport::Binary(bytes.to_vec()))
    }

    pub async fn feedback_by_tags(&self, tags: &[String]) -> ApiResult<Vec<Feedback>> {
        let request = self
            .request(Method::GET, "/feedback/by-tags")
            .query(&[("tags", tags.join(","))]);
        self.json(request).await
    }

    /// Users selectable as feedback receivers.
    pub async fn team_members(&self) -> ApiResult<Vec<User>> {
        self.json(self.request(Method::GET, "/feedback/team")).await
    }

    // -- users -------------------------------------------------------------

    pub async fn users(&self) -> ApiResult<Vec<TeamMember>> {
        self.json(self.request(Method::GET, "/users/")).await
    }

    pub async fn user(&self, user_id: u64) -> ApiResult<User> {
        let path = format!("/users/{}", user_id);
        self.json(self.request(Method::GET, &path)).await
    }

    pub async fn update_user(&self, user_id: u64, update: &ProfileUpdate) -> ApiResult<User> {
        let path = format!("/users/{}", user_id);
        self.json(self.request(Method::PUT, &path).json(update))
            .await
    }

    pub async fn team(&self) -> ApiResult<Vec<User>> {
        self.json(self.request(Method::GET, "/users/team")).await
    }

    // -- notifications -----------------------------------------------------

    pub async fn notifications(&self) -> ApiResult<Vec<Notification>> {
        self.json(self.request(Method::GET, "/notifications/"))
            .await
    }

    pub async fn mark_notification_read(&self, notification_id: u64) -> ApiResult<Acknowledged> {
        let path = format!("/notifications/{}/read", notification_id);
        self.json(self.request(Method::PUT, &path)).await
    }

    pub async fn send_notification(&self, notification: &NewNotification) -> ApiResult<Created> {
        self.json(self.request(Method::POST, "/notifications/").json(notification))
            .await
    }

    pub async fn health(&self) -> ApiResult<Health> {
        self.json(self.request(Method::GET, "/health")).await
    }

    // -- plumbing ----------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(ACCEPT, "application/json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn execute(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                let url = e.url().map(|u| u.to_string()).unwrap_or_default();
                intercept_failure(None, &e.to_string(), &url);
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(%status, url = %response.url(), "api request ok");
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        intercept_failure(Some(status.as_u16()), &body, &url);
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message_from_body(&body),
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Single observation point for failed calls. Logs and lets the caller
/// propagate the error untouched.
fn intercept_failure(status: Option<u16>, body: &str, url: &str) {
    warn!(?status, url, body, "API error");
}
