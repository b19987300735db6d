//! REST API client for the CRM backend.
//!
//! DESIGN
//! ======
//! [`CrmApi`] is the seam the session store and dashboard depend on, so tests
//! and alternative hosts can substitute a fake. [`HttpApi`] is the `reqwest`
//! implementation.
//!
//! Every request reads the credential from the shared [`KeyValueStore`] at send
//! time and attaches it as a bearer header when present. A missing credential
//! is not an error here; the server decides authorization.
//!
//! ERROR HANDLING
//! ==============
//! Nothing is swallowed. Transport failures become [`ApiError::Network`],
//! non-success statuses are classified per endpoint family, and undecodable
//! bodies become [`ApiError::Parse`].

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{ApiError, Endpoint, classify, server_message};
use super::types::{Activity, Contact, Deal, Lead, LoginRequest, LoginResponse, Profile, RegisterRequest, Registration};
use crate::config::ClientConfig;
use crate::state::storage::{KeyValueStore, TOKEN_KEY};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const ME_PATH: &str = "/api/auth/me";
pub const LEADS_PATH: &str = "/api/leads";
pub const CONTACTS_PATH: &str = "/api/contacts";
pub const DEALS_PATH: &str = "/api/deals";
pub const ACTIVITIES_PATH: &str = "/api/activities";
pub const UPCOMING_ACTIVITIES_PATH: &str = "/api/activities/upcoming";
pub const OVERDUE_ACTIVITIES_PATH: &str = "/api/activities/overdue";
pub const DEALS_CLOSING_SOON_PATH: &str = "/api/deals/closing-soon";
pub const PIPELINE_VALUE_PATH: &str = "/api/deals/stats/pipeline-value";

/// Body the backend sends instead of an empty JSON array.
const NO_DATA_SENTINEL: &str = "no data";

// =============================================================================
// TRAIT
// =============================================================================

/// Typed calls against the CRM API.
#[async_trait::async_trait]
pub trait CrmApi: Send + Sync {
    /// `POST /api/auth/login`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Auth`] for rejected credentials, [`ApiError::MissingToken`]
    /// when the response has no token, or a network/server error.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// `POST /api/auth/register`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`], [`ApiError::Conflict`], or a network/server error.
    async fn register(&self, request: &RegisterRequest) -> Result<Registration, ApiError>;

    /// `GET /api/auth/me`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthenticated`] without a valid credential, or a network/server error.
    async fn fetch_current_profile(&self) -> Result<Profile, ApiError>;

    /// `GET /api/leads`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the backend's empty-list sentinel.
    async fn leads(&self) -> Result<Vec<Lead>, ApiError>;

    /// `GET /api/contacts`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the backend's empty-list sentinel.
    async fn contacts(&self) -> Result<Vec<Contact>, ApiError>;

    /// `GET /api/deals`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the backend's empty-list sentinel.
    async fn deals(&self) -> Result<Vec<Deal>, ApiError>;

    /// `GET /api/activities`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the backend's empty-list sentinel.
    async fn activities(&self) -> Result<Vec<Activity>, ApiError>;

    /// `GET /api/activities/upcoming`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the backend's empty-list sentinel.
    async fn upcoming_activities(&self) -> Result<Vec<Activity>, ApiError>;

    /// `GET /api/activities/overdue`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the backend's empty-list sentinel.
    async fn overdue_activities(&self) -> Result<Vec<Activity>, ApiError>;

    /// `GET /api/deals/closing-soon`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the backend's empty-list sentinel.
    async fn deals_closing_soon(&self) -> Result<Vec<Deal>, ApiError>;

    /// `GET /api/deals/stats/pipeline-value`. A `null` total reads as zero.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`].
    async fn pipeline_value(&self) -> Result<f64, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// `reqwest`-backed [`CrmApi`].
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn KeyValueStore>,
}

/// Status and body of a completed exchange.
struct RawResponse {
    status: u16,
    body: String,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl HttpApi {
    /// Build a client for `config.base_url` that reads credentials from `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned(), storage })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the stored credential, if any.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.storage.get(TOKEN_KEY) {
            Some(token) if !token.trim().is_empty() => request.bearer_auth(token.trim()),
            _ => request,
        }
    }

    async fn dispatch(
        &self,
        method: &'static str,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<RawResponse, ApiError> {
        tracing::debug!(method, path, "api request");
        let response = self.authorize(request).send().await.map_err(|e| {
            tracing::warn!(method, path, error = %e, "api request failed");
            ApiError::Network(e.to_string())
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if (200..300).contains(&status) {
            tracing::debug!(method, path, status, "api response");
        } else {
            tracing::warn!(method, path, status, "api error response");
        }
        Ok(RawResponse { status, body })
    }

    async fn get(&self, path: &str) -> Result<RawResponse, ApiError> {
        let request = self.http.get(self.url(path));
        self.dispatch("GET", path, request).await
    }

    async fn post_json(&self, path: &str, body: &(impl Serialize + Sync)) -> Result<RawResponse, ApiError> {
        let request = self.http.post(self.url(path)).json(body);
        self.dispatch("POST", path, request).await
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let raw = self.get(path).await?;
        decode_list(&raw)
    }
}

#[async_trait::async_trait]
impl CrmApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let raw = self
            .post_json(LOGIN_PATH, &LoginRequest { email, password })
            .await?;
        if !raw.is_success() {
            return Err(classify(Endpoint::Login, raw.status, &raw.body));
        }
        decode_login(&raw.body)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<Registration, ApiError> {
        let raw = self.post_json(REGISTER_PATH, request).await?;
        if !raw.is_success() {
            return Err(classify(Endpoint::Register, raw.status, &raw.body));
        }
        Ok(decode_registration(&raw.body))
    }

    async fn fetch_current_profile(&self) -> Result<Profile, ApiError> {
        let raw = self.get(ME_PATH).await?;
        if !raw.is_success() {
            return Err(classify(Endpoint::Protected, raw.status, &raw.body));
        }
        serde_json::from_str(&raw.body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn leads(&self) -> Result<Vec<Lead>, ApiError> {
        self.get_list(LEADS_PATH).await
    }

    async fn contacts(&self) -> Result<Vec<Contact>, ApiError> {
        self.get_list(CONTACTS_PATH).await
    }

    async fn deals(&self) -> Result<Vec<Deal>, ApiError> {
        self.get_list(DEALS_PATH).await
    }

    async fn activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.get_list(ACTIVITIES_PATH).await
    }

    async fn upcoming_activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.get_list(UPCOMING_ACTIVITIES_PATH).await
    }

    async fn overdue_activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.get_list(OVERDUE_ACTIVITIES_PATH).await
    }

    async fn deals_closing_soon(&self) -> Result<Vec<Deal>, ApiError> {
        self.get_list(DEALS_CLOSING_SOON_PATH).await
    }

    async fn pipeline_value(&self) -> Result<f64, ApiError> {
        let raw = self.get(PIPELINE_VALUE_PATH).await?;
        if !raw.is_success() {
            return Err(classify(Endpoint::Protected, raw.status, &raw.body));
        }
        decode_amount(&raw.body)
    }
}

// =============================================================================
// DECODING
// =============================================================================

fn decode_login(body: &str) -> Result<LoginResponse, ApiError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))?;
    let has_token = value
        .get("token")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|t| !t.trim().is_empty());
    if !has_token {
        return Err(ApiError::MissingToken);
    }
    serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
}

fn decode_registration(body: &str) -> Registration {
    if let Ok(profile) = serde_json::from_str::<Profile>(body) {
        return Registration::Profile(profile);
    }
    if let Ok(serde_json::Value::String(text)) = serde_json::from_str::<serde_json::Value>(body) {
        return Registration::Acknowledged(text);
    }
    Registration::Acknowledged(server_message(body))
}

fn is_no_data(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed == NO_DATA_SENTINEL || trimmed == format!("\"{NO_DATA_SENTINEL}\"")
}

fn decode_list<T: DeserializeOwned>(raw: &RawResponse) -> Result<Vec<T>, ApiError> {
    if is_no_data(&raw.body) && (raw.is_success() || raw.status == 404) {
        return Ok(Vec::new());
    }
    if !raw.is_success() {
        return Err(classify(Endpoint::Protected, raw.status, &raw.body));
    }
    if raw.body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&raw.body).map_err(|e| ApiError::Parse(e.to_string()))
}

fn decode_amount(body: &str) -> Result<f64, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| ApiError::Parse(e.to_string()))?;
    match value {
        serde_json::Value::Null => Ok(0.0),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ApiError::Parse(format!("amount out of range: {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ApiError::Parse(format!("invalid amount: {s}"))),
        other => Err(ApiError::Parse(format!("unexpected amount: {other}"))),
    }
}
