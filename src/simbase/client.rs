//! Simbase REST API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};

use crate::error::SimbaseError;
use crate::models::{
    Balance, Fleet, ImeiLock, SendSmsBody, SimListResponse, SimState, SmsListResponse,
};

/// Every outbound call is bounded by this timeout; there is no retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The logical operations the rest of the service needs from Simbase.
#[async_trait]
pub trait SimbaseApi: Send + Sync {
    /// `GET /simcards`, keyed by ICCID
    async fn fetch_fleet(&self) -> Result<Fleet, SimbaseError>;

    /// `GET /account/balance`
    async fn fetch_balance(&self) -> Result<Balance, SimbaseError>;

    async fn set_sim_state(&self, iccid: &str, state: SimState) -> Result<(), SimbaseError>;

    async fn set_imei_lock(&self, iccid: &str, lock: ImeiLock) -> Result<(), SimbaseError>;

    async fn send_sms(&self, iccid: &str, message: &str) -> Result<(), SimbaseError>;

    /// Most recent inbound SMS text, `None` when the SIM has received nothing
    async fn fetch_last_inbound_sms(&self, iccid: &str) -> Result<Option<String>, SimbaseError>;
}

/// Stateless wrapper around a shared `reqwest::Client`
pub struct SimbaseClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl SimbaseClient {
    pub fn new(http_client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, SimbaseError> {
        builder
            .send()
            .await
            .map_err(|e| SimbaseError::UpstreamUnavailable(e.to_string()))
    }

    /// Send and require a 2xx status
    async fn send_checked(&self, builder: RequestBuilder) -> Result<Response, SimbaseError> {
        let resp = self.send(builder).await?;
        ensure_success(resp.status())?;
        Ok(resp)
    }
}

fn ensure_success(status: StatusCode) -> Result<(), SimbaseError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SimbaseError::UpstreamError {
            status: status.as_u16(),
        })
    }
}

/// Status handling for `POST /simcards/{iccid}/sms`
fn send_sms_outcome(status: StatusCode) -> Result<(), SimbaseError> {
    match status.as_u16() {
        202 => Ok(()),
        400 => Err(SimbaseError::ValidationError),
        402 => Err(SimbaseError::InsufficientBalance),
        404 => Err(SimbaseError::SimNotFound),
        _ => ensure_success(status),
    }
}

#[async_trait]
impl SimbaseApi for SimbaseClient {
    async fn fetch_fleet(&self) -> Result<Fleet, SimbaseError> {
        // TODO: follow the list endpoint's cursor once fleets exceed one page
        let resp = self
            .send_checked(self.request(Method::GET, "/simcards"))
            .await?;
        let body: SimListResponse = resp.json().await?;
        let fleet = Fleet::from_records(body.simcards);

        tracing::debug!("[SimbaseClient] Fetched {} SIM cards", fleet.len());
        Ok(fleet)
    }

    async fn fetch_balance(&self) -> Result<Balance, SimbaseError> {
        let resp = self
            .send_checked(self.request(Method::GET, "/account/balance"))
            .await?;
        Ok(resp.json().await?)
    }

    async fn set_sim_state(&self, iccid: &str, state: SimState) -> Result<(), SimbaseError> {
        let body = serde_json::json!({ "state": state.as_str() });
        self.send_checked(
            self.request(Method::PATCH, &format!("/simcards/{}/state", iccid))
                .json(&body),
        )
        .await?;

        tracing::info!("[SimbaseClient] SIM {} state set to {}", iccid, state.as_str());
        Ok(())
    }

    async fn set_imei_lock(&self, iccid: &str, lock: ImeiLock) -> Result<(), SimbaseError> {
        let body = serde_json::json!({ "imei_lock": lock.as_str() });
        self.send_checked(
            self.request(Method::PATCH, &format!("/simcards/{}", iccid))
                .json(&body),
        )
        .await?;

        tracing::info!("[SimbaseClient] SIM {} IMEI lock set to {}", iccid, lock.as_str());
        Ok(())
    }

    async fn send_sms(&self, iccid: &str, message: &str) -> Result<(), SimbaseError> {
        let resp = self
            .send(
                self.request(Method::POST, &format!("/simcards/{}/sms", iccid))
                    .json(&SendSmsBody { message }),
            )
            .await?;
        send_sms_outcome(resp.status())
    }

    async fn fetch_last_inbound_sms(&self, iccid: &str) -> Result<Option<String>, SimbaseError> {
        let resp = self
            .send_checked(self.request(Method::GET, &format!("/simcards/{}/sms", iccid)))
            .await?;
        let body: SmsListResponse = resp.json().await?;
        Ok(body.last_inbound())
    }
}
