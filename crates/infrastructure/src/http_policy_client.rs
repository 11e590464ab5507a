use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use strata_application::{PolicyClient, PolicyRequest};
use strata_core::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct AuthorizeBody<'a> {
    subject: &'a str,
    subject_type: &'static str,
    permission: &'a str,
    object: &'a str,
    object_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
}

impl<'a> From<&'a PolicyRequest> for AuthorizeBody<'a> {
    fn from(request: &'a PolicyRequest) -> Self {
        Self {
            subject: request.subject.as_str(),
            subject_type: request.subject_kind.as_str(),
            permission: request.permission.as_str(),
            object: request.object.as_str(),
            object_type: request.object_kind.as_str(),
            domain: request.domain.as_ref().map(|domain| domain.as_str()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizeReply {
    authorized: bool,
}

/// Policy client calling an external relationship-based policy service over HTTP.
///
/// Transport failures and 5xx/429 responses are retried with linear backoff; a
/// definite answer, including a denial, is returned as soon as it arrives.
pub struct HttpPolicyClient {
    http_client: reqwest::Client,
    endpoint: Url,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpPolicyClient {
    /// Creates a client posting checks to `{base_url}/authorize`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &Url,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> AppResult<Self> {
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(path.as_str());
        }
        let endpoint = base_url.join("authorize").map_err(|error| {
            AppError::Validation(format!(
                "invalid policy service url '{base_url}': {error}"
            ))
        })?;

        Ok(Self {
            http_client,
            endpoint,
            max_attempts: max_attempts.max(1),
            retry_backoff_ms,
        })
    }

    /// Builds the HTTP client used for policy calls.
    pub fn build_http_client(timeout: Duration) -> AppResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build policy http client: {error}"))
            })
    }
}

#[async_trait]
impl PolicyClient for HttpPolicyClient {
    async fn authorize(&self, request: &PolicyRequest) -> AppResult<bool> {
        let body = AuthorizeBody::from(request);
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .post(self.endpoint.clone())
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    let reply = response.json::<AuthorizeReply>().await.map_err(|error| {
                        AppError::Internal(format!("invalid policy service response: {error}"))
                    })?;
                    debug!(
                        subject = %request.subject,
                        permission = %request.permission,
                        object = %request.object,
                        authorized = reply.authorized,
                        "policy decision received"
                    );
                    return Ok(reply.authorized);
                }
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient policy service status {}",
                        response.status()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(AppError::Internal(format!(
                        "policy service rejected check with status {status}: {text}"
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("policy service transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                warn!(
                    attempt,
                    max_attempts = self.max_attempts,
                    error = last_error.as_deref().unwrap_or_default(),
                    "policy check failed, retrying"
                );
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Internal(last_error.unwrap_or_else(|| {
            "policy check failed without a response".to_owned()
        })))
    }
}

#[cfg(test)]
mod tests;
