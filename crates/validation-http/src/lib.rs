#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NasNet Validation HTTP
//!
//! [`HttpValidator`] sends the pipeline's batched request to a remote
//! validation service as camelCase JSON and decodes its per-stage answer.

use std::time::Duration;

use async_trait::async_trait;
use nasnet_validation::{ServiceError, ValidationRequest, ValidationResponse, Validator};
use reqwest::Client;
use url::Url;

/// Header carrying the target router.
pub const ROUTER_ID_HEADER: &str = "X-Router-Id";

/// Longest error body kept in [`ServiceError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// A [`Validator`] that talks to the validation service over HTTP.
///
/// ```no_run
/// use std::time::Duration;
/// use nasnet_validation_http::HttpValidator;
///
/// let validator = HttpValidator::new("http://192.168.88.1:8080/api/validate".parse().unwrap())
///     .with_timeout(Duration::from_secs(5))
///     .with_bearer_token("secret");
/// ```
#[derive(Clone)]
pub struct HttpValidator {
    client: Client,
    endpoint: Url,
    timeout: Option<Duration>,
    token: Option<String>,
}

impl HttpValidator {
    /// Validator posting to `endpoint` with a default client.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::default(),
            endpoint,
            timeout: None,
            token: None,
        }
    }

    /// Use a preconfigured client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Bound each request; the pipeline's stage timeout lands here.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send `Authorization: Bearer <token>`.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpValidator")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Validator for HttpValidator {
    async fn validate(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationResponse, ServiceError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(router_id) = &request.router_id {
            builder = builder.header(ROUTER_ID_HEADER, router_id);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            stages = request.stages.len(),
            "posting validation request"
        );

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Transport(format!(
                    "validation request to {} timed out",
                    self.endpoint
                ))
            } else {
                ServiceError::transport(e)
            }
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(ServiceError::transport)?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let body: String = text.chars().take(MAX_ERROR_BODY).collect();
            tracing::warn!(status = status.as_u16(), "validation service rejected request");
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_slice(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let validator = HttpValidator::new("http://localhost:8080/validate".parse().unwrap())
            .with_bearer_token("hunter2");
        let debug = format!("{validator:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn endpoint_is_kept() {
        let url: Url = "http://10.0.0.1/api/validate".parse().unwrap();
        assert_eq!(HttpValidator::new(url.clone()).endpoint(), &url);
    }
}
