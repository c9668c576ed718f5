use std::time::Duration;

use async_trait::async_trait;
use careline_core::config::LiveApiConfig;
use careline_core::ToolError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

const ELIGIBILITY_SERVICE: &str = "eligibility";
const CLAIMS_SERVICE: &str = "claims";

/// System of record for member eligibility and claim status.
#[async_trait]
pub trait LiveDataService: Send + Sync {
    async fn eligibility(&self, member_id: &str) -> Result<Value, ToolError>;
    async fn claim_status(&self, claim_id: &str) -> Result<Value, ToolError>;
}

/// Rejects identifiers that are empty or would alter the request path.
pub fn validate_identifier<'a>(field: &str, raw: &'a str) -> Result<&'a str, ToolError> {
    let trimmed = raw.trim();
    let malformed = trimmed.is_empty()
        || trimmed.contains("..")
        || trimmed.chars().any(|ch| ch.is_whitespace() || matches!(ch, '/' | '\\' | '?' | '#' | '%'));
    if malformed {
        return Err(ToolError::invalid_identifier(field));
    }
    Ok(trimmed)
}

pub struct HttpLiveDataClient {
    base_url: String,
    api_key: Option<SecretString>,
    client: Client,
}

impl HttpLiveDataClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), api_key, client })
    }

    pub fn from_config(config: &LiveApiConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn fetch(&self, service: &str, path: &str) -> Result<Value, ToolError> {
        let url = format!("{}/{path}", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| ToolError::upstream(service, error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                event_name = "live_data.non_success",
                service,
                status = status.as_u16(),
                "live data service returned non-success status"
            );
            return Err(ToolError::upstream(service, format!("HTTP {}", status.as_u16())));
        }

        response
            .json::<Value>()
            .await
            .map_err(|error| ToolError::upstream(service, format!("invalid response body: {error}")))
    }
}

#[async_trait]
impl LiveDataService for HttpLiveDataClient {
    async fn eligibility(&self, member_id: &str) -> Result<Value, ToolError> {
        let member_id = validate_identifier("member_id", member_id)?;
        self.fetch(ELIGIBILITY_SERVICE, &format!("eligibility/{member_id}")).await
    }

    async fn claim_status(&self, claim_id: &str) -> Result<Value, ToolError> {
        let claim_id = validate_identifier("claim_id", claim_id)?;
        self.fetch(CLAIMS_SERVICE, &format!("claims/{claim_id}")).await
    }
}

/// Fixed responses for demos and tests; `available = false` simulates an outage.
#[derive(Clone, Debug)]
pub struct StaticLiveData {
    available: bool,
}

impl StaticLiveData {
    pub fn healthy() -> Self {
        Self { available: true }
    }

    pub fn unavailable() -> Self {
        Self { available: false }
    }
}

#[async_trait]
impl LiveDataService for StaticLiveData {
    async fn eligibility(&self, member_id: &str) -> Result<Value, ToolError> {
        let member_id = validate_identifier("member_id", member_id)?;
        if !self.available {
            return Err(ToolError::upstream(ELIGIBILITY_SERVICE, "connection refused"));
        }
        Ok(json!({ "member_id": member_id, "eligibility": "ACTIVE" }))
    }

    async fn claim_status(&self, claim_id: &str) -> Result<Value, ToolError> {
        let claim_id = validate_identifier("claim_id", claim_id)?;
        if !self.available {
            return Err(ToolError::upstream(CLAIMS_SERVICE, "connection refused"));
        }
        Ok(json!({
            "claim_id": claim_id,
            "status": "DENIED",
            "denial_reason": "Prior authorization was not on file for the billed service.",
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use careline_core::ToolError;

    use super::{validate_identifier, HttpLiveDataClient, LiveDataService};

    #[test]
    fn identifiers_are_trimmed() {
        assert_eq!(validate_identifier("member_id", " M123 "), Ok("M123"));
    }

    #[test]
    fn path_altering_identifiers_are_rejected() {
        for raw in ["", "   ", "M1/../admin", "M 123", "C9?x=1", "C9#frag", "M%2F1"] {
            assert_eq!(
                validate_identifier("claim_id", raw),
                Err(ToolError::invalid_identifier("claim_id")),
                "{raw:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_upstream_unavailable() {
        let client =
            HttpLiveDataClient::new("http://127.0.0.1:9", None, Duration::from_millis(500))
                .expect("client builds");

        let error = client.eligibility("M123").await.expect_err("nothing listens on port 9");
        assert!(matches!(
            error,
            ToolError::UpstreamUnavailable { ref service, .. } if service == "eligibility"
        ));
    }

    #[tokio::test]
    async fn invalid_identifier_short_circuits_before_network() {
        let client =
            HttpLiveDataClient::new("http://127.0.0.1:9", None, Duration::from_millis(500))
                .expect("client builds");

        let error = client.claim_status("").await.expect_err("empty id");
        assert_eq!(error, ToolError::invalid_identifier("claim_id"));
    }
}
