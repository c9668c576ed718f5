//! Chat Completions client for OpenAI and Azure OpenAI deployments.
//!
//! Both providers share the wire format; they differ only in URL layout and
//! the authentication header. Transient failures are retried with exponential
//! backoff up to `max_retries` extra attempts.

use std::time::Duration;

use async_trait::async_trait;
use careline_core::config::{LlmConfig, LlmProvider};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;

use crate::llm::{
    ChatMessage, Completion, CompletionError, CompletionRequest, LlmClient, Role, ToolCallRequest,
};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    OpenAi { base_url: String },
    Azure { endpoint: String, deployment: String, api_version: String },
}

impl Endpoint {
    pub fn completions_url(&self) -> String {
        match self {
            Self::OpenAi { base_url } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
            Self::Azure { endpoint, deployment, api_version } => format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    pub endpoint: Endpoint,
    pub api_key: SecretString,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl OpenAiSettings {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| CompletionError::Configuration("llm.api_key is not set".to_string()))?;

        let endpoint = match config.provider {
            LlmProvider::OpenAi => Endpoint::OpenAi {
                base_url: config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            },
            LlmProvider::Azure => {
                let (Some(endpoint), Some(deployment)) =
                    (config.azure_endpoint.clone(), config.azure_deployment.clone())
                else {
                    return Err(CompletionError::Configuration(
                        "azure endpoint and deployment are required".to_string(),
                    ));
                };
                Endpoint::Azure { endpoint, deployment, api_version: config.azure_api_version.clone() }
            }
            LlmProvider::Offline => {
                return Err(CompletionError::Configuration(
                    "provider `none` has no completion endpoint".to_string(),
                ));
            }
        };

        Ok(Self {
            endpoint,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
        })
    }
}

pub struct OpenAiClient {
    settings: OpenAiSettings,
    client: Client,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| CompletionError::Configuration(error.to_string()))?;

        Ok(Self { settings, client })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        Self::new(OpenAiSettings::from_config(config)?)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.settings.api_key.expose_secret();
        match self.settings.endpoint {
            Endpoint::OpenAi { .. } => builder.header("Authorization", format!("Bearer {key}")),
            Endpoint::Azure { .. } => builder.header("api-key", key),
        }
    }

    async fn send_once(&self, body: &WireRequest) -> Result<Completion, CompletionError> {
        let builder = self.client.post(self.settings.endpoint.completions_url()).json(body);
        let response = self.authorize(builder).send().await.map_err(|error| {
            if error.is_timeout() {
                CompletionError::Timeout { timeout_secs: self.settings.timeout.as_secs() }
            } else {
                CompletionError::Network(error.to_string())
            }
        })?;

        let response = check_status(response).await?;
        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|error| CompletionError::Decode(error.to_string()))?;

        parse_completion(parsed)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let body = WireRequest::build(&self.settings.model, self.settings.temperature, request);
        let mut retry_count = 0;

        loop {
            match self.send_once(&body).await {
                Ok(completion) => return Ok(completion),
                Err(error) => {
                    if !error.is_retryable() || retry_count >= self.settings.max_retries {
                        return Err(error);
                    }
                    tracing::warn!(
                        event_name = "llm.request_retry",
                        attempt = retry_count + 1,
                        error = %error,
                        "retrying completion request"
                    );
                }
            }

            sleep(Duration::from_secs(1 << retry_count)).await;
            retry_count += 1;
        }
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

async fn check_status(response: Response) -> Result<Response, CompletionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        401 | 403 => CompletionError::Authentication,
        429 => CompletionError::RateLimited,
        code => CompletionError::Http { status: code, body },
    })
}

fn parse_completion(response: WireResponse) -> Result<Completion, CompletionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Decode("no choices in response".to_string()))?;

    if let Some(call) = choice.message.tool_calls.into_iter().flatten().next() {
        let raw = call.function.arguments;
        // Malformed arguments travel on as a string so the tool reports InvalidArguments.
        let arguments = if raw.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw))
        };
        return Ok(Completion::ToolCall(ToolCallRequest {
            id: call.id,
            name: call.function.name,
            arguments,
        }));
    }

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(Completion::Message(content)),
        _ => Err(CompletionError::Decode("response carried neither content nor tool call".to_string())),
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
}

impl WireRequest {
    fn build(model: &str, temperature: f32, request: &CompletionRequest) -> Self {
        let tools: Vec<WireTool> = request
            .tools
            .iter()
            .map(|spec| WireTool {
                r#type: "function",
                function: WireFunction {
                    name: spec.name.as_str().to_string(),
                    description: spec.description.to_string(),
                    parameters: spec.parameters.clone(),
                },
            })
            .collect();
        let has_tools = !tools.is_empty();

        Self {
            model: model.to_string(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: has_tools.then_some(tools),
            tool_choice: has_tools.then_some("auto"),
            temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    #[serde(serialize_with = "serialize_content")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    r#type: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect()
        });

        Self {
            role: message.role,
            content: message.content.clone(),
            tool_call_id: message.tool_call_id.clone(),
            tool_calls,
        }
    }
}

/// Assistant tool-call turns carry `""` rather than `null` content.
fn serialize_content<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(default)]
    r#type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}
