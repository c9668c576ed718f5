use std::time::Duration;

use clap::Args;
use serde_json::{json, Map, Value};

use crate::commands::scenarios::{self, DEMO_SESSION_ID};
use crate::commands::CommandResult;

const SNIPPET_PREVIEW_CHARS: usize = 240;

#[derive(Debug, Clone, Args)]
pub struct AskArgs {
    #[arg(long, help = "Run one of the canned scenarios (1-4)")]
    pub scenario: Option<u8>,
    #[arg(long, help = "Free-form question; overrides the scenario question")]
    pub message: Option<String>,
    #[arg(long, help = "Member identifier placed in the request context")]
    pub member_id: Option<String>,
    #[arg(long, help = "Claim identifier placed in the request context")]
    pub claim_id: Option<String>,
    #[arg(long, default_value = DEMO_SESSION_ID)]
    pub session_id: String,
    #[arg(long, default_value = "http://localhost:8000")]
    pub backend_url: String,
    #[arg(long, default_value_t = 120, help = "Request timeout in seconds")]
    pub timeout_secs: u64,
    #[arg(long, help = "Print the raw JSON response")]
    pub json: bool,
}

pub fn run(args: AskArgs) -> CommandResult {
    let payload = match build_payload(&args) {
        Ok(payload) => payload,
        Err(message) => return CommandResult::failure("ask", "invalid_arguments", message, 2),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let url = format!("{}/chat", args.backend_url.trim_end_matches('/'));
    let timeout = Duration::from_secs(args.timeout_secs.max(1));
    let result = runtime.block_on(post_chat(&url, &payload, timeout));

    match result {
        Ok(body) if args.json => CommandResult::report(
            0,
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()),
        ),
        Ok(body) => CommandResult::report(0, render_response(&body)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}

pub fn build_payload(args: &AskArgs) -> Result<Value, String> {
    let scenario = match args.scenario {
        Some(number) => Some(
            scenarios::find(number)
                .ok_or_else(|| format!("unknown scenario {number}; expected 1-4"))?,
        ),
        None => None,
    };

    let message = args
        .message
        .clone()
        .or_else(|| scenario.map(|scenario| scenario.message.to_string()))
        .filter(|message| !message.trim().is_empty())
        .ok_or_else(|| "either --scenario or --message is required".to_string())?;

    let mut context = Map::new();
    let member_id =
        args.member_id.clone().or_else(|| scenario.and_then(|s| s.member_id).map(str::to_string));
    let claim_id =
        args.claim_id.clone().or_else(|| scenario.and_then(|s| s.claim_id).map(str::to_string));
    if let Some(member_id) = member_id.filter(|value| !value.trim().is_empty()) {
        context.insert("member_id".to_string(), Value::String(member_id.trim().to_string()));
    }
    if let Some(claim_id) = claim_id.filter(|value| !value.trim().is_empty()) {
        context.insert("claim_id".to_string(), Value::String(claim_id.trim().to_string()));
    }

    Ok(json!({
        "session_id": args.session_id,
        "message": message,
        "context": context,
    }))
}

async fn post_chat(
    url: &str,
    payload: &Value,
    timeout: Duration,
) -> Result<Value, (&'static str, String, u8)> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|error| ("http_client", error.to_string(), 3u8))?;

    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|error| ("backend_unreachable", format!("POST {url} failed: {error}"), 4u8))?;

    let status = response.status();
    let body: Value = response.json().await.map_err(|error| {
        ("backend_response", format!("backend returned HTTP {status} without JSON: {error}"), 5u8)
    })?;

    if !status.is_success() {
        let message = body["message"].as_str().unwrap_or("request failed");
        let correlation_id = body["correlation_id"].as_str().unwrap_or("unknown");
        return Err((
            "backend_error",
            format!("backend returned HTTP {status}: {message} (correlation_id {correlation_id})"),
            5u8,
        ));
    }

    Ok(body)
}

pub fn render_response(body: &Value) -> String {
    let mut lines = vec!["answer:".to_string()];
    lines.push(format!("  {}", body["answer"].as_str().unwrap_or_default()));

    lines.push("citations:".to_string());
    match body["citations"].as_array().filter(|citations| !citations.is_empty()) {
        Some(citations) => {
            for citation in citations {
                lines.push(format!(
                    "- [{}] {}",
                    citation["doc_id"].as_str().unwrap_or("doc"),
                    citation["title"].as_str().unwrap_or_default()
                ));
                let snippet = citation["snippet"].as_str().unwrap_or_default();
                if !snippet.is_empty() {
                    lines.push(format!("    {}", preview(snippet)));
                }
            }
        }
        None => lines.push("- none returned".to_string()),
    }

    lines.push("tool results:".to_string());
    match body["tool_results"].as_array().filter(|results| !results.is_empty()) {
        Some(results) => {
            for result in results {
                lines.push(format!(
                    "- {}: {}",
                    result["name"].as_str().unwrap_or("unknown"),
                    result["data"]
                ));
            }
        }
        None => lines.push("- none returned".to_string()),
    }

    match body["crm_writeback_id"].as_str() {
        Some(id) => lines.push(format!("crm write-back: {id}")),
        None => lines.push("crm write-back: not recorded".to_string()),
    }

    lines.join("\n")
}

fn preview(snippet: &str) -> String {
    if snippet.chars().count() <= SNIPPET_PREVIEW_CHARS {
        return snippet.to_string();
    }
    let cut: String = snippet.chars().take(SNIPPET_PREVIEW_CHARS).collect();
    format!("{cut}...")
}
