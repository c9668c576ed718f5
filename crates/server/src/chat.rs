use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use careline_core::InterfaceError;
use serde::Serialize;
use uuid::Uuid;

use crate::session::{ChatRequest, ChatResponse, SessionService};

#[derive(Clone)]
pub struct ChatState {
    session: Arc<SessionService>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub correlation_id: String,
}

pub fn router(session: Arc<SessionService>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(ChatState { session })
}

pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    let correlation_id = format!("req-{}", Uuid::new_v4().simple());

    let Json(request) = payload.map_err(|rejection| {
        error_response(InterfaceError::BadRequest {
            message: rejection.body_text(),
            correlation_id: correlation_id.clone(),
        })
    })?;

    state.session.handle(request, &correlation_id).await.map(Json).map_err(error_response)
}

fn error_response(error: InterfaceError) -> (StatusCode, Json<ErrorBody>) {
    let (status, code, detail) = match &error {
        InterfaceError::BadRequest { message, .. } => {
            (StatusCode::BAD_REQUEST, "bad_request", Some(message.clone()))
        }
        InterfaceError::ServiceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", None)
        }
        InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal", None),
    };

    (
        status,
        Json(ErrorBody {
            error: code,
            message: error.user_message().to_string(),
            detail,
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use careline_agent::StaticLiveData;
    use careline_db::InMemoryWritebackRepository;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::router;
    use crate::session::tests::service_with;

    fn app() -> axum::Router {
        router(Arc::new(service_with(
            StaticLiveData::healthy(),
            Arc::new(InMemoryWritebackRepository::default()),
        )))
    }

    async fn post_json(body: Body) -> (StatusCode, Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .body(body)
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn chat_returns_answer_citations_and_writeback_id() {
        let body = json!({
            "session_id": "s1",
            "message": "Is outpatient physical therapy covered, and does it require prior authorization?",
            "context": {"member_id": "M123"}
        });

        let (status, payload) = post_json(Body::from(body.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["session_id"], "s1");
        assert_eq!(payload["citations"][0]["doc_id"], "pol-pt-001");
        assert_eq!(payload["tool_results"][0]["name"], "policy_search");
        assert!(payload["crm_writeback_id"].as_str().unwrap_or_default().starts_with("crm_"));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, payload) = post_json(Body::from("{\"session_id\": \"s1\"")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "bad_request");
        assert!(payload["correlation_id"].as_str().unwrap_or_default().starts_with("req-"));
    }

    #[tokio::test]
    async fn missing_message_field_is_bad_request() {
        let (status, payload) = post_json(Body::from(json!({"session_id": "s1"}).to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "bad_request");
    }

    #[tokio::test]
    async fn blank_session_id_is_bad_request() {
        let body = json!({"session_id": " ", "message": "Is this member eligible?"});
        let (status, payload) = post_json(Body::from(body.to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["detail"].as_str().unwrap_or_default().contains("session_id"));
    }
}
