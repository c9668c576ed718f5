//! Stand-in for the eligibility and claims systems of record, mounted under
//! `/mock-live` when `live_api.serve_mock` is enabled.

use axum::{extract::Path, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::debug;

pub const MOCK_PREFIX: &str = "/mock-live";
pub const MOCK_DENIAL_REASON: &str =
    "Prior authorization was not on file for the billed service date.";

pub fn router() -> Router {
    Router::new()
        .route("/mock-live/eligibility/{member_id}", get(eligibility))
        .route("/mock-live/claims/{claim_id}", get(claim_status))
}

pub async fn eligibility(Path(member_id): Path<String>) -> Json<Value> {
    debug!(event_name = "mock_live.eligibility", "mock eligibility lookup served");
    Json(json!({ "member_id": member_id, "eligibility": "ACTIVE" }))
}

pub async fn claim_status(Path(claim_id): Path<String>) -> Json<Value> {
    debug!(event_name = "mock_live.claim_status", "mock claim lookup served");
    Json(json!({ "claim_id": claim_id, "status": "DENIED", "denial_reason": MOCK_DENIAL_REASON }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        extract::Path,
        http::{Request, StatusCode},
    };
    use careline_agent::{HttpLiveDataClient, LiveDataService};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{claim_status, eligibility, router, MOCK_DENIAL_REASON};

    #[tokio::test]
    async fn eligibility_is_always_active() {
        let payload = eligibility(Path("M123".to_string())).await.0;
        assert_eq!(payload["member_id"], "M123");
        assert_eq!(payload["eligibility"], "ACTIVE");
    }

    #[tokio::test]
    async fn claims_route_returns_denial() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/mock-live/claims/C999")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        let payload: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["status"], "DENIED");
        assert_eq!(payload["denial_reason"], MOCK_DENIAL_REASON);
        assert_eq!(claim_status(Path("C1".to_string())).await.0["claim_id"], "C1");
    }

    #[tokio::test]
    async fn http_live_client_reads_from_mock_routes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router()).await;
        });

        let client = HttpLiveDataClient::new(
            format!("http://{address}/mock-live/"),
            None,
            Duration::from_secs(5),
        )
        .expect("client builds");

        let eligibility = client.eligibility("M123").await.expect("eligibility lookup");
        assert_eq!(eligibility["eligibility"], "ACTIVE");

        let claim = client.claim_status("C999").await.expect("claim lookup");
        assert_eq!(claim["status"], "DENIED");

        let misrouted =
            HttpLiveDataClient::new(format!("http://{address}/elsewhere"), None, Duration::from_secs(5))
                .expect("client builds");
        let error = misrouted.eligibility("M123").await.expect_err("404 is not success");
        assert_eq!(error.code(), "upstream_unavailable");

        server.abort();
    }
}
