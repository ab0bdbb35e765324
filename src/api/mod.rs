//! HTTP API consumed by the chat front end.
//!
//! The estimation core owns no wire protocol of its own; these handlers
//! adapt it to JSON over HTTP. Persistence and the chat transport live in
//! the calling application.

pub mod types;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::service::{Classification, EstimationService};
use types::{
    AnalyzeRequest, AnalyzeResponse, ApiError, CatalogResponse, ClassifyRequest,
    ConversationEstimateRequest, ConversationEstimateResponse, EstimateRequest, EstimateResponse,
};

/// Shared state for the API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<EstimationService>,
}

/// The estimation HTTP API.
pub struct EstimationApi;

impl EstimationApi {
    /// Build the axum router.
    pub fn router(state: ApiState) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/api/estimate", post(estimate_handler))
            .route("/api/classify", post(classify_handler))
            .route("/api/analyze", post(analyze_handler))
            .route(
                "/api/conversation/estimate",
                post(conversation_estimate_handler),
            )
            .route("/api/catalog", get(catalog_handler))
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve the API until Ctrl-C.
    pub async fn start(state: ApiState, addr: SocketAddr) -> Result<(), ServerError> {
        let router = Self::router(state);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!("Estimation API listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Estimation API shutting down");
            })
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))
    }
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Internal("handler panicked".to_string()).into_response()
}

// -- Handlers --

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn estimate_handler(
    State(state): State<ApiState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let Json(req) = payload?;
    let record = req.record()?;
    let step = req.step()?;

    let report = state.service.estimate(&record, step);
    Ok(Json(EstimateResponse {
        success: true,
        report,
    }))
}

async fn classify_handler(
    State(state): State<ApiState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<Classification>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(state.service.classify(&req.messages)))
}

async fn analyze_handler(
    State(state): State<ApiState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(req) = payload?;
    if req.conversation_text.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "conversationText must not be empty".to_string(),
        ));
    }

    let extraction = state
        .service
        .analyze(&req.conversation_text, req.current_estimate.as_ref())
        .await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        fallback: extraction.is_fallback(),
        analysis: extraction.record,
    }))
}

async fn conversation_estimate_handler(
    State(state): State<ApiState>,
    payload: Result<Json<ConversationEstimateRequest>, JsonRejection>,
) -> Result<Json<ConversationEstimateResponse>, ApiError> {
    let Json(req) = payload?;
    let result = state
        .service
        .estimate_conversation(&req.messages, req.current_estimate.as_ref())
        .await;

    Ok(Json(ConversationEstimateResponse {
        success: true,
        result,
    }))
}

async fn catalog_handler(State(state): State<ApiState>) -> Response {
    let estimator = state.service.estimator();
    let reference = estimator.reference();

    Json(CatalogResponse {
        count: reference.catalog.len(),
        currency: estimator.currency(),
        projects: reference.catalog.projects(),
        phase_distribution: reference.phases.shares(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::service::tests::{SHOP_REPLY, StubLlm, service_with};

    fn router_with(llm: Arc<StubLlm>) -> Router {
        EstimationApi::router(ApiState {
            service: Arc::new(service_with(llm)),
        })
    }

    fn router() -> Router {
        router_with(StubLlm::replying(SHOP_REPLY))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "healthy");
    }

    #[tokio::test]
    async fn estimate_returns_estimate_and_analysis() {
        let req = post_json(
            "/api/estimate",
            json!({
                "analysis": {"platforms": ["web"], "features": ["ecommerce"], "complexity": "medium"}
            }),
        );

        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["estimate"]["initialRange"]["min"], 650);
        assert_eq!(body["estimate"]["step"], 5);
        assert_eq!(body["analysis"]["multipliers"]["feature"], 1.3);
        assert_eq!(body["analysis"]["similarProjects"][0]["key"], "fashion-store");
        assert!(body["analysis"]["reasoning"].is_string());
    }

    #[tokio::test]
    async fn estimate_honours_step() {
        let req = post_json(
            "/api/estimate",
            json!({"analysis": {"platforms": ["web"]}, "step": 1}),
        );

        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["estimate"]["currentRange"]["max"], 0);
        assert_eq!(body["estimate"]["timeline"], "Determining...");
        assert!(body.get("analysis").is_none());
    }

    #[tokio::test]
    async fn estimate_without_analysis_is_bad_request() {
        let resp = router()
            .oneshot(post_json("/api/estimate", json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("analysis"));
    }

    #[tokio::test]
    async fn estimate_with_non_object_analysis_is_bad_request() {
        let resp = router()
            .oneshot(post_json("/api/estimate", json!({"analysis": "web shop"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn estimate_with_negative_step_is_bad_request() {
        let resp = router()
            .oneshot(post_json(
                "/api/estimate",
                json!({"analysis": {}, "step": -1}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn estimate_with_mistyped_step_is_json_bad_request() {
        for step in [json!("3"), json!(2.5)] {
            let resp = router()
                .oneshot(post_json(
                    "/api/estimate",
                    json!({"analysis": {}, "step": step}),
                ))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body = body_json(resp).await;
            assert_eq!(body["success"], false);
            assert!(body["error"].as_str().unwrap().contains("step"));
        }
    }

    #[tokio::test]
    async fn estimate_with_empty_body_is_json_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/estimate")
            .header("content-type", "application/json")
            .body(Body::empty())
            .unwrap();

        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn conversation_estimate_with_malformed_json_is_json_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/conversation/estimate")
            .header("content-type", "application/json")
            .body(Body::from("{\"messages\": ["))
            .unwrap();

        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["success"], false);
    }

    #[tokio::test]
    async fn classify_returns_type_and_step() {
        let req = post_json(
            "/api/classify",
            json!({"messages": [
                {"role": "user", "text": "We need a mobile app, what would it cost?"},
                {"role": "assistant", "text": "Happy to help."},
                {"role": "user", "text": "Both iOS and Android."}
            ]}),
        );

        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["conversationType"], "estimate");
        assert_eq!(body["step"], 2);
        assert!(body["scores"]["project"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn analyze_returns_record() {
        let resp = router()
            .oneshot(post_json(
                "/api/analyze",
                json!({"conversationText": "Client: an online fashion store"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["fallback"], false);
        assert_eq!(body["analysis"]["platforms"][0], "web");
        assert_eq!(body["analysis"]["complexity"], "medium");
    }

    #[tokio::test]
    async fn analyze_surfaces_oracle_failure_as_500() {
        let resp = router_with(StubLlm::failing())
            .oneshot(post_json(
                "/api/analyze",
                json!({"conversationText": "Client: an online store"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        // Upstream details stay in the logs.
        assert!(!body["error"].as_str().unwrap().contains("offline"));
    }

    #[tokio::test]
    async fn analyze_rejects_blank_text() {
        let resp = router()
            .oneshot(post_json("/api/analyze", json!({"conversationText": "  "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn conversation_estimate_falls_back_when_oracle_is_down() {
        let resp = router_with(StubLlm::failing())
            .oneshot(post_json(
                "/api/conversation/estimate",
                json!({"messages": [
                    {"role": "user", "text": "We want to build an online store"},
                    {"role": "assistant", "text": "What do you sell?"},
                    {"role": "user", "text": "Clothes. How much would it cost?"}
                ]}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["step"], 2);
        assert_eq!(body["extraction"]["kind"], "fallback");
        assert_eq!(body["estimate"]["confidence"], "low");
    }

    #[tokio::test]
    async fn catalog_lists_projects() {
        let req = Request::builder()
            .uri("/api/catalog")
            .body(Body::empty())
            .unwrap();

        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["count"], 6);
        assert_eq!(body["projects"].as_array().unwrap().len(), 6);
        assert_eq!(body["phaseDistribution"].as_array().unwrap().len(), 5);
    }
}
