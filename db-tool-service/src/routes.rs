//! 路由模块

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use common::middleware::request_id_middleware;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::handlers;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "数据库工具服务 API",
        version = "0.1.0",
        description = "数据库连接注册与查询网关"
    ),
    paths(
        handlers::list_tools,
        handlers::call_tool,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ToolDescriptor,
        common::models::ToolParameter,
        common::response::ToolResult,
        common::response::ToolContent,
        common::response::ResponseMeta,
        handlers::HealthResponse,
    )),
    tags(
        (name = "tools", description = "工具调用端点"),
        (name = "health", description = "健康检查端点")
    )
)]
pub struct ApiDoc;

/// 创建完整的服务路由
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/tools", get(handlers::list_tools))
        .route("/api/tools/{name}", post(handlers::call_tool))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use common::config::AppConfig;
    use common::models::DriverKind;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::drivers::DriverCatalog;
    use crate::testing::{StubBackend, StubDriver};

    fn app(backend: &StubBackend) -> (AppState, Router) {
        let catalog = DriverCatalog::default().with_driver(Arc::new(StubDriver::new(
            DriverKind::Postgres,
            backend.clone(),
        )));
        let state = AppState::with_catalog(AppConfig::default(), catalog);
        (state.clone(), create_router(state))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn call(tool: &str, body: Value) -> Request<Body> {
        Request::post(format!("/api/tools/{tool}"))
            .header("content-type", "application/json")
            .header("x-request-id", "req-1")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_connections() {
        let backend = StubBackend::default();
        let (state, router) = app(&backend);
        state
            .registry()
            .register("db", DriverKind::Postgres, "stub://ok")
            .await
            .unwrap();

        let (status, body) = send(
            &router,
            Request::get("/api/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 1);
    }

    #[tokio::test]
    async fn test_list_tools() {
        let (_, router) = app(&StubBackend::default());
        let (status, body) = send(
            &router,
            Request::get("/api/tools").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let backend = StubBackend::with_rows(1);
        let (_, router) = app(&backend);

        let (status, body) = send(
            &router,
            call(
                "connect_database",
                json!({"connection_name": "db1", "driver": "postgres", "connection_string": "stub://ok"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_error"], false);
        assert_eq!(body["meta"]["request_id"], "req-1");
        assert_eq!(body["meta"]["service"], "db-tool-service");

        let (_, body) = send(
            &router,
            call("database_query", json!({"connection_name": "db1", "query": "DELETE FROM t"})),
        )
        .await;
        assert_eq!(body["is_error"], true);
        assert_eq!(body["content"][0]["type"], "text");
        assert!(body["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("POLICY_REJECTED"));
        assert_eq!(backend.executes(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_bad_request() {
        let (_, router) = app(&StubBackend::default());
        let (status, body) = send(&router, call("nope", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_empty_body_lists_connections() {
        let (_, router) = app(&StubBackend::default());
        let request = Request::post("/api/tools/list_database_connections")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_error"], false);
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let (_, router) = app(&StubBackend::default());
        let (status, body) = send(
            &router,
            Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/tools/{name}"].is_object());
    }
}
