//! HTTP handlers.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use common::errors::AppError;
use common::middleware::RequestId;
use common::models::ToolDescriptor;
use common::response::{ApiResponse, ToolResult};
use crate::state::AppState;
use crate::tools;

/// 列出可调用的工具
#[utoipa::path(
    get,
    path = "/api/tools",
    tag = "tools",
    responses(
        (status = 200, description = "工具列表", body = ApiResponse<Vec<ToolDescriptor>>)
    )
)]
pub async fn list_tools(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<ToolDescriptor>>> {
    Json(ApiResponse::ok_with_service(
        tools::descriptors(),
        state.config.service_name.clone(),
    ))
}

/// 调用工具
///
/// 请求体为工具参数对象，可为空。工具内部的失败通过 `is_error` 返回。
#[utoipa::path(
    post,
    path = "/api/tools/{name}",
    tag = "tools",
    params(
        ("name" = String, Path, description = "工具名称")
    ),
    request_body(content = Object, description = "工具参数", content_type = "application/json"),
    responses(
        (status = 200, description = "工具执行结果", body = ToolResult),
        (status = 400, description = "未知工具或参数格式错误")
    )
)]
pub async fn call_tool(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolResult>, AppError> {
    let started = Instant::now();
    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("request body is not valid JSON: {e}")))?
    };

    let result = state.tools.call(&name, args).await?;
    tracing::info!(tool = %name, is_error = result.is_error, "tool call finished");

    Ok(Json(
        result
            .with_service(state.config.service_name.clone())
            .with_request_id(request_id.as_str())
            .with_duration(started.elapsed().as_millis() as u64),
    ))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        connections: state.registry().len().await,
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 已注册的连接数
    pub connections: usize,
}
