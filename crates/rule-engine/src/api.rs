//! HTTP 接口
//!
//! 所有响应使用统一信封 `{success, data, error}`。失败返回 400，
//! 查询不存在的规则返回 404。

use crate::combiner::{CombineOptions, RuleOrder};
use crate::engine::RuleEngine;
use crate::error::{EvalError, RuleError};
use crate::models::{DataRecord, Rule};
use crate::store::RuleStoreStats;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use rulekit_shared::observability::middleware as obs_middleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// 与 `/api/rules/{id}` 同级的固定路由段，不能用作规则 ID
pub const RESERVED_RULE_IDS: &[&str] = &["stats", "clean", "combine", "evaluate", "test"];

/// 接口共享状态
#[derive(Clone)]
pub struct ApiState {
    pub engine: RuleEngine,
}

// ============================================================================
// 统一响应
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// 接口错误
#[derive(Debug)]
pub enum ApiError {
    Rule(RuleError),
    Eval(EvalError),
    BadRequest(String),
}

impl From<RuleError> for ApiError {
    fn from(e: RuleError) -> Self {
        Self::Rule(e)
    }
}

impl From<EvalError> for ApiError {
    fn from(e: EvalError) -> Self {
        Self::Eval(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Rule(RuleError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        let message = match self {
            Self::Rule(e) => e.to_string(),
            Self::Eval(e) => e.to_string(),
            Self::BadRequest(message) => message,
        };

        warn!(status = status.as_u16(), error = %message, "请求失败");
        (status, Json(ApiResponse::error(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// 请求/响应 DTO
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub id: String,
    pub expression: String,
}

#[derive(Debug, Deserialize)]
pub struct CombineRequest {
    pub rule_ids: Vec<String>,
    #[serde(default)]
    pub order: RuleOrder,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub rule_ids: Vec<String>,
    #[serde(default)]
    pub query_data: DataRecord,
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Deserialize)]
pub struct TestExpressionRequest {
    pub expression: String,
    #[serde(default)]
    pub query_data: DataRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuleSummary {
    pub id: String,
    pub expression: String,
}

impl From<&Rule> for RuleSummary {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id().to_string(),
            expression: rule.expression().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuleDetail {
    pub id: String,
    pub expression: String,
    pub canonical: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CombineResponse {
    pub rule_ids: Vec<String>,
    pub combined_expression: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuleOutcomeDto {
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub result: bool,
    pub combined_expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleOutcomeDto>>,
    pub evaluation_time_us: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestExpressionResponse {
    pub result: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub rules: usize,
}

// ============================================================================
// 路由定义
// ============================================================================

/// 规则接口路由（不含中间件）
pub fn rule_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/rule", get(list_rules))
        .route("/api/rules", get(list_rules).post(create_rule))
        .route("/api/rules/stats", get(rule_stats))
        .route("/api/rules/clean", delete(clean_rules))
        .route("/api/rules/combine", post(combine_rules))
        .route("/api/rules/evaluate", post(evaluate_rules))
        .route("/api/rules/test", post(test_expression))
        .route("/api/rules/{id}", get(get_rule).delete(delete_rule))
        .route("/health", get(health_check))
}

/// 完整应用：路由 + CORS + 可观测性中间件
pub fn app(engine: RuleEngine) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    rule_routes()
        .layer(cors)
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(Arc::new(ApiState { engine }))
}

// ============================================================================
// 路由处理器
// ============================================================================

/// GET /api/rules
async fn list_rules(State(state): State<Arc<ApiState>>) -> Json<ApiResponse<Vec<RuleSummary>>> {
    let rules = state.engine.list_rules();
    Json(ApiResponse::success(
        rules.iter().map(RuleSummary::from).collect(),
    ))
}

/// GET /api/rules/{id}
async fn get_rule(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<RuleDetail> {
    let rule = state.engine.get_rule(&id)?;

    Ok(Json(ApiResponse::success(RuleDetail {
        id: rule.id().to_string(),
        expression: rule.expression().to_string(),
        canonical: rule.canonical(),
        created_at: rule.created_at(),
        updated_at: rule.updated_at(),
    })))
}

/// POST /api/rules
async fn create_rule(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CreateRuleRequest>, JsonRejection>,
) -> ApiResult<RuleSummary> {
    let Json(req) = payload?;
    if RESERVED_RULE_IDS.contains(&req.id.trim()) {
        return Err(ApiError::BadRequest(format!(
            "规则 ID '{}' 与固定路由冲突",
            req.id.trim()
        )));
    }
    let rule = state.engine.create_rule(&req.id, &req.expression)?;

    info!(rule_id = %rule.id(), "规则已创建");
    Ok(Json(ApiResponse::success(RuleSummary::from(&rule))))
}

/// DELETE /api/rules/{id}
async fn delete_rule(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.engine.delete_rule(&id)?;
    Ok(Json(ApiResponse::success_empty()))
}

/// DELETE /api/rules/clean
async fn clean_rules(State(state): State<Arc<ApiState>>) -> Json<ApiResponse<()>> {
    state.engine.clear();
    Json(ApiResponse::success_empty())
}

/// GET /api/rules/stats
async fn rule_stats(State(state): State<Arc<ApiState>>) -> Json<ApiResponse<RuleStoreStats>> {
    Json(ApiResponse::success(state.engine.stats()))
}

/// POST /api/rules/combine
async fn combine_rules(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CombineRequest>, JsonRejection>,
) -> ApiResult<CombineResponse> {
    let Json(req) = payload?;
    let combined = state
        .engine
        .combine(&req.rule_ids, CombineOptions { order: req.order })?;

    Ok(Json(ApiResponse::success(CombineResponse {
        rule_ids: combined.rule_ids,
        combined_expression: combined.text,
    })))
}

/// POST /api/rules/evaluate
async fn evaluate_rules(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> ApiResult<EvaluateResponse> {
    let Json(req) = payload?;
    let report = if req.detailed {
        state.engine.evaluate_detailed(&req.rule_ids, &req.query_data)?
    } else {
        state.engine.evaluate_report(&req.rule_ids, &req.query_data)?
    };

    let result = report.result?;
    let rules = req.detailed.then(|| {
        report
            .rules
            .into_iter()
            .map(|outcome| match outcome.result {
                Ok(matched) => RuleOutcomeDto {
                    rule_id: outcome.rule_id,
                    result: Some(matched),
                    error: None,
                },
                Err(e) => RuleOutcomeDto {
                    rule_id: outcome.rule_id,
                    result: None,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    });

    Ok(Json(ApiResponse::success(EvaluateResponse {
        result,
        combined_expression: report.combined_expression,
        rules,
        evaluation_time_us: report.evaluation_time_us,
    })))
}

/// POST /api/rules/test
async fn test_expression(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<TestExpressionRequest>, JsonRejection>,
) -> ApiResult<TestExpressionResponse> {
    let Json(req) = payload?;
    let result = state
        .engine
        .test_expression(&req.expression, &req.query_data)?;

    Ok(Json(ApiResponse::success(TestExpressionResponse { result })))
}

/// GET /health
async fn health_check(State(state): State<Arc<ApiState>>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        rules: state.engine.store().len(),
    }))
}
