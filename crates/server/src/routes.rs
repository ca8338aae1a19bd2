use axum::{extract::State, middleware, routing::{get, post}, Json, Router};
use common::types::HealthReport;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ApiError;
use crate::observability;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod schools;

/// Resolves the root container; failure means the store is unusable.
#[utoipa::path(
    get,
    path = "/health-check",
    tag = "health",
    responses(
        (status = 200, description = "Root resolved", body = crate::openapi::HealthResponse),
        (status = 500, description = "Root unavailable", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthReport>, ApiError> {
    let root_id = state.roster.resolve_root().await?;
    Ok(Json(HealthReport::ok(root_id)))
}

/// Build the full application router: roster routes, metrics and API docs
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/health-check", get(health_check))
        .route("/schools", get(schools::list_schools))
        // 静态段优先于 :schoolName，名为 "save" 的学校也要能读回
        .route("/schools/save", post(schools::save_school).get(schools::get_school_named_save))
        .route("/schools/save/meta", get(schools::get_school_meta_named_save))
        .route("/schools/:schoolName", get(schools::get_school))
        .route("/schools/:schoolName/meta", get(schools::get_school_meta))
        .route_layer(middleware::from_fn(observability::track_requests))
        .with_state(state);

    Router::new()
        .merge(api)
        .route("/metrics", get(observability::metrics))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应返回时打点，包含状态码与耗时
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
