use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use common::types::SuccessBody;
use serde_json::Value;
use service::roster::{Metadata, Roster, RosterRead, SchoolRoster};
use tracing::{debug, info, warn};

use crate::errors::ApiError;
use crate::state::AppState;

/// Literal segment of the save route; also a valid school name.
pub const SAVE_SEGMENT: &str = "save";

/// 保存学校名单：覆盖写入 students.json 与 meta.json
#[utoipa::path(
    post,
    path = "/schools/save",
    tag = "schools",
    request_body = crate::openapi::SaveSchoolRequest,
    responses(
        (status = 200, description = "Saved", body = crate::openapi::SuccessResponse),
        (status = 400, description = "Invalid payload", body = crate::openapi::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn save_school(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessBody>, ApiError> {
    let Json(body) = payload.map_err(|e| {
        warn!(error = %e, "unreadable save body");
        ApiError::invalid_payload()
    })?;
    let roster = SchoolRoster::from_value(&body)?;
    state.roster.save_school(&roster).await?;
    Ok(Json(SuccessBody::ok()))
}

/// 列出根目录下的全部学校文件夹名
#[utoipa::path(
    get,
    path = "/schools",
    tag = "schools",
    responses(
        (status = 200, description = "School names", body = [String]),
        (status = 500, description = "Store failure", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn list_schools(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let names = state.roster.list_schools().await?;
    debug!(count = names.len(), "listed schools");
    Ok(Json(names))
}

/// 获取指定学校的名单；从未保存过则返回空数组
#[utoipa::path(
    get,
    path = "/schools/{schoolName}",
    tag = "schools",
    params(("schoolName" = String, Path, description = "School folder name")),
    responses(
        (status = 200, description = "Roster, empty if never saved", body = [crate::openapi::StudentRecord]),
        (status = 500, description = "Store failure", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn get_school(
    State(state): State<AppState>,
    Path(school_name): Path<String>,
) -> Result<Json<Roster>, ApiError> {
    fetch_students(&state, &school_name).await
}

/// `GET /schools/save` 命中静态路由，按学校名 "save" 读取
pub async fn get_school_named_save(State(state): State<AppState>) -> Result<Json<Roster>, ApiError> {
    fetch_students(&state, SAVE_SEGMENT).await
}

async fn fetch_students(state: &AppState, school_name: &str) -> Result<Json<Roster>, ApiError> {
    let read = state.roster.fetch_roster(school_name).await?;
    if read == RosterRead::NeverSaved {
        info!(school = %school_name, "no roster saved yet");
    }
    Ok(Json(read.into_students()))
}

/// 获取最近一次保存的元数据
#[utoipa::path(
    get,
    path = "/schools/{schoolName}/meta",
    tag = "schools",
    params(("schoolName" = String, Path, description = "School folder name")),
    responses(
        (status = 200, description = "Last save", body = crate::openapi::MetadataResponse),
        (status = 404, description = "Never saved", body = crate::openapi::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn get_school_meta(
    State(state): State<AppState>,
    Path(school_name): Path<String>,
) -> Result<Json<Metadata>, ApiError> {
    fetch_metadata(&state, &school_name).await
}

pub async fn get_school_meta_named_save(State(state): State<AppState>) -> Result<Json<Metadata>, ApiError> {
    fetch_metadata(&state, SAVE_SEGMENT).await
}

async fn fetch_metadata(state: &AppState, school_name: &str) -> Result<Json<Metadata>, ApiError> {
    match state.roster.fetch_metadata(school_name).await? {
        Some(meta) => Ok(Json(meta)),
        None => Err(ApiError::new(
            axum::http::StatusCode::NOT_FOUND,
            format!("no metadata for {school_name}"),
        )),
    }
}
