use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse { pub success: bool, pub root_id: String }

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse { pub success: bool }

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse { pub error: String }

/// Student records are stored as-is; these fields are only an illustration.
#[derive(Serialize, ToSchema)]
pub struct StudentRecord { pub id: Option<u64>, pub name: Option<String> }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveSchoolRequest { pub school_name: String, pub students: Vec<StudentRecord> }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse { pub school_name: String, pub uploaded_at: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health_check,
        crate::routes::schools::save_school,
        crate::routes::schools::list_schools,
        crate::routes::schools::get_school,
        crate::routes::schools::get_school_meta,
    ),
    components(
        schemas(
            HealthResponse,
            SuccessResponse,
            ErrorResponse,
            StudentRecord,
            SaveSchoolRequest,
            MetadataResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "schools")
    )
)]
pub struct ApiDoc;
