use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::admin::dtos::*;
use crate::features::admin::services::AdminService;
use crate::features::auth::guards::RequireAdmin;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Storage totals across all users
#[utoipa::path(
    get,
    path = "/api/admin/storage",
    responses(
        (status = 200, description = "Storage overview", body = ApiResponse<StorageOverviewDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_storage_overview(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
) -> Result<Json<ApiResponse<StorageOverviewDto>>> {
    let overview = service.storage_overview().await?;
    Ok(Json(ApiResponse::success(Some(overview), None, None)))
}

/// List all users' files (paginated)
#[utoipa::path(
    get,
    path = "/api/admin/files",
    params(PaginationQuery),
    responses(
        (status = 200, description = "List of files", body = ApiResponse<Vec<AdminFileDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<AdminFileDto>>>> {
    let (items, total) = service.list_files(params.offset(), params.limit()).await?;

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// List users by storage footprint (paginated)
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Per-user storage usage", body = ApiResponse<Vec<UserUsageDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<UserUsageDto>>>> {
    let (items, total) = service.list_users(params.offset(), params.limit()).await?;

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Move a user's file to their trash
#[utoipa::path(
    delete,
    path = "/api/admin/files/{id}",
    params(("id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "File moved to trash", body = ApiResponse<AdminFileDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "File not found")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn trash_file(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AdminFileDto>>> {
    let file = service.trash_file(id).await?;
    Ok(Json(ApiResponse::success(
        Some(file),
        Some("File moved to trash".to_string()),
        None,
    )))
}
