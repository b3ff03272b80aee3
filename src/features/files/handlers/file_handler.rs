use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::core::extractor::ValidatedJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    FileResponseDto, FileUrlDto, ListFilesQuery, PurgeSummaryDto, ReloadResponseDto,
    RenameFileDto, SignOutResponseDto, TrashQuery, UploadFileDto,
};
use crate::features::files::models::FileRecord;
use crate::features::files::projection::StorageUsage;
use crate::features::files::session::SessionRegistry;
use crate::features::files::LifecycleManager;
use crate::shared::types::{ApiResponse, Meta};

type FilesResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// The caller's lifecycle manager; the session is opened on first use
async fn manager(
    sessions: &SessionRegistry,
    user: &AuthenticatedUser,
) -> Result<LifecycleManager, AppError> {
    Ok(sessions.manager(&user.sub).await?)
}

fn file_list(files: Vec<FileRecord>) -> ApiResponse<Vec<FileResponseDto>> {
    let total = files.len() as i64;
    let files = files.into_iter().map(FileResponseDto::from).collect();
    ApiResponse::success(Some(files), None, Some(Meta { total }))
}

/// List active files
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "Active files, newest first", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 401, description = "Authentication required"),
        (status = 502, description = "File store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
    Query(query): Query<ListFilesQuery>,
) -> FilesResult<Vec<FileResponseDto>> {
    let manager = manager(&sessions, &user).await?;
    let files = manager.active_files(query.category, query.q.as_deref().unwrap_or_default());
    Ok(Json(file_list(files)))
}

/// List files in the trash
#[utoipa::path(
    get,
    path = "/api/files/trash",
    tag = "files",
    params(TrashQuery),
    responses(
        (status = 200, description = "Trashed files, most recently deleted first", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_trash(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
    Query(query): Query<TrashQuery>,
) -> FilesResult<Vec<FileResponseDto>> {
    let manager = manager(&sessions, &user).await?;
    let files = manager.trashed_files(query.q.as_deref().unwrap_or_default());
    Ok(Json(file_list(files)))
}

/// Storage used against the quota, trash included
#[utoipa::path(
    get,
    path = "/api/files/usage",
    tag = "files",
    responses(
        (status = 200, description = "Storage usage", body = ApiResponse<StorageUsage>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_storage_usage(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
) -> FilesResult<StorageUsage> {
    let manager = manager(&sessions, &user).await?;
    Ok(Json(ApiResponse::success(
        Some(manager.storage_usage()),
        None,
        None,
    )))
}

/// Upload a file
///
/// Accepts multipart/form-data with a single `file` field.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid file or validation error"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "File too large"),
        (status = 502, description = "File store rejected the upload")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != "file" {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        if upload.is_some() {
            return Err(AppError::BadRequest(
                "Only one file can be uploaded per request".to_string(),
            ));
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        upload = Some((file_name, content_type, data.to_vec()));
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let manager = manager(&sessions, &user).await?;
    let record = manager.upload(&file_name, &content_type, &data).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(FileResponseDto::from(record)),
            Some("File uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// Reload the file list from the store
#[utoipa::path(
    post,
    path = "/api/files/reload",
    tag = "files",
    responses(
        (status = 200, description = "Files reloaded", body = ApiResponse<ReloadResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 502, description = "File store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reload_files(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
) -> FilesResult<ReloadResponseDto> {
    let manager = manager(&sessions, &user).await?;
    let loaded = manager.load().await?;
    Ok(Json(ApiResponse::success(
        Some(ReloadResponseDto { loaded }),
        None,
        None,
    )))
}

/// Rename a file
#[utoipa::path(
    patch,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File id")),
    request_body = RenameFileDto,
    responses(
        (status = 200, description = "File renamed", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid name"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rename_file(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<RenameFileDto>,
) -> FilesResult<FileResponseDto> {
    let manager = manager(&sessions, &user).await?;
    let record = manager.rename(id, &dto.name).await?;
    Ok(Json(ApiResponse::success(
        Some(FileResponseDto::from(record)),
        None,
        None,
    )))
}

/// Move a file to the trash
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "File moved to trash", body = ApiResponse<FileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found"),
        (status = 502, description = "File store rejected the change")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn trash_file(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
    Path(id): Path<Uuid>,
) -> FilesResult<FileResponseDto> {
    let manager = manager(&sessions, &user).await?;
    let record = manager.soft_delete(id).await?;
    Ok(Json(ApiResponse::success(
        Some(FileResponseDto::from(record)),
        Some("File moved to trash".to_string()),
        None,
    )))
}

/// Restore a file from the trash
#[utoipa::path(
    post,
    path = "/api/files/{id}/restore",
    tag = "files",
    params(("id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "File restored", body = ApiResponse<FileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn restore_file(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
    Path(id): Path<Uuid>,
) -> FilesResult<FileResponseDto> {
    let manager = manager(&sessions, &user).await?;
    let record = manager.restore(id).await?;
    Ok(Json(ApiResponse::success(
        Some(FileResponseDto::from(record)),
        Some("File restored".to_string()),
        None,
    )))
}

/// Permanently delete a trashed file
#[utoipa::path(
    delete,
    path = "/api/files/{id}/purge",
    tag = "files",
    params(("id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "File deleted permanently"),
        (status = 400, description = "File is not in the trash"),
        (status = 401, description = "Authentication required"),
        (status = 502, description = "File store rejected the delete")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn purge_file(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
    Path(id): Path<Uuid>,
) -> FilesResult<()> {
    let manager = manager(&sessions, &user).await?;
    manager.purge(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("File deleted permanently".to_string()),
        None,
    )))
}

/// Permanently delete everything in the trash
///
/// Keeps going past individual failures and reports them.
#[utoipa::path(
    delete,
    path = "/api/files/trash",
    tag = "files",
    responses(
        (status = 200, description = "Trash emptied", body = ApiResponse<PurgeSummaryDto>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn empty_trash(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
) -> FilesResult<PurgeSummaryDto> {
    let manager = manager(&sessions, &user).await?;
    let summary = manager.purge_all().await;
    Ok(Json(ApiResponse::success(
        Some(PurgeSummaryDto::from(summary)),
        None,
        None,
    )))
}

/// Get a time-limited preview URL for a file
#[utoipa::path(
    get,
    path = "/api/files/{id}/url",
    tag = "files",
    params(("id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "Presigned URL", body = ApiResponse<FileUrlDto>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_url(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
    Path(id): Path<Uuid>,
) -> FilesResult<FileUrlDto> {
    let manager = manager(&sessions, &user).await?;
    let url = manager.presign(id).await?;
    Ok(Json(ApiResponse::success(Some(FileUrlDto { url }), None, None)))
}

/// Sign out: discard the caller's file session
#[utoipa::path(
    delete,
    path = "/api/session",
    tag = "files",
    responses(
        (status = 200, description = "Session closed", body = ApiResponse<SignOutResponseDto>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn sign_out(
    user: AuthenticatedUser,
    State(sessions): State<Arc<SessionRegistry>>,
) -> FilesResult<SignOutResponseDto> {
    let closed = sessions.close(&user.sub);
    Ok(Json(ApiResponse::success(
        Some(SignOutResponseDto { closed }),
        None,
        None,
    )))
}
