use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::admin::{dtos as admin_dtos, handlers as admin_handlers};
use crate::features::auth;
use crate::features::files::{
    dtos as files_dtos, handlers as files_handlers, models as files_models, projection,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handler::get_me,
        // Files
        files_handlers::list_files,
        files_handlers::list_trash,
        files_handlers::get_storage_usage,
        files_handlers::upload_file,
        files_handlers::reload_files,
        files_handlers::rename_file,
        files_handlers::trash_file,
        files_handlers::restore_file,
        files_handlers::purge_file,
        files_handlers::empty_trash,
        files_handlers::get_file_url,
        files_handlers::sign_out,
        // Admin
        admin_handlers::get_storage_overview,
        admin_handlers::list_files,
        admin_handlers::list_users,
        admin_handlers::trash_file,
    ),
    components(
        schemas(
            Meta,
            ApiResponse<auth::dto::MeResponseDto>,
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<Vec<files_dtos::FileResponseDto>>,
            ApiResponse<projection::StorageUsage>,
            ApiResponse<files_dtos::PurgeSummaryDto>,
            ApiResponse<files_dtos::FileUrlDto>,
            ApiResponse<files_dtos::ReloadResponseDto>,
            ApiResponse<files_dtos::SignOutResponseDto>,
            ApiResponse<admin_dtos::StorageOverviewDto>,
            ApiResponse<admin_dtos::AdminFileDto>,
            ApiResponse<Vec<admin_dtos::AdminFileDto>>,
            ApiResponse<Vec<admin_dtos::UserUsageDto>>,
            auth::dto::MeResponseDto,
            files_dtos::UploadFileDto,
            files_dtos::FileResponseDto,
            files_dtos::RenameFileDto,
            files_dtos::PurgeFailureDto,
            files_dtos::PurgeSummaryDto,
            files_dtos::FileUrlDto,
            files_dtos::ReloadResponseDto,
            files_dtos::SignOutResponseDto,
            files_models::FileCategory,
            files_models::LifecycleState,
            projection::StorageUsage,
            projection::UsageLevel,
            admin_dtos::StorageOverviewDto,
            admin_dtos::AdminFileDto,
            admin_dtos::UserUsageDto,
        )
    ),
    tags(
        (name = "auth", description = "Authenticated user details"),
        (name = "files", description = "File lifecycle: upload, trash, restore and purge"),
        (name = "admin", description = "Storage administration (admin only)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "File Haven API",
        version = "0.1.0",
        description = "API documentation for File Haven",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
