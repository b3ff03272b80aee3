use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::features::admin::handlers;
use crate::features::admin::services::AdminService;

/// Create admin routes (all require the admin role)
pub fn routes(admin_service: Arc<AdminService>) -> Router {
    Router::new()
        .route("/storage", get(handlers::get_storage_overview))
        .route("/users", get(handlers::list_users))
        .route("/files", get(handlers::list_files))
        .route("/files/{id}", delete(handlers::trash_file))
        .with_state(admin_service)
}
