use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    empty_trash, get_file_url, get_storage_usage, list_files, list_trash, purge_file,
    reload_files, rename_file, restore_file, sign_out, trash_file, upload_file,
};
use crate::features::files::session::SessionRegistry;

/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the files feature
pub fn routes(sessions: Arc<SessionRegistry>) -> Router {
    let upload_limit = usize::try_from(sessions.policy().max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/files", get(list_files))
        .route("/api/files/trash", get(list_trash).delete(empty_trash))
        .route("/api/files/usage", get(get_storage_usage))
        .route(
            "/api/files/upload",
            post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/files/reload", post(reload_files))
        .route("/api/files/{id}", patch(rename_file).delete(trash_file))
        .route("/api/files/{id}/restore", post(restore_file))
        .route("/api/files/{id}/purge", delete(purge_file))
        .route("/api/files/{id}/url", get(get_file_url))
        .route("/api/session", delete(sign_out))
        .with_state(sessions)
}
