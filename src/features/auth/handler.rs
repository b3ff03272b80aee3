use crate::core::error::Result;
use crate::features::auth::dto::MeResponseDto;
use crate::features::auth::model::AuthenticatedUser;
use crate::shared::types::ApiResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user retrieved successfully", body = ApiResponse<MeResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(user: AuthenticatedUser) -> Result<Json<ApiResponse<MeResponseDto>>> {
    Ok(Json(ApiResponse::success(
        Some(MeResponseDto::from(user)),
        None,
        None,
    )))
}

#[cfg(test)]
mod tests {
    use crate::features::auth::routes;
    use crate::shared::test_helpers::{create_admin_user, with_user};
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_get_me_returns_current_user() {
        let app = with_user(routes::routes(), create_admin_user());
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/auth/me").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["sub"], "test-admin");
        assert_eq!(body["data"]["is_admin"], true);
    }

    #[tokio::test]
    async fn test_get_me_requires_user() {
        let server = TestServer::new(routes::routes()).unwrap();

        let response = server.get("/api/auth/me").await;

        response.assert_status_unauthorized();
    }
}
