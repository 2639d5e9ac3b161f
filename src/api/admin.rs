use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::api::{failure, live};
use crate::database::ChangeEvent;
use crate::middleware::auth::Claims;
use crate::models::{AdminUserResponse, AppStats};
use crate::services::admin_service;
use crate::state::AppState;
use crate::utils::AppResult;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

// Todas as rotas admin passam por aqui antes de qualquer coisa
macro_rules! admin_only {
    ($state:expr, $user:expr, $context:expr) => {
        if let Err(e) = admin_service::require_admin(&$state, &$user.sub).await {
            return failure($context, e);
        }
    };
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "Every user with their assignment count", body = Vec<AdminUserResponse>),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(user: web::ReqData<Claims>, state: web::Data<AppState>) -> HttpResponse {
    admin_only!(state, user, "List users");

    match admin_service::list_users(&state).await {
        Ok(users) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": users.len(),
            "users": users
        })),
        Err(e) => failure("List users", e),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}/admin",
    tag = "Admin",
    params(
        ("id" = String, Path, description = "Target user id")
    ),
    request_body = SetAdminRequest,
    responses(
        (status = 200, description = "Admin flag updated", body = AdminUserResponse),
        (status = 403, description = "Admin access required, or target is the caller"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_admin(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<SetAdminRequest>,
) -> HttpResponse {
    admin_only!(state, user, "Set admin");

    match admin_service::set_admin(&state, &user.sub, &path, request.is_admin).await {
        Ok(target) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": target
        })),
        Err(e) => failure("Set admin", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/toggle-admin",
    tag = "Admin",
    params(
        ("id" = String, Path, description = "Target user id")
    ),
    responses(
        (status = 200, description = "Admin flag flipped", body = AdminUserResponse),
        (status = 403, description = "Admin access required, or target is the caller"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn toggle_admin(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    admin_only!(state, user, "Toggle admin");

    match admin_service::toggle_admin(&state, &user.sub, &path).await {
        Ok(target) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": target
        })),
        Err(e) => failure("Toggle admin", e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    params(
        ("id" = String, Path, description = "Target user id")
    ),
    responses(
        (status = 200, description = "User deleted (assignments are kept)"),
        (status = 403, description = "Admin access required, or target is the caller"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    admin_only!(state, user, "Delete user");

    match admin_service::delete_user(&state, &user.sub, &path).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "User deleted successfully"
        })),
        Err(e) => failure("Delete user", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "Admin",
    responses(
        (status = 200, description = "Application-wide statistics", body = AppStats),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_stats(user: web::ReqData<Claims>, state: web::Data<AppState>) -> HttpResponse {
    admin_only!(state, user, "App stats");

    match admin_service::app_stats(&state).await {
        Ok(stats) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "stats": stats
        })),
        Err(e) => failure("App stats", e),
    }
}

/// One SSE frame with the admin user list and the app totals.
pub fn admin_frame(users: Vec<AdminUserResponse>, stats: AppStats) -> String {
    live::frame(
        "snapshot",
        &serde_json::json!({
            "success": true,
            "count": users.len(),
            "users": users,
            "stats": stats
        }),
    )
}

async fn admin_snapshot(state: web::Data<AppState>, actor_id: String) -> AppResult<String> {
    // admin rebaixado durante o stream recebe 403 e o stream termina
    admin_service::require_admin(&state, &actor_id).await?;
    let users = admin_service::list_users(&state).await?;
    let stats = admin_service::app_stats(&state).await?;
    Ok(admin_frame(users, stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stream",
    tag = "Admin",
    responses(
        (status = 200, description = "Server-sent events: users and app stats on connect and after every user or assignment change", content_type = "text/event-stream"),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn admin_stream(user: web::ReqData<Claims>, state: web::Data<AppState>) -> HttpResponse {
    admin_only!(state, user, "Admin stream");

    let actor_id = user.into_inner().sub;
    let label = format!("admin:{}", actor_id);

    live::event_stream(
        state,
        label,
        |event: &ChangeEvent| event.affects_admin_view(),
        move |state: web::Data<AppState>| admin_snapshot(state, actor_id.clone()),
    )
}
