use actix_web::{web, HttpResponse};

use crate::api::failure;
use crate::middleware::auth::Claims;
use crate::services::auth_service::{
    self, AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid form (empty fields, short password, mismatched confirmation)"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email.trim());

    match auth_service::register(&state, &request).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => failure("Registration", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "User not found or invalid password")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email.trim());

    match auth_service::login(&state, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", response.user.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => failure("Login", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current session user", body = crate::models::UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(user: web::ReqData<Claims>, state: web::Data<AppState>) -> HttpResponse {
    match auth_service::current_user(&state, &user.sub).await {
        Ok(me) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": me
        })),
        Err(e) => failure("Get current user", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Token revoked"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(user: web::ReqData<Claims>, state: web::Data<AppState>) -> HttpResponse {
    auth_service::logout(&state, &user);
    log::info!("👋 User {} signed out", user.sub);

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Signed out"
    }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/auth/profile",
    tag = "Auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Display name updated", body = crate::models::UserResponse),
        (status = 400, description = "Name is required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_profile(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    request: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    match auth_service::update_display_name(&state, &user.sub, &request.name).await {
        Ok(updated) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": updated
        })),
        Err(e) => failure("Update profile", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{bearer, json_body, rejected_status, signed_up};
    use crate::state::test_support::test_state;
    use actix_web::{http::StatusCode, test, App};

    #[actix_rt::test]
    async fn register_returns_token_and_user() {
        let state = web::Data::new(test_state());
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(serde_json::json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "secret",
                "confirm_password": "secret"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = json_body(resp).await;
        assert_eq!(body["success"], true);
        assert!(body["token"].as_str().is_some());
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert!(body["user"].get("password").is_none());
    }

    #[actix_rt::test]
    async fn register_reports_validation_message() {
        let state = web::Data::new(test_state());
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(serde_json::json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "secret",
                "confirm_password": "different"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "Passwords do not match");
    }

    #[actix_rt::test]
    async fn logout_revokes_the_token() {
        let state = web::Data::new(test_state());
        let (token, _) = signed_up(&state, "Ada").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let me = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, me).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["user"]["name"], "Ada");

        let logout = test::TestRequest::post()
            .uri("/api/v1/auth/logout")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, logout).await.status(), StatusCode::OK);

        let me_again = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(rejected_status(&app, me_again).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn missing_token_is_unauthorized() {
        let state = web::Data::new(test_state());
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
        assert_eq!(rejected_status(&app, req).await, StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(("Authorization", "Token abc"))
            .to_request();
        assert_eq!(rejected_status(&app, req).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn profile_update_changes_display_name() {
        let state = web::Data::new(test_state());
        let (token, _) = signed_up(&state, "Ada").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::patch()
            .uri("/api/v1/auth/profile")
            .insert_header(bearer(&token))
            .set_json(serde_json::json!({ "name": "Ada Lovelace" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["user"]["name"], "Ada Lovelace");
    }
}
