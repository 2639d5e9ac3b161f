pub mod admin;
pub mod assignments;
pub mod auth;
pub mod calendar;
pub mod dashboard;
pub mod health;
pub mod live;
pub mod metrics;
pub mod swagger;

use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::AuthMiddleware;
use crate::utils::AppError;

/// Logs a failed operation and turns it into the JSON error response.
pub(crate) fn failure(context: &str, e: AppError) -> HttpResponse {
    if e.status_code().is_server_error() {
        log::error!("❌ {} failed: {}", context, e);
    } else {
        log::warn!("❌ {} failed: {}", context, e);
    }
    e.error_response()
}

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Auth endpoints
        .service(
            web::scope("/api/v1/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(auth::get_me)),
                )
                .service(
                    web::resource("/logout")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(auth::logout)),
                )
                .service(
                    web::resource("/profile")
                        .wrap(AuthMiddleware)
                        .route(web::patch().to(auth::update_profile)),
                ),
        )
        // Assignments: CRUD + live stream - Requires JWT
        .service(
            web::scope("/api/v1/assignments")
                .wrap(AuthMiddleware)
                .route("", web::get().to(assignments::list_assignments))
                .route("", web::post().to(assignments::create_assignment))
                // DEVE FICAR ANTES de /{id}
                .route("/stream", web::get().to(assignments::assignment_stream))
                .route("/{id}", web::get().to(assignments::get_assignment))
                .route("/{id}", web::put().to(assignments::update_assignment))
                .route("/{id}", web::delete().to(assignments::delete_assignment))
                .route("/{id}/status", web::patch().to(assignments::update_status))
                .route("/{id}/complete", web::post().to(assignments::complete_assignment)),
        )
        .service(
            web::scope("/api/v1/dashboard")
                .wrap(AuthMiddleware)
                .route("", web::get().to(dashboard::get_dashboard)),
        )
        .service(
            web::scope("/api/v1/calendar")
                .wrap(AuthMiddleware)
                .route("/day", web::get().to(calendar::get_day))
                .route("/month", web::get().to(calendar::get_month)),
        )
        // Admin: user management + app stats + live stream - JWT + is_admin
        .service(
            web::scope("/api/v1/admin")
                .wrap(AuthMiddleware)
                .route("/stream", web::get().to(admin::admin_stream))
                .route("/users", web::get().to(admin::list_users))
                .route("/users/{id}", web::delete().to(admin::delete_user))
                .route("/users/{id}/admin", web::patch().to(admin::set_admin))
                .route("/users/{id}/toggle-admin", web::post().to(admin::toggle_admin))
                .route("/stats", web::get().to(admin::get_stats)),
        );
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use actix_web::{
        body::MessageBody,
        dev::{Service, ServiceResponse},
        http::StatusCode,
        test,
    };

    use std::pin::Pin;
    use std::time::Duration;

    use crate::services::auth_service::{self, RegisterRequest};
    use crate::state::AppState;

    /// Reads a JSON body from a test response.
    pub async fn json_body<B: MessageBody>(resp: ServiceResponse<B>) -> serde_json::Value {
        let bytes = test::read_body(resp).await;
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    }

    pub fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }

    /// Registers `<name>@example.com` straight through the service and
    /// returns `(token, user_id)`.
    pub async fn signed_up(state: &AppState, name: &str) -> (String, String) {
        let request = RegisterRequest {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
        };
        let response = auth_service::register(state, &request).await.unwrap();
        (response.token, response.user.id)
    }

    /// Status of a request that may be short-circuited by a middleware error.
    pub async fn rejected_status<S, R, B>(app: &S, req: R) -> StatusCode
    where
        S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    {
        match test::try_call_service(app, req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        }
    }

    /// Next chunk of a streaming body; each chunk of an SSE response is one frame.
    pub async fn next_frame<B: MessageBody>(body: &mut Pin<Box<B>>) -> Option<String> {
        match std::future::poll_fn(|cx| body.as_mut().poll_next(cx)).await {
            Some(Ok(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            _ => None,
        }
    }

    /// Like [`next_frame`], but gives up after `millis`.
    pub async fn frame_within<B: MessageBody>(body: &mut Pin<Box<B>>, millis: u64) -> Option<String> {
        tokio::time::timeout(Duration::from_millis(millis), next_frame(body))
            .await
            .ok()
            .flatten()
    }
}
