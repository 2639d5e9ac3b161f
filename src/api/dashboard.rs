use actix_web::{web, HttpResponse};

use crate::api::failure;
use crate::middleware::auth::Claims;
use crate::models::DashboardStats;
use crate::services::stats_service;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Completed / pending / overdue counts plus upcoming and recent assignments", body = DashboardStats),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_dashboard(user: web::ReqData<Claims>, state: web::Data<AppState>) -> HttpResponse {
    log::debug!("📊 GET /dashboard - user: {}", user.sub);

    match stats_service::dashboard(&state, &user.sub).await {
        Ok(stats) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "stats": stats
        })),
        Err(e) => failure("Dashboard", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{bearer, json_body, signed_up};
    use crate::models::{CreateAssignmentRequest, Priority};
    use crate::services::assignment_service;
    use crate::state::test_support::test_state;
    use actix_web::{http::StatusCode, test, App};
    use chrono::{Duration, Utc};

    fn request(title: &str, due_in_days: i64) -> CreateAssignmentRequest {
        CreateAssignmentRequest {
            title: title.to_string(),
            description: None,
            subject: "Physics".to_string(),
            due_date: (Utc::now() + Duration::days(due_in_days)).to_rfc3339(),
            priority: Priority::Low,
        }
    }

    #[actix_rt::test]
    async fn counts_partition_the_assignments() {
        let state = web::Data::new(test_state());
        let (token, user_id) = signed_up(&state, "Ada").await;

        assignment_service::create(&state, &user_id, &request("Lab report", -2)).await.unwrap();
        assignment_service::create(&state, &user_id, &request("Problem set", 3)).await.unwrap();
        let done = assignment_service::create(&state, &user_id, &request("Reading", 1)).await.unwrap();
        let done_id = done.id.unwrap().to_hex();
        assignment_service::complete(&state, &user_id, &done_id).await.unwrap();

        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/v1/dashboard")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stats = &json_body(resp).await["stats"];
        assert_eq!(stats["total"], 3);
        assert_eq!(stats["completed"], 1);
        assert_eq!(stats["overdue"], 1);
        assert_eq!(stats["pending"], 1);
    }
}
