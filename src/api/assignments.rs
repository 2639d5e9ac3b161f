use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};

use crate::api::{failure, live};
use crate::database::ChangeEvent;
use crate::middleware::auth::Claims;
use crate::models::{
    Assignment, AssignmentResponse, CreateAssignmentRequest, UpdateAssignmentRequest,
    UpdateStatusRequest,
};
use crate::services::assignment_service::{self, AssignmentListQuery};
use crate::services::stats_service;
use crate::state::AppState;
use crate::utils::AppError;

fn assignment_json(assignment: Assignment) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "assignment": AssignmentResponse::from(assignment)
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments",
    tag = "Assignments",
    params(AssignmentListQuery),
    responses(
        (status = 200, description = "Assignments ordered by due date", body = Vec<AssignmentResponse>),
        (status = 400, description = "Invalid date filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_assignments(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    query: web::Query<AssignmentListQuery>,
) -> HttpResponse {
    log::debug!("📋 GET /assignments - user: {}", user.sub);

    match assignment_service::list(&state, &user.sub, &query).await {
        Ok(assignments) => {
            let assignments = assignment_service::to_responses(assignments);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "count": assignments.len(),
                "assignments": assignments
            }))
        }
        Err(e) => failure("List assignments", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments",
    tag = "Assignments",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 201, description = "Assignment created", body = AssignmentResponse),
        (status = 400, description = "Missing title or subject, or invalid due date"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_assignment(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    request: web::Json<CreateAssignmentRequest>,
) -> HttpResponse {
    log::info!("📝 POST /assignments - user: {}, title: {}", user.sub, request.title);

    match assignment_service::create(&state, &user.sub, &request).await {
        Ok(assignment) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "assignment": AssignmentResponse::from(assignment)
        })),
        Err(e) => failure("Create assignment", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/{id}",
    tag = "Assignments",
    params(
        ("id" = String, Path, description = "Assignment ObjectId")
    ),
    responses(
        (status = 200, description = "Assignment", body = AssignmentResponse),
        (status = 400, description = "Invalid assignment ID"),
        (status = 404, description = "Assignment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_assignment(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    match assignment_service::get(&state, &user.sub, &path).await {
        Ok(assignment) => assignment_json(assignment),
        Err(e) => failure("Get assignment", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/assignments/{id}",
    tag = "Assignments",
    params(
        ("id" = String, Path, description = "Assignment ObjectId")
    ),
    request_body = UpdateAssignmentRequest,
    responses(
        (status = 200, description = "Assignment updated", body = AssignmentResponse),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Assignment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_assignment(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<UpdateAssignmentRequest>,
) -> HttpResponse {
    log::info!("✏️ PUT /assignments/{} - user: {}", path, user.sub);

    match assignment_service::update(&state, &user.sub, &path, &request).await {
        Ok(assignment) => assignment_json(assignment),
        Err(e) => failure("Update assignment", e),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/assignments/{id}/status",
    tag = "Assignments",
    params(
        ("id" = String, Path, description = "Assignment ObjectId")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = AssignmentResponse),
        (status = 404, description = "Assignment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_status(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<UpdateStatusRequest>,
) -> HttpResponse {
    log::info!("🔄 PATCH /assignments/{}/status -> {}", path, request.status);

    match assignment_service::set_status(&state, &user.sub, &path, request.status).await {
        Ok(assignment) => assignment_json(assignment),
        Err(e) => failure("Update status", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/complete",
    tag = "Assignments",
    params(
        ("id" = String, Path, description = "Assignment ObjectId")
    ),
    responses(
        (status = 200, description = "Marked as completed", body = AssignmentResponse),
        (status = 404, description = "Assignment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn complete_assignment(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    match assignment_service::complete(&state, &user.sub, &path).await {
        Ok(assignment) => assignment_json(assignment),
        Err(e) => failure("Complete assignment", e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/assignments/{id}",
    tag = "Assignments",
    params(
        ("id" = String, Path, description = "Assignment ObjectId")
    ),
    responses(
        (status = 200, description = "Assignment deleted"),
        (status = 404, description = "Assignment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_assignment(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    match assignment_service::delete(&state, &user.sub, &path).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Assignment deleted successfully"
        })),
        Err(e) => failure("Delete assignment", e),
    }
}

/// One SSE frame carrying the owner's assignments and their dashboard stats.
pub fn snapshot_frame(assignments: Vec<Assignment>, now: DateTime<Utc>) -> String {
    let stats = stats_service::dashboard_stats(&assignments, now);
    let assignments: Vec<AssignmentResponse> = assignments
        .into_iter()
        .map(|a| AssignmentResponse::from_assignment(a, now))
        .collect();

    live::frame(
        "snapshot",
        &serde_json::json!({
            "success": true,
            "assignments": assignments,
            "stats": stats
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/stream",
    tag = "Assignments",
    responses(
        (status = 200, description = "Server-sent events: a `snapshot` frame on connect and after every change", content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn assignment_stream(user: web::ReqData<Claims>, state: web::Data<AppState>) -> HttpResponse {
    let user_id = user.into_inner().sub;
    let owner = user_id.clone();
    let label = format!("assignments:{}", user_id);

    live::event_stream(
        state,
        label,
        move |event: &ChangeEvent| event.affects_assignments_of(&owner),
        move |state: web::Data<AppState>| {
            let user_id = user_id.clone();
            async move {
                let assignments =
                    assignment_service::list(&state, &user_id, &AssignmentListQuery::default()).await?;
                Ok::<_, AppError>(snapshot_frame(assignments, Utc::now()))
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{bearer, frame_within, json_body, next_frame, rejected_status, signed_up};
    use crate::models::{sample_assignment, AssignmentStatus};
    use crate::state::test_support::test_state;
    use actix_web::{http::header, http::StatusCode, test, App};
    use chrono::Duration;

    fn essay(due: DateTime<Utc>) -> serde_json::Value {
        serde_json::json!({
            "title": "Essay",
            "description": "Five pages",
            "subject": "History",
            "due_date": due.to_rfc3339(),
            "priority": "high"
        })
    }

    #[actix_rt::test]
    async fn create_then_list_in_due_order() {
        let state = web::Data::new(test_state());
        let (token, user_id) = signed_up(&state, "Ada").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let now = Utc::now();
        for days in [5, 1] {
            let req = test::TestRequest::post()
                .uri("/api/v1/assignments")
                .insert_header(bearer(&token))
                .set_json(essay(now + Duration::days(days)))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body = json_body(resp).await;
            assert_eq!(body["assignment"]["status"], "pending");
            assert_eq!(body["assignment"]["user_id"], user_id.as_str());
        }

        let req = test::TestRequest::get()
            .uri("/api/v1/assignments")
            .insert_header(bearer(&token))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body["count"], 2);

        let first = body["assignments"][0]["due_date"].as_str().unwrap().to_string();
        let second = body["assignments"][1]["due_date"].as_str().unwrap().to_string();
        assert!(first < second);
    }

    #[actix_rt::test]
    async fn other_users_cannot_see_or_delete() {
        let state = web::Data::new(test_state());
        let (owner, _) = signed_up(&state, "Ada").await;
        let (intruder, _) = signed_up(&state, "Bob").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/assignments")
            .insert_header(bearer(&owner))
            .set_json(essay(Utc::now() + Duration::days(2)))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        let id = body["assignment"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/assignments/{}", id))
            .insert_header(bearer(&intruder))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/assignments/{}", id))
            .insert_header(bearer(&intruder))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/assignments/{}", id))
            .insert_header(bearer(&owner))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn complete_and_status_endpoints() {
        let state = web::Data::new(test_state());
        let (token, _) = signed_up(&state, "Ada").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/assignments")
            .insert_header(bearer(&token))
            .set_json(essay(Utc::now() - Duration::days(1)))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        let id = body["assignment"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["assignment"]["is_overdue"], true);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/assignments/{}/status", id))
            .insert_header(bearer(&token))
            .set_json(serde_json::json!({ "status": "in_progress" }))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body["assignment"]["status"], "in_progress");
        assert_eq!(body["assignment"]["effective_status"], "overdue");

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/assignments/{}/complete", id))
            .insert_header(bearer(&token))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body["assignment"]["status"], "completed");
        assert_eq!(body["assignment"]["is_overdue"], false);
    }

    #[actix_rt::test]
    async fn invalid_id_and_missing_title_are_bad_requests() {
        let state = web::Data::new(test_state());
        let (token, _) = signed_up(&state, "Ada").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/assignments/not-an-id")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "Invalid assignment ID");

        let mut blank = essay(Utc::now());
        blank["title"] = serde_json::json!("   ");
        let req = test::TestRequest::post()
            .uri("/api/v1/assignments")
            .insert_header(bearer(&token))
            .set_json(blank)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "Title is required");
    }

    #[actix_rt::test]
    async fn requires_authentication() {
        let state = web::Data::new(test_state());
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/assignments").to_request();
        assert_eq!(rejected_status(&app, req).await, StatusCode::UNAUTHORIZED);
    }

    fn frame_payload(frame: &str) -> serde_json::Value {
        let (_, data) = frame.trim_end().split_once("data: ").unwrap();
        serde_json::from_str(data).unwrap()
    }

    fn due_in(title: &str, days: i64) -> CreateAssignmentRequest {
        CreateAssignmentRequest {
            title: title.to_string(),
            description: None,
            subject: "History".to_string(),
            due_date: (Utc::now() + Duration::days(days)).to_rfc3339(),
            priority: crate::models::Priority::Medium,
        }
    }

    #[actix_rt::test]
    async fn stream_snapshots_on_connect_and_after_own_changes() {
        let state = web::Data::new(test_state());
        let (token, user_id) = signed_up(&state, "Ada").await;
        let (_, other_id) = signed_up(&state, "Bob").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::api::configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/assignments/stream")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );

        let mut body = Box::pin(resp.into_body());
        let first = next_frame(&mut body).await.unwrap();
        assert!(first.starts_with("event: snapshot\n"));
        assert_eq!(frame_payload(&first)["assignments"].as_array().unwrap().len(), 0);

        // mudança de outro usuário não gera frame
        assignment_service::create(&state, &other_id, &due_in("Not mine", 1)).await.unwrap();
        assert!(frame_within(&mut body, 100).await.is_none());

        assignment_service::create(&state, &user_id, &due_in("Mine", 2)).await.unwrap();
        let second = frame_within(&mut body, 1_000).await.unwrap();
        assert!(second.starts_with("event: snapshot\n"));

        let payload = frame_payload(&second);
        assert_eq!(payload["assignments"][0]["title"], "Mine");
        assert_eq!(payload["stats"]["pending"], 1);
    }

    #[actix_rt::test]
    async fn snapshot_frame_carries_assignments_and_stats() {
        let now = Utc::now();
        let assignments = vec![
            sample_assignment("u1", now - Duration::days(1), AssignmentStatus::Pending),
            sample_assignment("u1", now + Duration::days(1), AssignmentStatus::Completed),
        ];

        let frame = snapshot_frame(assignments, now);
        assert!(frame.starts_with("event: snapshot\ndata: "));
        assert!(frame.ends_with("\n\n"));

        let payload = frame_payload(&frame);
        assert_eq!(payload["assignments"].as_array().unwrap().len(), 2);
        assert_eq!(payload["stats"]["total"], 2);
        assert_eq!(payload["stats"]["overdue"], 1);
        assert_eq!(payload["stats"]["completed"], 1);
    }
}
