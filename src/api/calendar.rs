use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::api::failure;
use crate::middleware::auth::Claims;
use crate::models::{AssignmentResponse, CalendarDay};
use crate::services::{assignment_service, stats_service};
use crate::state::AppState;
use crate::utils::time::parse_date;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DayQuery {
    /// YYYY-MM-DD
    pub date: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

fn day_message(count: usize) -> String {
    match count {
        0 => "No assignments due on this date".to_string(),
        1 => "1 assignment due on this date".to_string(),
        n => format!("{} assignments due on this date", n),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/calendar/day",
    tag = "Calendar",
    params(DayQuery),
    responses(
        (status = 200, description = "Assignments due on the selected date", body = Vec<AssignmentResponse>),
        (status = 400, description = "Invalid date")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_day(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    query: web::Query<DayQuery>,
) -> HttpResponse {
    let date = match parse_date(&query.date) {
        Ok(date) => date,
        Err(e) => return failure("Calendar day", e),
    };

    match stats_service::assignments_on(&state, &user.sub, date).await {
        Ok(assignments) => {
            let message = day_message(assignments.len());
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "date": date.to_string(),
                "message": message,
                "assignments": assignment_service::to_responses(assignments)
            }))
        }
        Err(e) => failure("Calendar day", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/calendar/month",
    tag = "Calendar",
    params(MonthQuery),
    responses(
        (status = 200, description = "Due counts for every day of the month", body = Vec<CalendarDay>),
        (status = 400, description = "Invalid month")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_month(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    query: web::Query<MonthQuery>,
) -> HttpResponse {
    match stats_service::month_overview(&state, &user.sub, query.year, query.month).await {
        Ok(days) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "year": query.year,
            "month": query.month,
            "days": days
        })),
        Err(e) => failure("Calendar month", e),
    }
}
