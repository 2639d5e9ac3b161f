use chrono::Utc;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::Deserialize;

use crate::database::ChangeEvent;
use crate::models::{
    Assignment, AssignmentQuery, AssignmentResponse, AssignmentStatus, AssignmentUpdate,
    CreateAssignmentRequest, UpdateAssignmentRequest,
};
use crate::state::AppState;
use crate::utils::time::parse_rfc3339;
use crate::utils::{AppError, AppResult};

/// Query string accepted by the list endpoint
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssignmentListQuery {
    /// Inclusive lower bound on the due date (RFC 3339)
    pub from: Option<String>,
    /// Inclusive upper bound on the due date (RFC 3339)
    pub to: Option<String>,
    /// Filters on the effective status, so `overdue` matches derived overdue items
    pub status: Option<AssignmentStatus>,
}

pub fn parse_assignment_id(id: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| AppError::InvalidRequest("Invalid assignment ID".to_string()))
}

fn not_found() -> AppError {
    AppError::NotFound("Assignment not found".to_string())
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Owner's assignments ordered by due date ascending.
pub async fn list(state: &AppState, user_id: &str, query: &AssignmentListQuery) -> AppResult<Vec<Assignment>> {
    let mut store_query = AssignmentQuery::owned_by(user_id);
    if let Some(from) = &query.from {
        store_query.due_from = Some(parse_rfc3339("from", from)?);
    }
    if let Some(to) = &query.to {
        store_query.due_to = Some(parse_rfc3339("to", to)?);
    }

    let assignments = state.store.query_assignments(&store_query).await?;

    Ok(match query.status {
        Some(status) => {
            let now = Utc::now();
            assignments
                .into_iter()
                .filter(|a| a.effective_status(now) == status)
                .collect()
        }
        None => assignments,
    })
}

pub async fn get(state: &AppState, user_id: &str, id: &str) -> AppResult<Assignment> {
    let object_id = parse_assignment_id(id)?;
    state
        .store
        .find_assignment(&object_id, user_id)
        .await?
        .ok_or_else(not_found)
}

pub async fn create(
    state: &AppState,
    user_id: &str,
    request: &CreateAssignmentRequest,
) -> AppResult<Assignment> {
    let title = required("Title", &request.title)?;
    let subject = required("Subject", &request.subject)?;
    let due_date = parse_rfc3339("due_date", &request.due_date)?;

    let now = BsonDateTime::now();
    let mut assignment = Assignment {
        id: None,
        title,
        description: optional_text(&request.description),
        subject,
        due_date,
        priority: request.priority,
        status: AssignmentStatus::Pending,
        user_id: user_id.to_string(),
        created_at: now,
        updated_at: now,
    };

    let id = state.store.insert_assignment(&assignment).await?;
    assignment.id = Some(id);

    state.feed.publish(ChangeEvent::AssignmentsChanged { user_id: user_id.to_string() });
    log::info!("📝 Assignment {} created for user {}", id.to_hex(), user_id);

    Ok(assignment)
}

fn build_update(request: &UpdateAssignmentRequest) -> AppResult<AssignmentUpdate> {
    Ok(AssignmentUpdate {
        title: request.title.as_deref().map(|t| required("Title", t)).transpose()?,
        description: request.description.as_deref().map(|d| d.trim().to_string()),
        subject: request.subject.as_deref().map(|s| required("Subject", s)).transpose()?,
        due_date: request
            .due_date
            .as_deref()
            .map(|d| parse_rfc3339("due_date", d))
            .transpose()?,
        priority: request.priority,
        status: request.status,
    })
}

async fn apply_update(
    state: &AppState,
    user_id: &str,
    id: &str,
    update: AssignmentUpdate,
) -> AppResult<Assignment> {
    let object_id = parse_assignment_id(id)?;
    let updated = state
        .store
        .update_assignment(&object_id, user_id, &update)
        .await?
        .ok_or_else(not_found)?;

    state.feed.publish(ChangeEvent::AssignmentsChanged { user_id: user_id.to_string() });
    Ok(updated)
}

pub async fn update(
    state: &AppState,
    user_id: &str,
    id: &str,
    request: &UpdateAssignmentRequest,
) -> AppResult<Assignment> {
    let update = build_update(request)?;
    apply_update(state, user_id, id, update).await
}

pub async fn set_status(
    state: &AppState,
    user_id: &str,
    id: &str,
    status: AssignmentStatus,
) -> AppResult<Assignment> {
    apply_update(state, user_id, id, AssignmentUpdate::status(status)).await
}

pub async fn complete(state: &AppState, user_id: &str, id: &str) -> AppResult<Assignment> {
    set_status(state, user_id, id, AssignmentStatus::Completed).await
}

pub async fn delete(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
    let object_id = parse_assignment_id(id)?;
    if !state.store.delete_assignment(&object_id, user_id).await? {
        return Err(not_found());
    }

    state.feed.publish(ChangeEvent::AssignmentsChanged { user_id: user_id.to_string() });
    log::info!("🗑️ Assignment {} deleted for user {}", id, user_id);
    Ok(())
}

pub fn to_responses(assignments: Vec<Assignment>) -> Vec<AssignmentResponse> {
    let now = Utc::now();
    assignments
        .into_iter()
        .map(|a| AssignmentResponse::from_assignment(a, now))
        .collect()
}
