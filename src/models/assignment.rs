use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::time::{to_bson, to_rfc3339};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Stored status of an assignment.
///
/// `Overdue` is accepted for compatibility with older clients, but the
/// dashboards always derive it from the due date (see [`Assignment::is_overdue`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::Pending => write!(f, "pending"),
            AssignmentStatus::InProgress => write!(f, "in_progress"),
            AssignmentStatus::Completed => write!(f, "completed"),
            AssignmentStatus::Overdue => write!(f, "overdue"),
        }
    }
}

/// Assignment stored in the `assignments` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub subject: String,

    pub due_date: BsonDateTime,

    pub priority: Priority,

    pub status: AssignmentStatus,

    /// Owner (`users.user_id`)
    pub user_id: String,

    pub created_at: BsonDateTime,

    pub updated_at: BsonDateTime,
}

impl Assignment {
    /// True iff the assignment is not completed and its due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != AssignmentStatus::Completed
            && self.due_date.timestamp_millis() < to_bson(now).timestamp_millis()
    }

    pub fn effective_status(&self, now: DateTime<Utc>) -> AssignmentStatus {
        if self.is_overdue(now) {
            AssignmentStatus::Overdue
        } else {
            self.status
        }
    }
}

/// Request para criar assignment
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    /// RFC 3339 timestamp
    pub due_date: String,
    pub priority: Priority,
}

/// Request para atualizar assignment
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<AssignmentStatus>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    pub status: AssignmentStatus,
}

/// Partial write against an assignment document. The store always bumps
/// `updated_at`, even if every other field is `None`.
#[derive(Debug, Clone, Default)]
pub struct AssignmentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub due_date: Option<BsonDateTime>,
    pub priority: Option<Priority>,
    pub status: Option<AssignmentStatus>,
}

impl AssignmentUpdate {
    pub fn status(status: AssignmentStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn apply(&self, assignment: &mut Assignment, now: BsonDateTime) {
        if let Some(title) = &self.title {
            assignment.title = title.clone();
        }
        if let Some(description) = &self.description {
            assignment.description = Some(description.clone());
        }
        if let Some(subject) = &self.subject {
            assignment.subject = subject.clone();
        }
        if let Some(due_date) = self.due_date {
            assignment.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            assignment.priority = priority;
        }
        if let Some(status) = self.status {
            assignment.status = status;
        }
        assignment.updated_at = now;
    }
}

/// Filter for assignment queries; results are always sorted by due date ascending.
#[derive(Debug, Clone, Default)]
pub struct AssignmentQuery {
    pub user_id: Option<String>,
    /// Inclusive lower bound on `due_date`
    pub due_from: Option<BsonDateTime>,
    /// Inclusive upper bound on `due_date`
    pub due_to: Option<BsonDateTime>,
}

impl AssignmentQuery {
    pub fn owned_by(user_id: &str) -> Self {
        Self { user_id: Some(user_id.to_string()), ..Default::default() }
    }

    pub fn matches(&self, assignment: &Assignment) -> bool {
        if let Some(user_id) = &self.user_id {
            if &assignment.user_id != user_id {
                return false;
            }
        }
        let due = assignment.due_date.timestamp_millis();
        if let Some(from) = self.due_from {
            if due < from.timestamp_millis() {
                return false;
            }
        }
        if let Some(to) = self.due_to {
            if due > to.timestamp_millis() {
                return false;
            }
        }
        true
    }
}

/// Response de assignment
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AssignmentResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub due_date: String,
    pub priority: Priority,
    pub status: AssignmentStatus,
    pub effective_status: AssignmentStatus,
    pub is_overdue: bool,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AssignmentResponse {
    pub fn from_assignment(assignment: Assignment, now: DateTime<Utc>) -> Self {
        let is_overdue = assignment.is_overdue(now);
        let effective_status = assignment.effective_status(now);

        AssignmentResponse {
            id: assignment.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: assignment.title,
            description: assignment.description,
            subject: assignment.subject,
            due_date: to_rfc3339(assignment.due_date),
            priority: assignment.priority,
            status: assignment.status,
            effective_status,
            is_overdue,
            user_id: assignment.user_id,
            created_at: to_rfc3339(assignment.created_at),
            updated_at: to_rfc3339(assignment.updated_at),
        }
    }
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        AssignmentResponse::from_assignment(assignment, Utc::now())
    }
}

#[cfg(test)]
pub(crate) fn sample_assignment(user_id: &str, due: DateTime<Utc>, status: AssignmentStatus) -> Assignment {
    Assignment {
        id: Some(ObjectId::new()),
        title: "Essay".to_string(),
        description: None,
        subject: "History".to_string(),
        due_date: to_bson(due),
        priority: Priority::Medium,
        status,
        user_id: user_id.to_string(),
        created_at: to_bson(due),
        updated_at: to_bson(due),
    }
}
