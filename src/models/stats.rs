use serde::Serialize;
use std::collections::BTreeMap;

use super::{AdminUserResponse, AssignmentResponse};

/// Dashboard cards: every assignment lands in exactly one of
/// `completed`, `pending` or `overdue`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub upcoming: Vec<AssignmentResponse>,
    pub recent: Vec<AssignmentResponse>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AppStats {
    pub total_users: usize,
    pub total_assignments: usize,
    pub assignments_by_status: BTreeMap<String, usize>,
    pub assignments_by_priority: BTreeMap<String, usize>,
    pub recent_users: Vec<AdminUserResponse>,
    pub active_users_today: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct CalendarDay {
    /// YYYY-MM-DD
    pub date: String,
    pub count: usize,
}
