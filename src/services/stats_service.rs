use chrono::{DateTime, Duration, NaiveDate, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use std::collections::{BTreeMap, HashMap};

use crate::models::{
    AdminUserResponse, AppStats, Assignment, AssignmentQuery, AssignmentResponse, AssignmentStatus,
    CalendarDay, DashboardStats, User, UserResponse, UserUpdate,
};
use crate::state::AppState;
use crate::utils::time::{day_bounds, month_bounds, start_of_day, to_bson, to_chrono};
use crate::utils::{AppError, AppResult};

const UPCOMING_LIMIT: usize = 5;
const RECENT_LIMIT: usize = 5;
const RECENT_USERS_LIMIT: usize = 10;

/// Computes the dashboard cards. Each assignment is counted exactly once:
/// completed if its status says so, otherwise overdue if past due, otherwise pending.
pub fn dashboard_stats(assignments: &[Assignment], now: DateTime<Utc>) -> DashboardStats {
    let mut completed = 0;
    let mut pending = 0;
    let mut overdue = 0;

    for assignment in assignments {
        if assignment.status == AssignmentStatus::Completed {
            completed += 1;
        } else if assignment.is_overdue(now) {
            overdue += 1;
        } else {
            pending += 1;
        }
    }

    let mut upcoming: Vec<&Assignment> = assignments
        .iter()
        .filter(|a| a.status != AssignmentStatus::Completed && !a.is_overdue(now))
        .collect();
    upcoming.sort_by_key(|a| a.due_date.timestamp_millis());

    let mut recent: Vec<&Assignment> = assignments.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let to_response = |a: &&Assignment| AssignmentResponse::from_assignment((*a).clone(), now);

    DashboardStats {
        total: assignments.len(),
        completed,
        pending,
        overdue,
        upcoming: upcoming.iter().take(UPCOMING_LIMIT).map(to_response).collect(),
        recent: recent.iter().take(RECENT_LIMIT).map(to_response).collect(),
    }
}

pub fn admin_user(user: User, counts: &HashMap<String, u64>) -> AdminUserResponse {
    let assignment_count = counts.get(&user.user_id).copied().unwrap_or(0);
    AdminUserResponse {
        user: UserResponse::from(user),
        assignment_count,
    }
}

/// Aggregate counters for the admin screen.
pub fn app_stats(
    users: &[User],
    assignments: &[Assignment],
    counts: &HashMap<String, u64>,
    now: DateTime<Utc>,
) -> AppStats {
    let mut assignments_by_status = BTreeMap::new();
    let mut assignments_by_priority = BTreeMap::new();

    for assignment in assignments {
        *assignments_by_status.entry(assignment.status.to_string()).or_insert(0) += 1;
        *assignments_by_priority.entry(assignment.priority.to_string()).or_insert(0) += 1;
    }

    let today = to_bson(start_of_day(now)).timestamp_millis();
    let active_users_today = users
        .iter()
        .filter(|u| u.last_login_at.timestamp_millis() >= today)
        .count();

    let mut newest: Vec<&User> = users.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    AppStats {
        total_users: users.len(),
        total_assignments: assignments.len(),
        assignments_by_status,
        assignments_by_priority,
        recent_users: newest
            .into_iter()
            .take(RECENT_USERS_LIMIT)
            .map(|u| admin_user(u.clone(), counts))
            .collect(),
        active_users_today,
    }
}

/// Per-day due counts for every day of the month, zero days included.
pub fn calendar_month(assignments: &[Assignment], first: NaiveDate, last: NaiveDate) -> Vec<CalendarDay> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for assignment in assignments {
        let day = to_chrono(assignment.due_date).date_naive();
        *per_day.entry(day).or_insert(0) += 1;
    }

    let mut days = Vec::new();
    let mut day = first;
    while day <= last {
        days.push(CalendarDay {
            date: day.to_string(),
            count: per_day.get(&day).copied().unwrap_or(0),
        });
        day += Duration::days(1);
    }
    days
}

/// Dashboard for the signed-in user. Opening the dashboard also records the login time.
pub async fn dashboard(state: &AppState, user_id: &str) -> AppResult<DashboardStats> {
    let touched = state
        .store
        .update_user(
            user_id,
            &UserUpdate { last_login_at: Some(BsonDateTime::now()), ..Default::default() },
        )
        .await?;
    if !touched {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let assignments = state
        .store
        .query_assignments(&AssignmentQuery::owned_by(user_id))
        .await?;

    Ok(dashboard_stats(&assignments, Utc::now()))
}

pub async fn assignments_on(state: &AppState, user_id: &str, date: NaiveDate) -> AppResult<Vec<Assignment>> {
    let (from, to) = day_bounds(date)?;
    let query = AssignmentQuery {
        due_from: Some(from),
        due_to: Some(to),
        ..AssignmentQuery::owned_by(user_id)
    };
    state.store.query_assignments(&query).await
}

pub async fn month_overview(state: &AppState, user_id: &str, year: i32, month: u32) -> AppResult<Vec<CalendarDay>> {
    let (first, last) = month_bounds(year, month)?;
    let query = AssignmentQuery {
        due_from: Some(day_bounds(first)?.0),
        due_to: Some(day_bounds(last)?.1),
        ..AssignmentQuery::owned_by(user_id)
    };
    let assignments = state.store.query_assignments(&query).await?;
    Ok(calendar_month(&assignments, first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_assignment, Priority};

    fn user(id: &str, created_ms: i64, last_login: DateTime<Utc>) -> User {
        User {
            user_id: id.to_string(),
            email: format!("{}@example.com", id),
            password: String::new(),
            name: id.to_string(),
            is_admin: false,
            created_at: BsonDateTime::from_millis(created_ms),
            last_login_at: to_bson(last_login),
        }
    }

    #[test]
    fn dashboard_counts_partition_the_set() {
        let now = Utc::now();
        let assignments = vec![
            sample_assignment("u", now - Duration::days(1), AssignmentStatus::Completed),
            sample_assignment("u", now - Duration::days(1), AssignmentStatus::Pending),
            sample_assignment("u", now - Duration::hours(1), AssignmentStatus::InProgress),
            sample_assignment("u", now + Duration::days(1), AssignmentStatus::Pending),
            sample_assignment("u", now + Duration::days(2), AssignmentStatus::InProgress),
            // a stored "overdue" that is actually in the future still counts as pending
            sample_assignment("u", now + Duration::days(3), AssignmentStatus::Overdue),
        ];

        let stats = dashboard_stats(&assignments, now);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.overdue, 2);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.completed + stats.pending + stats.overdue, stats.total);
    }

    #[test]
    fn upcoming_is_soonest_first_and_capped() {
        let now = Utc::now();
        let assignments: Vec<_> = (1..=7)
            .rev()
            .map(|d| sample_assignment("u", now + Duration::days(d), AssignmentStatus::Pending))
            .collect();

        let stats = dashboard_stats(&assignments, now);
        assert_eq!(stats.upcoming.len(), 5);
        assert!(stats.upcoming.windows(2).all(|w| w[0].due_date <= w[1].due_date));
        assert_eq!(stats.recent.len(), 5);
    }

    #[test]
    fn empty_dashboard() {
        let stats = dashboard_stats(&[], Utc::now());
        assert_eq!(stats.total, 0);
        assert!(stats.upcoming.is_empty());
    }

    #[test]
    fn app_stats_aggregates_users_and_assignments() {
        let now = Utc::now();
        let users = vec![
            user("old", 1_000, now - Duration::days(3)),
            user("new", 2_000, now),
        ];
        let mut high = sample_assignment("new", now, AssignmentStatus::Completed);
        high.priority = Priority::High;
        let assignments = vec![
            high,
            sample_assignment("new", now, AssignmentStatus::Pending),
            sample_assignment("old", now, AssignmentStatus::Pending),
        ];
        let counts = HashMap::from([("new".to_string(), 2), ("old".to_string(), 1)]);

        let stats = app_stats(&users, &assignments, &counts, now);
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_assignments, 3);
        assert_eq!(stats.assignments_by_status.get("pending"), Some(&2));
        assert_eq!(stats.assignments_by_status.get("completed"), Some(&1));
        assert_eq!(stats.assignments_by_priority.get("high"), Some(&1));
        assert_eq!(stats.assignments_by_priority.get("medium"), Some(&2));
        assert_eq!(stats.active_users_today, 1);
        assert_eq!(stats.recent_users[0].user.id, "new");
        assert_eq!(stats.recent_users[0].assignment_count, 2);
    }

    #[test]
    fn calendar_month_includes_empty_days() {
        let first = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let due = first.and_hms_opt(23, 30, 0).unwrap().and_utc() + Duration::days(9);
        let assignments = vec![
            sample_assignment("u", due, AssignmentStatus::Pending),
            sample_assignment("u", due, AssignmentStatus::Completed),
        ];

        let days = calendar_month(&assignments, first, last);
        assert_eq!(days.len(), 28);
        assert_eq!(days[9], CalendarDay { date: "2026-02-10".to_string(), count: 2 });
        assert_eq!(days.iter().map(|d| d.count).sum::<usize>(), 2);
    }
}
