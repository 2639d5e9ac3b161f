use chrono::Utc;

use crate::database::ChangeEvent;
use crate::models::{AdminUserResponse, AppStats, AssignmentQuery, User, UserUpdate};
use crate::services::stats_service;
use crate::state::AppState;
use crate::utils::{AppError, AppResult};

/// Loads the caller and checks the stored admin flag (not the token claim,
/// which may be stale after a toggle).
pub async fn require_admin(state: &AppState, user_id: &str) -> AppResult<User> {
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if !user.is_admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(user)
}

/// All users, newest first, with their assignment counts.
pub async fn list_users(state: &AppState) -> AppResult<Vec<AdminUserResponse>> {
    let mut users = state.store.list_users().await?;
    let counts = state.store.count_assignments_by_owner().await?;

    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(users
        .into_iter()
        .map(|user| stats_service::admin_user(user, &counts))
        .collect())
}

pub async fn set_admin(
    state: &AppState,
    actor_id: &str,
    target_id: &str,
    is_admin: bool,
) -> AppResult<AdminUserResponse> {
    if actor_id == target_id {
        return Err(AppError::Forbidden("Cannot modify your own admin status".to_string()));
    }

    let update = UserUpdate { is_admin: Some(is_admin), ..Default::default() };
    if !state.store.update_user(target_id, &update).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    state.feed.publish(ChangeEvent::UsersChanged);

    log::info!("🛡️ Admin status of {} set to {} by {}", target_id, is_admin, actor_id);

    user_with_count(state, target_id).await
}

pub async fn toggle_admin(state: &AppState, actor_id: &str, target_id: &str) -> AppResult<AdminUserResponse> {
    let target = state
        .store
        .find_user(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    set_admin(state, actor_id, target_id, !target.is_admin).await
}

/// Removes the user record only; their assignments are left in place.
pub async fn delete_user(state: &AppState, actor_id: &str, target_id: &str) -> AppResult<()> {
    if actor_id == target_id {
        return Err(AppError::Forbidden("Cannot delete your own account".to_string()));
    }

    if !state.store.delete_user(target_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    state.feed.publish(ChangeEvent::UsersChanged);

    log::info!("🗑️ User {} deleted by {}", target_id, actor_id);
    Ok(())
}

pub async fn app_stats(state: &AppState) -> AppResult<AppStats> {
    let users = state.store.list_users().await?;
    let assignments = state.store.query_assignments(&AssignmentQuery::default()).await?;
    let counts = state.store.count_assignments_by_owner().await?;

    Ok(stats_service::app_stats(&users, &assignments, &counts, Utc::now()))
}

async fn user_with_count(state: &AppState, user_id: &str) -> AppResult<AdminUserResponse> {
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let counts = state.store.count_assignments_by_owner().await?;

    Ok(stats_service::admin_user(user, &counts))
}
