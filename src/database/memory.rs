use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::DocumentStore;
use crate::models::{Assignment, AssignmentQuery, AssignmentUpdate, User, UserUpdate};
use crate::utils::{AppError, AppResult};

/// In-process document store with the same semantics as the MongoDB backend.
/// Used with `STORAGE_BACKEND=memory` and by the test suite.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    assignments: RwLock<Vec<Assignment>>,
}

fn poisoned() -> AppError {
    AppError::Internal("In-memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users_read(&self) -> AppResult<RwLockReadGuard<'_, Vec<User>>> {
        self.users.read().map_err(|_| poisoned())
    }

    fn users_write(&self) -> AppResult<RwLockWriteGuard<'_, Vec<User>>> {
        self.users.write().map_err(|_| poisoned())
    }

    fn assignments_read(&self) -> AppResult<RwLockReadGuard<'_, Vec<Assignment>>> {
        self.assignments.read().map_err(|_| poisoned())
    }

    fn assignments_write(&self) -> AppResult<RwLockWriteGuard<'_, Vec<Assignment>>> {
        self.assignments.write().map_err(|_| poisoned())
    }
}

fn owned_by(assignment: &Assignment, id: &ObjectId, user_id: &str) -> bool {
    assignment.id.as_ref() == Some(id) && assignment.user_id == user_id
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let mut users = self.users_write()?;
        // mirrors the unique indexes on users(user_id) and users(email)
        if users.iter().any(|u| u.user_id == user.user_id || u.email == user.email) {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.users_read()?.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users_read()?.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.users_read()?.clone())
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> AppResult<bool> {
        let mut users = self.users_write()?;
        match users.iter_mut().find(|u| u.user_id == user_id) {
            Some(user) => {
                update.apply(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, user_id: &str) -> AppResult<bool> {
        let mut users = self.users_write()?;
        let before = users.len();
        users.retain(|u| u.user_id != user_id);
        Ok(users.len() < before)
    }

    async fn insert_assignment(&self, assignment: &Assignment) -> AppResult<ObjectId> {
        let id = assignment.id.unwrap_or_else(ObjectId::new);
        let mut stored = assignment.clone();
        stored.id = Some(id);
        self.assignments_write()?.push(stored);
        Ok(id)
    }

    async fn find_assignment(&self, id: &ObjectId, user_id: &str) -> AppResult<Option<Assignment>> {
        Ok(self
            .assignments_read()?
            .iter()
            .find(|a| owned_by(a, id, user_id))
            .cloned())
    }

    async fn query_assignments(&self, query: &AssignmentQuery) -> AppResult<Vec<Assignment>> {
        let mut found: Vec<Assignment> = self
            .assignments_read()?
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();

        // stable sort keeps insertion order for equal due dates
        found.sort_by_key(|a| a.due_date.timestamp_millis());
        Ok(found)
    }

    async fn update_assignment(
        &self,
        id: &ObjectId,
        user_id: &str,
        update: &AssignmentUpdate,
    ) -> AppResult<Option<Assignment>> {
        let mut assignments = self.assignments_write()?;
        match assignments.iter_mut().find(|a| owned_by(a, id, user_id)) {
            Some(assignment) => {
                update.apply(assignment, BsonDateTime::now());
                Ok(Some(assignment.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_assignment(&self, id: &ObjectId, user_id: &str) -> AppResult<bool> {
        let mut assignments = self.assignments_write()?;
        let before = assignments.len();
        assignments.retain(|a| !owned_by(a, id, user_id));
        Ok(assignments.len() < before)
    }

    async fn count_assignments_by_owner(&self) -> AppResult<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for assignment in self.assignments_read()?.iter() {
            *counts.entry(assignment.user_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_assignment, AssignmentStatus};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn query_orders_by_due_date_and_scopes_owner() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let later = sample_assignment("u1", now + Duration::days(3), AssignmentStatus::Pending);
        let sooner = sample_assignment("u1", now + Duration::days(1), AssignmentStatus::Pending);
        let foreign = sample_assignment("u2", now, AssignmentStatus::Pending);

        store.insert_assignment(&later).await.unwrap();
        store.insert_assignment(&sooner).await.unwrap();
        store.insert_assignment(&foreign).await.unwrap();

        let found = store.query_assignments(&AssignmentQuery::owned_by("u1")).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, sooner.id);
        assert_eq!(found[1].id, later.id);
    }

    #[tokio::test]
    async fn updates_and_deletes_are_owner_scoped() {
        let store = MemoryStore::new();
        let a = sample_assignment("u1", Utc::now(), AssignmentStatus::Pending);
        let id = store.insert_assignment(&a).await.unwrap();

        let update = AssignmentUpdate::status(AssignmentStatus::Completed);
        assert!(store.update_assignment(&id, "u2", &update).await.unwrap().is_none());
        assert!(!store.delete_assignment(&id, "u2").await.unwrap());

        let updated = store.update_assignment(&id, "u1", &update).await.unwrap().unwrap();
        assert_eq!(updated.status, AssignmentStatus::Completed);
        assert!(store.delete_assignment(&id, "u1").await.unwrap());
        assert!(store.find_assignment(&id, "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn counts_assignments_per_owner() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for owner in ["u1", "u1", "u2"] {
            store
                .insert_assignment(&sample_assignment(owner, now, AssignmentStatus::Pending))
                .await
                .unwrap();
        }

        let counts = store.count_assignments_by_owner().await.unwrap();
        assert_eq!(counts.get("u1"), Some(&2));
        assert_eq!(counts.get("u2"), Some(&1));
    }
}
