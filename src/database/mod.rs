pub mod change_feed;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;

use crate::models::{Assignment, AssignmentQuery, AssignmentUpdate, User, UserUpdate};
use crate::utils::AppResult;

pub use change_feed::{ChangeEvent, ChangeFeed};
pub use memory::MemoryStore;
pub use mongo::MongoDB;

pub const USERS: &str = "users";
pub const ASSIGNMENTS: &str = "assignments";

/// Request/response interface over the document store holding the
/// `users` and `assignments` collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> AppResult<()>;
    async fn find_user(&self, user_id: &str) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    /// Returns `false` when no such user exists.
    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> AppResult<bool>;
    async fn delete_user(&self, user_id: &str) -> AppResult<bool>;

    async fn insert_assignment(&self, assignment: &Assignment) -> AppResult<ObjectId>;
    /// Lookups are always scoped to the owning user.
    async fn find_assignment(&self, id: &ObjectId, user_id: &str) -> AppResult<Option<Assignment>>;
    async fn query_assignments(&self, query: &AssignmentQuery) -> AppResult<Vec<Assignment>>;
    /// Applies the partial write and returns the updated document, or `None`
    /// when the assignment does not exist for this owner.
    async fn update_assignment(
        &self,
        id: &ObjectId,
        user_id: &str,
        update: &AssignmentUpdate,
    ) -> AppResult<Option<Assignment>>;
    async fn delete_assignment(&self, id: &ObjectId, user_id: &str) -> AppResult<bool>;
    /// Number of assignments per owning user.
    async fn count_assignments_by_owner(&self) -> AppResult<HashMap<String, u64>>;

    async fn health_check(&self) -> AppResult<bool>;
}
