use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use std::collections::HashMap;

use super::{DocumentStore, ASSIGNMENTS, USERS};
use crate::models::{Assignment, AssignmentQuery, AssignmentUpdate, User, UserUpdate};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> AppResult<Self> {
        let mut client_options = ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let db_name = client_options
            .default_database
            .clone()
            .unwrap_or_else(|| "assignmate".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes backing the per-user queries
    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<Document>(USERS);

        let user_id_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(user_id_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(user_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // assignments(user_id, due_date) - lista ordenada + calendário
        let assignments = self.collection::<Document>(ASSIGNMENTS);

        let due_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "due_date": 1 })
            .build();

        match assignments.create_index(due_index).await {
            Ok(_) => log::info!("   ✅ Index created: assignments(user_id, due_date)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    fn users(&self) -> Collection<User> {
        self.collection(USERS)
    }

    fn assignments(&self) -> Collection<Assignment> {
        self.collection(ASSIGNMENTS)
    }
}

fn user_set_doc(update: &UserUpdate) -> Document {
    let mut set = Document::new();
    if let Some(name) = &update.name {
        set.insert("name", name);
    }
    if let Some(is_admin) = update.is_admin {
        set.insert("is_admin", is_admin);
    }
    if let Some(last_login_at) = update.last_login_at {
        set.insert("last_login_at", last_login_at);
    }
    set
}

fn assignment_set_doc(update: &AssignmentUpdate) -> Document {
    let mut set = doc! { "updated_at": BsonDateTime::now() };
    if let Some(title) = &update.title {
        set.insert("title", title);
    }
    if let Some(description) = &update.description {
        set.insert("description", description);
    }
    if let Some(subject) = &update.subject {
        set.insert("subject", subject);
    }
    if let Some(due_date) = update.due_date {
        set.insert("due_date", due_date);
    }
    if let Some(priority) = update.priority {
        set.insert("priority", priority.to_string());
    }
    if let Some(status) = update.status {
        set.insert("status", status.to_string());
    }
    set
}

fn assignment_filter(query: &AssignmentQuery) -> Document {
    let mut filter = Document::new();
    if let Some(user_id) = &query.user_id {
        filter.insert("user_id", user_id);
    }

    let mut due = Document::new();
    if let Some(from) = query.due_from {
        due.insert("$gte", from);
    }
    if let Some(to) = query.due_to {
        due.insert("$lte", to);
    }
    if !due.is_empty() {
        filter.insert("due_date", due);
    }
    filter
}

/// E11000: violated a unique index.
fn is_duplicate_key(e: &MongoError) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == 11000
    )
}

#[async_trait]
impl DocumentStore for MongoDB {
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        // o índice único em email resolve a corrida entre dois cadastros
        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict("Email already in use".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.users().find_one(doc! { "user_id": user_id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let cursor = self.users().find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> AppResult<bool> {
        if update.is_empty() {
            return Ok(self.find_user(user_id).await?.is_some());
        }

        let result = self
            .users()
            .update_one(doc! { "user_id": user_id }, doc! { "$set": user_set_doc(update) })
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn delete_user(&self, user_id: &str) -> AppResult<bool> {
        let result = self.users().delete_one(doc! { "user_id": user_id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_assignment(&self, assignment: &Assignment) -> AppResult<ObjectId> {
        let result = self.assignments().insert_one(assignment).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::DatabaseError("Inserted id is not an ObjectId".to_string()))
    }

    async fn find_assignment(&self, id: &ObjectId, user_id: &str) -> AppResult<Option<Assignment>> {
        Ok(self
            .assignments()
            .find_one(doc! { "_id": *id, "user_id": user_id })
            .await?)
    }

    async fn query_assignments(&self, query: &AssignmentQuery) -> AppResult<Vec<Assignment>> {
        let cursor = self
            .assignments()
            .find(assignment_filter(query))
            .sort(doc! { "due_date": 1 })
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn update_assignment(
        &self,
        id: &ObjectId,
        user_id: &str,
        update: &AssignmentUpdate,
    ) -> AppResult<Option<Assignment>> {
        Ok(self
            .assignments()
            .find_one_and_update(
                doc! { "_id": *id, "user_id": user_id },
                doc! { "$set": assignment_set_doc(update) },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_assignment(&self, id: &ObjectId, user_id: &str) -> AppResult<bool> {
        let result = self
            .assignments()
            .delete_one(doc! { "_id": *id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn count_assignments_by_owner(&self) -> AppResult<HashMap<String, u64>> {
        let pipeline = vec![doc! {
            "$group": { "_id": "$user_id", "count": { "$sum": 1 } }
        }];

        let mut cursor = self.collection::<Document>(ASSIGNMENTS).aggregate(pipeline).await?;
        let mut counts = HashMap::new();

        while let Some(row) = cursor.try_next().await? {
            let user_id = match row.get_str("_id") {
                Ok(id) => id.to_string(),
                Err(_) => continue,
            };
            let count = match row.get("count") {
                Some(Bson::Int32(n)) => *n as u64,
                Some(Bson::Int64(n)) => *n as u64,
                _ => 0,
            };
            counts.insert(user_id, count);
        }

        Ok(counts)
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(true)
    }
}
