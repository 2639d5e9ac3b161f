use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::time::to_rfc3339;

/// Account stored in the `users` collection
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub user_id: String,  // PRIMARY IDENTIFIER
    pub email: String,
    /// bcrypt hash; never leaves the service
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: BsonDateTime,
    pub last_login_at: BsonDateTime,
}

/// Partial write against a user document; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub is_admin: Option<bool>,
    pub last_login_at: Option<BsonDateTime>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_admin.is_none() && self.last_login_at.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(is_admin) = self.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(last_login_at) = self.last_login_at {
            user.last_login_at = last_login_at;
        }
    }
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub created_at: String,
    pub last_login_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.user_id,
            email: user.email,
            name: user.name,
            is_admin: user.is_admin,
            created_at: to_rfc3339(user.created_at),
            last_login_at: to_rfc3339(user.last_login_at),
        }
    }
}

/// User row on the admin screen, with the derived assignment count
#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct AdminUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub assignment_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            user_id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            password: "$2b$04$hash".to_string(),
            name: "Ada".to_string(),
            is_admin: false,
            created_at: BsonDateTime::from_millis(0),
            last_login_at: BsonDateTime::from_millis(0),
        }
    }

    #[test]
    fn response_never_exposes_password() {
        let json = serde_json::to_value(UserResponse::from(sample())).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["id"], "u1");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn missing_admin_flag_defaults_to_false() {
        let doc = mongodb::bson::doc! {
            "user_id": "u1",
            "email": "ada@example.com",
            "password": "x",
            "name": "Ada",
            "created_at": BsonDateTime::from_millis(0),
            "last_login_at": BsonDateTime::from_millis(0),
        };
        let user: User = mongodb::bson::from_document(doc).unwrap();
        assert!(!user.is_admin);
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut user = sample();
        UserUpdate { is_admin: Some(true), ..Default::default() }.apply(&mut user);
        assert!(user.is_admin);
        assert_eq!(user.name, "Ada");
    }
}
