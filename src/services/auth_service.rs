use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::database::ChangeEvent;
use crate::models::{User, UserResponse, UserUpdate};
use crate::state::AppState;
use crate::utils::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 6;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // user_id
    pub email: String,
    pub name: String,
    pub is_admin: bool,        // informativo; permissões são checadas no banco
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
    pub jti: String,           // JWT ID
    pub aud: String,           // audience
    pub iss: String,           // issuer
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    /// Unix timestamp (seconds)
    pub expires_at: usize,
    pub user: UserResponse,
}

/// Registration form after trimming and validation
#[derive(Debug, PartialEq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Validates the registration form: required fields and password rules first,
/// email format last.
pub fn validate_registration(request: &RegisterRequest) -> AppResult<RegistrationForm> {
    let name = request.name.trim();
    let email = request.email.trim();
    let password = request.password.trim();
    let confirm_password = request.confirm_password.trim();

    if name.is_empty() {
        return Err(AppError::InvalidRequest("Name is required".to_string()));
    }
    if email.is_empty() {
        return Err(AppError::InvalidRequest("Email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::InvalidRequest("Password is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm_password {
        return Err(AppError::InvalidRequest("Passwords do not match".to_string()));
    }
    if !looks_like_email(email) {
        return Err(AppError::InvalidRequest("Invalid email address".to_string()));
    }

    Ok(RegistrationForm {
        name: name.to_string(),
        email: normalize_email(email),
        password: password.to_string(),
    })
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Generate JWT token
pub fn generate_jwt(jwt: &JwtConfig, user: &User) -> AppResult<(String, Claims)> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.user_id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        is_admin: user.is_admin,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(jwt.ttl_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: jwt.audience.clone(),
        iss: jwt.issuer.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))?;

    Ok((token, claims))
}

// Verify JWT token
pub fn verify_token(jwt: &JwtConfig, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[jwt.audience.as_str()]);
    validation.set_issuer(&[jwt.issuer.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Signed-out token ids, kept until the token would have expired anyway.
#[derive(Default)]
pub struct TokenRevocations {
    revoked: RwLock<HashMap<String, usize>>,
}

impl TokenRevocations {
    pub fn revoke(&self, jti: &str, exp: usize) {
        let now = Utc::now().timestamp() as usize;
        if let Ok(mut revoked) = self.revoked.write() {
            revoked.retain(|_, expires| *expires > now);
            revoked.insert(jti.to_string(), exp);
        }
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked
            .read()
            .map(|revoked| revoked.contains_key(jti))
            .unwrap_or(false)
    }
}

fn auth_response(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let (token, claims) = generate_jwt(&state.jwt, &user)?;
    Ok(AuthResponse {
        success: true,
        token,
        expires_at: claims.exp,
        user: UserResponse::from(user),
    })
}

// User registration
pub async fn register(state: &AppState, request: &RegisterRequest) -> AppResult<AuthResponse> {
    let form = validate_registration(request)?;

    if state.store.find_user_by_email(&form.email).await?.is_some() {
        return Err(AppError::Conflict("Email already in use".to_string()));
    }

    let hashed_password = hash(&form.password, state.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    let now = BsonDateTime::now();
    let user = User {
        user_id: ObjectId::new().to_hex(),
        email: form.email,
        password: hashed_password,
        name: form.name,
        is_admin: false,
        created_at: now,
        last_login_at: now,
    };

    state.store.insert_user(&user).await?;
    state.feed.publish(ChangeEvent::UsersChanged);

    log::info!("✅ User registered successfully: {}", user.email);

    auth_response(state, user)
}

// User login
pub async fn login(state: &AppState, request: &LoginRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&request.email);
    let password = request.password.trim();

    if email.is_empty() {
        return Err(AppError::InvalidRequest("Email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::InvalidRequest("Password is required".to_string()));
    }

    let mut user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let valid = verify(password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))?;

    if !valid {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let now = BsonDateTime::now();
    state
        .store
        .update_user(&user.user_id, &UserUpdate { last_login_at: Some(now), ..Default::default() })
        .await?;
    user.last_login_at = now;

    auth_response(state, user)
}

// Get current user
pub async fn current_user(state: &AppState, user_id: &str) -> AppResult<UserResponse> {
    state
        .store
        .find_user(user_id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Signs the session out by revoking its token id.
pub fn logout(state: &AppState, claims: &Claims) {
    state.revocations.revoke(&claims.jti, claims.exp);
}

pub async fn update_display_name(
    state: &AppState,
    user_id: &str,
    name: &str,
) -> AppResult<UserResponse> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("Name is required".to_string()));
    }

    let update = UserUpdate { name: Some(name.to_string()), ..Default::default() };
    if !state.store.update_user(user_id, &update).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    state.feed.publish(ChangeEvent::UsersChanged);

    current_user(state, user_id).await
}
