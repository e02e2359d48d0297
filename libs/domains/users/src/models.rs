use chrono::{DateTime, Utc};
use image_store::StoredImage;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Vendor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "vendor" => Ok(Role::Vendor),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Profile picture held by the image store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Avatar {
    pub public_id: String,
    pub url: String,
}

impl From<StoredImage> for Avatar {
    fn from(image: StoredImage) -> Self {
        Self {
            public_id: image.public_id,
            url: image.url,
        }
    }
}

/// User entity - represents an account stored in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    /// Lowercased, unique
    pub email: String,
    /// Argon2 PHC string, never exposed in API responses
    pub password_hash: String,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    #[serde(default)]
    pub role: Role,
    /// SHA-256 hex of the emailed reset token
    #[serde(default)]
    pub reset_password_token: Option<String>,
    #[serde(default)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User response DTO (without password and reset fields)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<Avatar>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            avatar: user.avatar,
            created_at: user.created_at,
        }
    }
}

/// DTO for user registration
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    pub password: String,
}

/// DTO for user login
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// `PUT /me/update` body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
}

/// `PUT /password/update` body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdatePassword {
    #[validate(length(min = 1))]
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// `POST /password/forgot` body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPassword {
    #[validate(email, length(max = 255))]
    pub email: String,
}

/// `PUT /password/reset/{token}` body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPassword {
    pub password: String,
    pub confirm_password: String,
}

/// `PUT /admin/users/{id}` body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUser {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    pub role: Role,
}

/// Response after login, registration and password changes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// Same JWT as the `token` cookie
    pub token: String,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl User {
    /// Create a new user (password must already be hashed)
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name,
            email: normalize_email(&email),
            password_hash,
            avatar: None,
            role: Role::User,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `token_hash` matches the stored reset token and has not expired.
    pub fn reset_token_valid(&self, token_hash: &str, now: DateTime<Utc>) -> bool {
        self.reset_password_token.as_deref() == Some(token_hash)
            && self.reset_password_expire.is_some_and(|expire| expire > now)
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expire = None;
    }
}

/// Emails are compared and stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
