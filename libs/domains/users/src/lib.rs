//! Users Domain
//!
//! Accounts, sessions and password recovery for the shop.
//!
//! # Features
//!
//! - Registration and login with Argon2 password hashes
//! - JWT sessions carried in an `HttpOnly` cookie
//! - Password recovery through emailed one-time links
//! - Avatars kept in the image store
//! - Admin user management and role changes
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum_helpers::{JwtAuth, JwtConfig};
//! use domain_users::{handlers, CapturingMailer, InMemoryUserRepository, UserService};
//! use image_store::InMemoryImageStore;
//!
//! let service = UserService::new(
//!     InMemoryUserRepository::new(),
//!     Arc::new(CapturingMailer::new()),
//!     Arc::new(InMemoryImageStore::new()),
//! );
//! let auth = JwtAuth::new(&JwtConfig::new("a-secret-of-at-least-32-characters!"));
//! let settings = handlers::SessionSettings {
//!     reset_base_url: "http://localhost:3000/password/reset".to_string(),
//!     secure_cookies: false,
//! };
//!
//! let router = handlers::router(service, auth, settings);
//! ```

pub mod error;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{UserError, UserResult};
pub use handlers::SessionSettings;
pub use mailer::{CapturingMailer, MailConfig, MailError, Mailer, OutgoingMail, SmtpMailer};
pub use models::{Avatar, Role, User, UserResponse};
pub use mongodb::MongoUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
