use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use chrono::{Duration, Utc};
use image_store::ImageStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::mailer::{Mailer, OutgoingMail};
use crate::models::{
    normalize_email, AdminUpdateUser, Avatar, RegisterRequest, ResetPassword, Role,
    UpdatePassword, UpdateProfile, User,
};
use crate::repository::UserRepository;

/// Image store folder for profile pictures
pub const AVATAR_FOLDER: &str = "avatars";

/// How long an emailed reset link stays usable
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

const RESET_TOKEN_BYTES: usize = 20;
const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Service layer for User business logic
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    mailer: Arc<dyn Mailer>,
    images: Arc<dyn ImageStore>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            mailer: Arc::clone(&self.mailer),
            images: Arc::clone(&self.images),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R, mailer: Arc<dyn Mailer>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            repository: Arc::new(repository),
            mailer,
            images,
        }
    }

    /// Register a new account with the `user` role
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterRequest) -> UserResult<User> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;
        validate_password(&input.password)?;

        if self.repository.email_exists(&input.email).await? {
            return Err(UserError::DuplicateEmail(normalize_email(&input.email)));
        }

        let password_hash = hash_password(&input.password)?;
        self.repository
            .create(User::new(input.name, input.email, password_hash))
            .await
    }

    /// Verify user credentials (for login)
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> UserResult<User> {
        let user = self
            .repository
            .get_by_email(email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Rejected login attempt");
            return Err(UserError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Change the caller's name and email
    #[instrument(skip(self, input))]
    pub async fn update_profile(&self, id: Uuid, input: UpdateProfile) -> UserResult<User> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;

        let mut user = self.get_user(id).await?;
        self.ensure_email_free(&user, &input.email).await?;

        user.name = input.name;
        user.email = normalize_email(&input.email);
        user.updated_at = Utc::now();
        self.repository.update(user).await
    }

    /// Change the caller's password after checking the current one
    #[instrument(skip(self, input))]
    pub async fn update_password(&self, id: Uuid, input: UpdatePassword) -> UserResult<User> {
        let mut user = self.get_user(id).await?;

        if !verify_password(&input.old_password, &user.password_hash)? {
            return Err(UserError::Validation("Old password is incorrect".to_string()));
        }
        check_confirmation(&input.new_password, &input.confirm_password)?;
        validate_password(&input.new_password)?;

        user.password_hash = hash_password(&input.new_password)?;
        user.updated_at = Utc::now();
        self.repository.update(user).await
    }

    /// Email a one-time reset link to the account holder
    ///
    /// Only the SHA-256 digest of the token is stored. The link is
    /// `{reset_base_url}/{token}`.
    #[instrument(skip(self, reset_base_url))]
    pub async fn forgot_password(&self, email: &str, reset_base_url: &str) -> UserResult<()> {
        let mut user = self
            .repository
            .get_by_email(email)
            .await?
            .ok_or_else(|| UserError::EmailNotFound(normalize_email(email)))?;

        let token = generate_reset_token();
        user.reset_password_token = Some(digest_token(&token));
        user.reset_password_expire = Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
        let mut user = self.repository.update(user).await?;

        let link = format!("{}/{}", reset_base_url.trim_end_matches('/'), token);
        let mail = OutgoingMail {
            to: user.email.clone(),
            subject: "Password Recovery".to_string(),
            body: format!(
                "Your password reset link is:\n\n{link}\n\n\
                 It expires in {RESET_TOKEN_TTL_MINUTES} minutes. \
                 If you have not requested this email, ignore it."
            ),
        };

        if let Err(e) = self.mailer.send(mail).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send reset email");
            user.clear_reset_token();
            self.repository.update(user).await?;
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "Password reset email sent");
        Ok(())
    }

    /// Set a new password with an emailed reset token
    #[instrument(skip(self, token, input))]
    pub async fn reset_password(&self, token: &str, input: ResetPassword) -> UserResult<User> {
        let mut user = self
            .repository
            .get_by_reset_token(&digest_token(token), Utc::now())
            .await?
            .ok_or(UserError::InvalidResetToken)?;

        check_confirmation(&input.password, &input.confirm_password)?;
        validate_password(&input.password)?;

        user.password_hash = hash_password(&input.password)?;
        user.clear_reset_token();
        user.updated_at = Utc::now();

        let user = self.repository.update(user).await?;
        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }

    /// Replace the user's profile picture
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn set_avatar(&self, id: Uuid, filename: &str, bytes: Vec<u8>) -> UserResult<User> {
        let mut user = self.get_user(id).await?;

        let stored = self.images.upload(AVATAR_FOLDER, bytes, filename).await?;
        let previous = user.avatar.replace(Avatar::from(stored));
        user.updated_at = Utc::now();

        let uploaded = user.avatar.clone();
        let user = match self.repository.update(user).await {
            Ok(user) => user,
            Err(e) => {
                if let Some(avatar) = &uploaded {
                    self.discard_avatar(id, avatar).await;
                }
                return Err(e);
            }
        };

        if let Some(old) = previous {
            self.discard_avatar(id, &old).await;
        }
        Ok(user)
    }

    /// All users, newest first (admin)
    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        self.repository.list(None).await
    }

    /// All vendor accounts
    pub async fn list_vendors(&self) -> UserResult<Vec<User>> {
        self.repository.list(Some(Role::Vendor)).await
    }

    /// Change another user's name, email and role (admin)
    #[instrument(skip(self, input))]
    pub async fn update_user_role(&self, id: Uuid, input: AdminUpdateUser) -> UserResult<User> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;

        let mut user = self.get_user(id).await?;
        self.ensure_email_free(&user, &input.email).await?;

        user.name = input.name;
        user.email = normalize_email(&input.email);
        user.role = input.role;
        user.updated_at = Utc::now();
        self.repository.update(user).await
    }

    /// Delete a user and their avatar (admin)
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        let user = self.get_user(id).await?;

        if !self.repository.delete(id).await? {
            return Err(UserError::NotFound(id));
        }

        if let Some(avatar) = &user.avatar {
            self.discard_avatar(id, avatar).await;
        }
        Ok(())
    }

    async fn ensure_email_free(&self, user: &User, email: &str) -> UserResult<()> {
        let email = normalize_email(email);
        if email != user.email && self.repository.email_exists(&email).await? {
            return Err(UserError::DuplicateEmail(email));
        }
        Ok(())
    }

    async fn discard_avatar(&self, user_id: Uuid, avatar: &Avatar) {
        if let Err(e) = self.images.delete(&avatar.public_id).await {
            tracing::warn!(
                user_id = %user_id,
                public_id = %avatar.public_id,
                error = %e,
                "Failed to delete avatar"
            );
        }
    }
}

fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    const_hex::encode(bytes)
}

fn digest_token(token: &str) -> String {
    const_hex::encode(Sha256::digest(token.as_bytes()))
}

fn check_confirmation(password: &str, confirmation: &str) -> UserResult<()> {
    if password != confirmation {
        return Err(UserError::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}

/// Password policy: 8 to 128 characters with upper, lower, digit and symbol
pub fn validate_password(password: &str) -> UserResult<()> {
    let length = password.chars().count();
    if length < 8 {
        return Err(UserError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    if length > 128 {
        return Err(UserError::Validation(
            "Password cannot exceed 128 characters".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(UserError::Validation(
            "Password must contain at least one uppercase letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(UserError::Validation(
            "Password must contain at least one lowercase letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(UserError::Validation(
            "Password must contain at least one digit".to_string(),
        ));
    }

    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(UserError::Validation(format!(
            "Password must contain at least one special character ({SPECIAL_CHARS})"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::CapturingMailer;
    use crate::repository::{InMemoryUserRepository, MockUserRepository};
    use image_store::InMemoryImageStore;

    const PASSWORD: &str = "Passw0rd!";

    fn service_with(
        repository: InMemoryUserRepository,
        mailer: CapturingMailer,
        images: InMemoryImageStore,
    ) -> UserService<InMemoryUserRepository> {
        UserService::new(repository, Arc::new(mailer), Arc::new(images))
    }

    fn service() -> (UserService<InMemoryUserRepository>, CapturingMailer, InMemoryImageStore) {
        let mailer = CapturingMailer::new();
        let images = InMemoryImageStore::new();
        let service = service_with(InMemoryUserRepository::new(), mailer.clone(), images.clone());
        (service, mailer, images)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ann".to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
        }
    }

    /// Token from the last link mailed to `to`
    async fn mailed_token(mailer: &CapturingMailer, to: &str) -> String {
        let mail = mailer.last_to(to).await.unwrap();
        let link = mail
            .body
            .lines()
            .find(|line| line.starts_with("http"))
            .unwrap()
            .to_string();
        link.rsplit('/').next().unwrap().to_string()
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password(PASSWORD).is_ok());
        assert!(validate_password("Sh0rt!").is_err());
        assert!(validate_password("alllowercase1!").is_err());
        assert!(validate_password("ALLUPPERCASE1!").is_err());
        assert!(validate_password("NoDigitsHere!").is_err());
        assert!(validate_password("NoSymbols123").is_err());
        assert!(validate_password(&format!("Aa1!{}", "x".repeat(125))).is_err());
    }

    #[test]
    fn test_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert_ne!(token, generate_reset_token());
        assert_eq!(digest_token(&token).len(), 64);
        assert_ne!(digest_token(&token), token);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, _, _) = service();

        let user = service.register(register_request("Ann@Shop.test")).await.unwrap();
        assert_eq!(user.email, "ann@shop.test");
        assert_ne!(user.password_hash, PASSWORD);

        let logged_in = service
            .verify_credentials("ann@shop.test", PASSWORD)
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let wrong = service.verify_credentials("ann@shop.test", "Wrong0ne!").await;
        assert!(matches!(wrong, Err(UserError::InvalidCredentials)));
        let unknown = service.verify_credentials("bob@shop.test", PASSWORD).await;
        assert!(matches!(unknown, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (service, _, _) = service();
        service.register(register_request("ann@shop.test")).await.unwrap();

        let result = service.register(register_request("ANN@shop.test")).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_register_weak_password_never_reaches_repository() {
        let repository = MockUserRepository::new();
        let service = UserService::new(
            repository,
            Arc::new(CapturingMailer::new()),
            Arc::new(InMemoryImageStore::new()),
        );

        let mut request = register_request("ann@shop.test");
        request.password = "password".to_string();
        let result = service.register(request).await;
        assert!(matches!(result, Err(UserError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_password_checks_old_and_confirmation() {
        let (service, _, _) = service();
        let user = service.register(register_request("ann@shop.test")).await.unwrap();

        let wrong_old = service
            .update_password(
                user.id,
                UpdatePassword {
                    old_password: "Wrong0ne!".into(),
                    new_password: "N3wPassword!".into(),
                    confirm_password: "N3wPassword!".into(),
                },
            )
            .await;
        assert!(matches!(wrong_old, Err(UserError::Validation(_))));

        let mismatch = service
            .update_password(
                user.id,
                UpdatePassword {
                    old_password: PASSWORD.into(),
                    new_password: "N3wPassword!".into(),
                    confirm_password: "N3wPassword?".into(),
                },
            )
            .await;
        assert!(matches!(mismatch, Err(UserError::Validation(_))));

        service
            .update_password(
                user.id,
                UpdatePassword {
                    old_password: PASSWORD.into(),
                    new_password: "N3wPassword!".into(),
                    confirm_password: "N3wPassword!".into(),
                },
            )
            .await
            .unwrap();
        assert!(service
            .verify_credentials("ann@shop.test", "N3wPassword!")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_email() {
        let (service, _, _) = service();
        service.register(register_request("ann@shop.test")).await.unwrap();
        let bob = service.register(register_request("bob@shop.test")).await.unwrap();

        let result = service
            .update_profile(
                bob.id,
                UpdateProfile {
                    name: "Bob".into(),
                    email: "ann@shop.test".into(),
                },
            )
            .await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));

        let renamed = service
            .update_profile(
                bob.id,
                UpdateProfile {
                    name: "Robert".into(),
                    email: "bob@shop.test".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Robert");
    }

    #[tokio::test]
    async fn test_forgot_and_reset_password() {
        let (service, mailer, _) = service();
        let user = service.register(register_request("ann@shop.test")).await.unwrap();

        service
            .forgot_password("ann@shop.test", "http://shop.test/password/reset/")
            .await
            .unwrap();
        let token = mailed_token(&mailer, "ann@shop.test").await;

        let stored = service.get_user(user.id).await.unwrap();
        assert_eq!(stored.reset_password_token, Some(digest_token(&token)));
        assert!(stored.reset_password_expire.unwrap() > Utc::now());

        let reset = service
            .reset_password(
                &token,
                ResetPassword {
                    password: "N3wPassword!".into(),
                    confirm_password: "N3wPassword!".into(),
                },
            )
            .await
            .unwrap();
        assert!(reset.reset_password_token.is_none());
        assert!(reset.reset_password_expire.is_none());
        assert!(service
            .verify_credentials("ann@shop.test", "N3wPassword!")
            .await
            .is_ok());

        // Tokens are single use
        let again = service
            .reset_password(
                &token,
                ResetPassword {
                    password: "An0therOne!".into(),
                    confirm_password: "An0therOne!".into(),
                },
            )
            .await;
        assert!(matches!(again, Err(UserError::InvalidResetToken)));
    }

    #[tokio::test]
    async fn test_reset_rejects_expired_token() {
        let repository = InMemoryUserRepository::new();
        let service = service_with(
            repository.clone(),
            CapturingMailer::new(),
            InMemoryImageStore::new(),
        );

        let mut user = User::new("Ann".into(), "ann@shop.test".into(), "hash".into());
        user.reset_password_token = Some(digest_token("stale"));
        user.reset_password_expire = Some(Utc::now() - Duration::minutes(1));
        repository.create(user).await.unwrap();

        let result = service
            .reset_password(
                "stale",
                ResetPassword {
                    password: PASSWORD.into(),
                    confirm_password: PASSWORD.into(),
                },
            )
            .await;
        assert!(matches!(result, Err(UserError::InvalidResetToken)));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let (service, mailer, _) = service();

        let result = service
            .forgot_password("nobody@shop.test", "http://shop.test/password/reset")
            .await;
        assert!(matches!(result, Err(UserError::EmailNotFound(_))));
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_forgot_password_mail_failure_clears_token() {
        let repository = InMemoryUserRepository::new();
        let service = service_with(
            repository.clone(),
            CapturingMailer::failing("relay down"),
            InMemoryImageStore::new(),
        );
        let user = service.register(register_request("ann@shop.test")).await.unwrap();

        let result = service
            .forgot_password("ann@shop.test", "http://shop.test/password/reset")
            .await;
        assert!(matches!(result, Err(UserError::Mail(_))));

        let stored = repository.get_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.reset_password_token.is_none());
        assert!(stored.reset_password_expire.is_none());
    }

    #[tokio::test]
    async fn test_set_avatar_replaces_previous() {
        let (service, _, images) = service();
        let user = service.register(register_request("ann@shop.test")).await.unwrap();

        let first = service
            .set_avatar(user.id, "me.png", vec![1, 2, 3])
            .await
            .unwrap()
            .avatar
            .unwrap();
        let second = service
            .set_avatar(user.id, "me2.png", vec![4, 5, 6])
            .await
            .unwrap()
            .avatar
            .unwrap();

        assert!(first.public_id.starts_with(AVATAR_FOLDER));
        assert!(!images.contains(&first.public_id).await);
        assert!(images.contains(&second.public_id).await);
    }

    #[tokio::test]
    async fn test_set_avatar_store_failure() {
        let repository = InMemoryUserRepository::new();
        let service = service_with(
            repository,
            CapturingMailer::new(),
            InMemoryImageStore::failing("store down"),
        );
        let user = service.register(register_request("ann@shop.test")).await.unwrap();

        let result = service.set_avatar(user.id, "me.png", vec![1]).await;
        assert!(matches!(result, Err(UserError::ImageStore(_))));
        assert!(service.get_user(user.id).await.unwrap().avatar.is_none());
    }

    #[tokio::test]
    async fn test_admin_role_change_and_vendor_listing() {
        let (service, _, _) = service();
        let ann = service.register(register_request("ann@shop.test")).await.unwrap();
        service.register(register_request("bob@shop.test")).await.unwrap();

        let vendor = service
            .update_user_role(
                ann.id,
                AdminUpdateUser {
                    name: "Ann's Shop".into(),
                    email: "ann@shop.test".into(),
                    role: Role::Vendor,
                },
            )
            .await
            .unwrap();
        assert_eq!(vendor.role, Role::Vendor);

        let vendors = service.list_vendors().await.unwrap();
        assert_eq!(vendors.len(), 1);
        assert_eq!(vendors[0].id, ann.id);
        assert_eq!(service.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_user_removes_avatar() {
        let (service, _, images) = service();
        let user = service.register(register_request("ann@shop.test")).await.unwrap();
        let avatar = service
            .set_avatar(user.id, "me.png", vec![1, 2, 3])
            .await
            .unwrap()
            .avatar
            .unwrap();

        service.delete_user(user.id).await.unwrap();

        assert!(!images.contains(&avatar.public_id).await);
        assert!(matches!(
            service.get_user(user.id).await,
            Err(UserError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_user(user.id).await,
            Err(UserError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_user_surfaces_database_errors() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_get_by_id()
            .returning(|_| Err(UserError::Database("connection reset".into())));
        let service = UserService::new(
            repository,
            Arc::new(CapturingMailer::new()),
            Arc::new(InMemoryImageStore::new()),
        );

        let result = service.get_user(Uuid::now_v7()).await;
        assert!(matches!(result, Err(UserError::Database(_))));
    }
}
