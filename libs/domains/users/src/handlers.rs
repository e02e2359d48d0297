//! HTTP handlers for accounts, sessions and user administration

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    middleware,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use axum_helpers::{
    clear_session_cookie,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
    optional_jwt_auth_middleware, session_cookie, AppError, JwtAuth, JwtClaims, UuidPath,
    ValidatedJson,
};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::error::UserResult;
use crate::models::{
    AdminUpdateUser, AuthResponse, Avatar, ForgotPassword, LoginRequest, MessageResponse,
    RegisterRequest, ResetPassword, Role, UpdatePassword, UpdateProfile, User, UserResponse,
};
use crate::repository::UserRepository;
use crate::service::UserService;

const ADMIN: &str = "admin";

/// Upload size cap for `PUT /me/avatar`
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// OpenAPI documentation for Users API
#[derive(OpenApi)]
#[openapi(
    paths(
        register,
        login,
        logout,
        forgot_password,
        reset_password,
        me,
        update_profile,
        update_avatar,
        update_password,
        list_users,
        get_user,
        update_user,
        delete_user,
        list_vendors,
    ),
    components(
        schemas(
            UserResponse, Role, Avatar, RegisterRequest, LoginRequest, UpdateProfile,
            UpdatePassword, ForgotPassword, ResetPassword, AdminUpdateUser, AuthResponse,
            MessageResponse, AvatarUploadForm
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Auth", description = "Registration, sessions and password recovery"),
        (name = "Profile", description = "The signed-in user's account"),
        (name = "Admin", description = "User administration")
    )
)]
pub struct ApiDoc;

/// Multipart body of an avatar upload
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AvatarUploadForm {
    /// Image file
    #[schema(value_type = String, format = Binary)]
    avatar: Vec<u8>,
}

/// Session and link settings for the users router
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Reset links are `{reset_base_url}/{token}`
    pub reset_base_url: String,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

struct UsersState<R: UserRepository> {
    service: UserService<R>,
    auth: JwtAuth,
    settings: SessionSettings,
}

type SharedState<R> = State<Arc<UsersState<R>>>;

/// Create the users router with all HTTP endpoints
pub fn router<R: UserRepository + 'static>(
    service: UserService<R>,
    auth: JwtAuth,
    settings: SessionSettings,
) -> Router {
    let state = Arc::new(UsersState {
        service,
        auth: auth.clone(),
        settings,
    });

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/{token}", put(reset_password))
        .route("/password/update", put(update_password))
        .route("/me", get(me))
        .route("/me/update", put(update_profile))
        .route(
            "/me/avatar",
            put(update_avatar).layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES)),
        )
        .route("/admin/users", get(list_users))
        .route(
            "/admin/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/vendors", get(list_vendors))
        .layer(middleware::from_fn_with_state(
            auth,
            optional_jwt_auth_middleware,
        ))
        .with_state(state)
}

/// Issue a token for `user`, set it as the session cookie and echo it in the body.
fn start_session<R: UserRepository>(
    state: &UsersState<R>,
    user: User,
    status: StatusCode,
) -> Result<Response, AppError> {
    let token = state
        .auth
        .create_token(
            &user.id.to_string(),
            &user.email,
            &user.name,
            &[user.role.to_string()],
        )
        .map_err(|e| {
            tracing::error!("Failed to create token: {:?}", e);
            AppError::InternalServerError("Failed to create token".to_string())
        })?;

    let cookie = session_cookie(&token, state.auth.ttl_secs(), state.settings.secure_cookies)
        .map_err(|e| AppError::InternalServerError(format!("Failed to create cookie: {e}")))?;

    let body = AuthResponse {
        user: user.into(),
        token,
    };
    Ok((status, AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)).into_response())
}

/// Register a new account and sign in
#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register<R: UserRepository>(
    State(state): SharedState<R>,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> Result<Response, AppError> {
    let user = state.service.register(input).await?;
    start_session(&state, user, StatusCode::CREATED)
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn login<R: UserRepository>(
    State(state): SharedState<R>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> Result<Response, AppError> {
    let user = state
        .service
        .verify_credentials(&input.email, &input.password)
        .await?;
    start_session(&state, user, StatusCode::OK)
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Signed out", body = MessageResponse)
    )
)]
async fn logout<R: UserRepository>(State(state): SharedState<R>) -> impl IntoResponse {
    (
        AppendHeaders([(
            header::SET_COOKIE,
            clear_session_cookie(state.settings.secure_cookies),
        )]),
        Json(MessageResponse::new("Logged out")),
    )
}

/// Email a password reset link
#[utoipa::path(
    post,
    path = "/password/forgot",
    tag = "Auth",
    request_body = ForgotPassword,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn forgot_password<R: UserRepository>(
    State(state): SharedState<R>,
    ValidatedJson(input): ValidatedJson<ForgotPassword>,
) -> UserResult<Json<MessageResponse>> {
    state
        .service
        .forgot_password(&input.email, &state.settings.reset_base_url)
        .await?;
    Ok(Json(MessageResponse::new(format!(
        "Email sent to {}",
        input.email
    ))))
}

/// Set a new password with a reset token and sign in
#[utoipa::path(
    put,
    path = "/password/reset/{token}",
    tag = "Auth",
    params(
        ("token" = String, Path, description = "Token from the reset email")
    ),
    request_body = ResetPassword,
    responses(
        (status = 200, description = "Password reset", body = AuthResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn reset_password<R: UserRepository>(
    State(state): SharedState<R>,
    Path(token): Path<String>,
    ValidatedJson(input): ValidatedJson<ResetPassword>,
) -> Result<Response, AppError> {
    let user = state.service.reset_password(&token, input).await?;
    start_session(&state, user, StatusCode::OK)
}

/// The signed-in user's profile
#[utoipa::path(
    get,
    path = "/me",
    tag = "Profile",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn me<R: UserRepository>(
    State(state): SharedState<R>,
    claims: JwtClaims,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.service.get_user(claims.user_id()?).await?;
    Ok(Json(user.into()))
}

/// Change the signed-in user's name and email
#[utoipa::path(
    put,
    path = "/me/update",
    tag = "Profile",
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_profile<R: UserRepository>(
    State(state): SharedState<R>,
    claims: JwtClaims,
    ValidatedJson(input): ValidatedJson<UpdateProfile>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.service.update_profile(claims.user_id()?, input).await?;
    Ok(Json(user.into()))
}

/// Replace the signed-in user's avatar
#[utoipa::path(
    put,
    path = "/me/avatar",
    tag = "Profile",
    request_body(content = AvatarUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar replaced", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_avatar<R: UserRepository>(
    State(state): SharedState<R>,
    claims: JwtClaims,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = claims.user_id()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let user = state
            .service
            .set_avatar(user_id, &filename, bytes.to_vec())
            .await?;
        return Ok(Json(user.into()));
    }

    Err(AppError::BadRequest("An avatar image is required".to_string()))
}

/// Change the signed-in user's password
#[utoipa::path(
    put,
    path = "/password/update",
    tag = "Profile",
    request_body = UpdatePassword,
    responses(
        (status = 200, description = "Password changed", body = AuthResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_password<R: UserRepository>(
    State(state): SharedState<R>,
    claims: JwtClaims,
    ValidatedJson(input): ValidatedJson<UpdatePassword>,
) -> Result<Response, AppError> {
    let user = state
        .service
        .update_password(claims.user_id()?, input)
        .await?;
    start_session(&state, user, StatusCode::OK)
}

/// List every user (admin)
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(state): SharedState<R>,
    claims: JwtClaims,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    claims.require_any_role(&[ADMIN])?;
    let users = state.service.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Get a user by ID (admin)
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(state): SharedState<R>,
    claims: JwtClaims,
    UuidPath(id): UuidPath,
) -> Result<Json<UserResponse>, AppError> {
    claims.require_any_role(&[ADMIN])?;
    let user = state.service.get_user(id).await?;
    Ok(Json(user.into()))
}

/// Change a user's name, email and role (admin)
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = AdminUpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(state): SharedState<R>,
    claims: JwtClaims,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<AdminUpdateUser>,
) -> Result<Json<UserResponse>, AppError> {
    claims.require_any_role(&[ADMIN])?;
    let user = state.service.update_user_role(id, input).await?;
    Ok(Json(user.into()))
}

/// Delete a user and their avatar (admin)
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(state): SharedState<R>,
    claims: JwtClaims,
    UuidPath(id): UuidPath,
) -> Result<impl IntoResponse, AppError> {
    claims.require_any_role(&[ADMIN])?;
    state.service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List vendor accounts
#[utoipa::path(
    get,
    path = "/vendors",
    tag = "Profile",
    responses(
        (status = 200, description = "Vendors", body = Vec<UserResponse>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_vendors<R: UserRepository>(
    State(state): SharedState<R>,
) -> UserResult<Json<Vec<UserResponse>>> {
    let vendors = state.service.list_vendors().await?;
    Ok(Json(vendors.into_iter().map(UserResponse::from).collect()))
}
