use crate::{
    api::current_session,
    auth::{auth::AuthUser, jwt::generate_access_token},
    backend::SignUpMetadata,
    config::Config,
    coordinator::Coordinator,
    error::{ApiError, BackendError},
    model::user::UserProfile,
    models::{LoginReqDto, LoginResponse, SignUpReqDto},
};
use actix_web::{HttpResponse, Responder, get, web};
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

/// Sign in with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = Object, example = json!({
            "message": "Username and password are required"
        })),
        (status = 401, description = "Rejected by the backend", body = Object, example = json!({
            "message": "Invalid login credentials"
        })),
        (status = 403, description = "Account has no profile")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(coordinator, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    coordinator: web::Data<Coordinator>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let email = config.email_for(&user.username);
    debug!(%email, "Signing in at backend");

    let auth = coordinator
        .backend()
        .sign_in(&email, &user.password)
        .await
        .map_err(|e| {
            info!(error = %e, "Sign-in rejected");
            match e {
                BackendError::Unauthorized(message) => ApiError::Unauthorized(message),
                other => other.into(),
            }
        })?;

    let profile: UserProfile = coordinator
        .backend()
        .fetch_profile(&auth.access_token, auth.user_id)
        .await?
        .ok_or_else(|| {
            info!(user_id = %auth.user_id, "Signed in without a profile");
            ApiError::Forbidden("No profile found for this account".to_string())
        })?;

    let session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::seconds(config.access_token_ttl);

    let access_token = generate_access_token(&profile, &session_id, expires_at, &config.jwt_secret)
        .map_err(|e| {
            error!(error = %e, "Failed to sign session token");
            ApiError::Internal
        })?;

    let session = coordinator
        .open_session(session_id, profile, auth.access_token, expires_at)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to load workspace");
            ApiError::from(e)
        })?;

    info!(session = %session.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl,
        profile: session.profile.clone(),
    }))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignUpReqDto,
    responses(
        (status = 201, description = "Account created", body = Object, example = json!({
            "message": "Registration successful! Please login with your credentials."
        })),
        (status = 400, description = "Invalid form or rejected by the backend", body = Object, example = json!({
            "message": "Please select a department"
        }))
    ),
    tag = "Auth"
)]
pub async fn signup(
    form: web::Json<SignUpReqDto>,
    coordinator: web::Data<Coordinator>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let form = form.into_inner();
    let username = form.username.trim();

    if username.is_empty() || form.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Username and full name are required".to_string(),
        ));
    }
    if form.department.trim().is_empty() {
        return Err(ApiError::BadRequest("Please select a department".to_string()));
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let metadata = SignUpMetadata {
        username: username.to_string(),
        full_name: form.full_name.trim().to_string(),
        role: form.role,
        department: form.department,
    };

    coordinator
        .backend()
        .sign_up(&config.email_for(username), &form.password, &metadata)
        .await
        .inspect_err(|e| info!(error = %e, username, "Sign-up rejected"))?;

    info!(username, role = %metadata.role, "Account registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "Registration successful! Please login with your credentials."
    })))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn logout(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
) -> impl Responder {
    // the local session is gone either way
    if let Err(e) = coordinator.close_session(&auth.session_id).await {
        error!(error = %e, session = %auth.session_id, "Backend sign-out failed");
    }
    HttpResponse::NoContent().finish()
}

/// Profile of the signed-in user
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current profile", body = UserProfile),
        (status = 401, description = "Session expired")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
#[get("/me")]
pub async fn me(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    Ok(HttpResponse::Ok().json(&session.profile))
}
