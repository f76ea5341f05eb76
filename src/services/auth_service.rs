use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    config::jwt_secret,
    dto::auth::{AuthResponse, Claims, LoginRequest, RegisterRequest, UserProfile},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    state::AppState,
};

const MIN_PASSWORD_CHARS: usize = 6;
const TOKEN_LIFETIME_DAYS: i64 = 7;

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let RegisterRequest {
        name,
        email,
        password,
    } = payload;

    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("All fields are required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    let bootstrap_email = state.config.bootstrap_admin_email.clone();

    // The duplicate check runs inside the update so a racing registration
    // with the same email cannot slip past it.
    let user = state
        .store
        .users
        .update(move |users| {
            if users
                .iter()
                .any(|u| u.email.eq_ignore_ascii_case(&email))
            {
                return Err(AppError::BadRequest("Email is already taken".into()));
            }

            let is_admin = users.is_empty()
                || bootstrap_email
                    .as_deref()
                    .is_some_and(|admin| email.eq_ignore_ascii_case(admin));

            let user = User {
                id: Uuid::new_v4(),
                name,
                email,
                password_hash,
                is_admin,
                created_at: Utc::now(),
            };
            users.push(user.clone());
            Ok(user)
        })
        .await?;

    let token = issue_token(&user)?;
    tracing::info!(user_id = %user.id, is_admin = user.is_admin, "user registered");

    Ok(ApiResponse::success(
        "User created",
        AuthResponse {
            token,
            user: UserProfile::from(&user),
        },
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let LoginRequest { email, password } = payload;

    let user = state
        .store
        .users
        .all()
        .await
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(&email))
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let token = issue_token(&user)?;

    Ok(ApiResponse::success(
        "Logged in",
        AuthResponse {
            token,
            user: UserProfile::from(&user),
        },
    ))
}

pub async fn current_user(
    state: &AppState,
    auth: &AuthUser,
) -> AppResult<ApiResponse<UserProfile>> {
    let user = state
        .store
        .users
        .all()
        .await
        .into_iter()
        .find(|u| u.id == auth.user_id)
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("OK", UserProfile::from(&user)))
}

fn issue_token(user: &User) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(TOKEN_LIFETIME_DAYS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        is_admin: user.is_admin,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}
