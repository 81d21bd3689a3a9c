use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use challyme_db::queries;
use challyme_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::{AppState, blocking, error::ApiError, extract::ApiJson};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const TOKEN_TTL_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_username(&req.username)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let username = req.username.clone();
    let user_id = blocking(&state, move |s| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
            .to_string();

        let user_id = Uuid::new_v4();
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            if queries::user_exists(tx, &req.username)? {
                return Err(ApiError::Conflict("username already taken".into()));
            }
            queries::insert_user(tx, &user_id.to_string(), &req.username, &password_hash)?;
            Ok(user_id)
        })
    })
    .await?;

    let token = create_token(&state.jwt_secret, user_id, &username)?;
    info!("Registered user {}", username);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            username,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = blocking(&state, move |s| {
        let invalid = || ApiError::Unauthorized("invalid username or password".into());

        let user = s.db.get_user_by_username(&req.username)?.ok_or_else(invalid)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid())?;

        Ok(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}'", user.id)))?;
    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        username: user.username,
        token,
    }))
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(ApiError::Validation(format!(
            "username must be {}-{} characters",
            MIN_USERNAME_LEN, MAX_USERNAME_LEN
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(ApiError::Validation(
            "username may only contain letters, digits, '_' and '-'".into(),
        ));
    }
    Ok(())
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}
