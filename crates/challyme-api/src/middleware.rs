use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use challyme_types::api::Claims;

use crate::{AppState, error::ApiError};

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| ApiError::Unauthorized("missing bearer token".into()))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// A request may only act on behalf of the user its token was issued to.
pub fn ensure_actor(claims: &Claims, username: &str) -> Result<(), ApiError> {
    if claims.username == username {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("cannot act on behalf of {}", username)))
    }
}
