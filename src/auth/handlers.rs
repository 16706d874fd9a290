use anyhow::Context;
use axum::{
    extract::{FromRef, Path, State},
    Json,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, ResetPasswordRequest,
        },
        services::{hash_password, is_valid_email, verify_password, JwtKeys, TokenError, TokenKind},
    },
    error::ApiError,
    state::AppState,
};

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Missing fields"));
    }
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email"));
    }

    // Precheck; the store's unique constraint is the guard under races.
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict);
    }

    let hash = hash_password(&payload.password)?;
    let user = state.users.create(&payload.email, &hash).await?;

    let token = JwtKeys::from_ref(&state).sign_auth(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(AuthResponse {
        user: PublicUser {
            id: user.id,
            email: user.email,
        },
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Missing fields"));
    }
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password answer identically.
    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign_auth(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        user: PublicUser {
            id: user.id,
            email: user.email,
        },
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required"));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "password reset for unknown email");
        return Err(ApiError::NotFound);
    };

    let token = JwtKeys::from_ref(&state).sign_reset(user.id)?;
    let reset_link = format!("{}/reset-password/{}", state.config.frontend_url, token);
    state
        .mailer
        .send(
            &user.email,
            "Password Reset Request",
            &format!(
                "You requested a password reset.\nClick here to reset your password:\n\n{reset_link}"
            ),
        )
        .await
        .context("send password reset email")?;

    info!(user_id = %user.id, "password reset email sent");
    Ok(Json(MessageResponse {
        message: "Password reset email sent".into(),
    }))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required"));
    }

    let claims = match JwtKeys::from_ref(&state).verify(&token) {
        Ok(c) => c,
        Err(TokenError::Expired) => return Err(ApiError::TokenExpired),
        Err(TokenError::Invalid) => return Err(ApiError::TokenInvalid),
    };
    if claims.kind != TokenKind::Reset {
        warn!(user_id = %claims.sub, "password reset with a non-reset token");
        return Err(ApiError::TokenInvalid);
    }

    let hash = hash_password(&payload.password)?;
    state.users.update_password(claims.sub, &hash).await?;

    info!(user_id = %claims.sub, "password reset");
    Ok(Json(MessageResponse {
        message: "Password reset successful".into(),
    }))
}
