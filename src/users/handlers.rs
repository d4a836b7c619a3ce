use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::path::Path as FsPath;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::FormPage,
        password::hash_password,
        session::{AuthKeys, AuthSession, MaybeSession},
        validate::{check_email, check_password, check_username},
    },
    error::ApiError,
    images,
    state::AppState,
    users::{
        dto::{ProfileResponse, ResetPasswordBody, ResetRequestBody},
        repo::User,
        reset::{consume_reset_token, issue_reset_token, verify_reset_token},
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/account", get(account_page).post(account_update))
        .route(
            "/reset_password",
            get(reset_request_page).post(reset_request),
        )
        .route(
            "/reset_password/:token",
            get(reset_form_page).post(reset_submit),
        )
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}

#[instrument(skip(state))]
pub async fn account_page(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, session.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(ProfileResponse::from(user)))
}

#[instrument(skip(state, multipart))]
pub async fn account_update(
    State(state): State<AppState>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut username = None;
    let mut email = None;
    let mut picture = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("username") => {
                username = Some(field.text().await.map_err(malformed)?.trim().to_string());
            }
            Some("email") => {
                email = Some(
                    field
                        .text()
                        .await
                        .map_err(malformed)?
                        .trim()
                        .to_lowercase(),
                );
            }
            Some("picture") => {
                let data = field.bytes().await.map_err(malformed)?;
                if !data.is_empty() {
                    picture = Some(data);
                }
            }
            _ => {}
        }
    }

    let username = username.ok_or_else(|| ApiError::validation("username is required"))?;
    let email = email.ok_or_else(|| ApiError::validation("email is required"))?;
    check_username(&username)?;
    check_email(&email)?;

    // Uniqueness re-checked excluding the caller's own record.
    if let Some(other) = User::find_by_username(&state.db, &username).await? {
        if other.id != session.user_id {
            return Err(ApiError::validation("username already taken"));
        }
    }
    if let Some(other) = User::find_by_email(&state.db, &email).await? {
        if other.id != session.user_id {
            return Err(ApiError::validation("email already registered"));
        }
    }

    let image_file = match picture {
        Some(data) => Some(images::ingest(
            &data,
            FsPath::new(&state.config.uploads.profile_dir),
        )?),
        None => None,
    };

    let user = User::update_profile(
        &state.db,
        session.user_id,
        &username,
        &email,
        image_file.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, "account updated");
    Ok(Json(ProfileResponse::from(user)))
}

#[instrument(skip_all)]
pub async fn reset_request_page(MaybeSession(session): MaybeSession) -> Response {
    if session.is_some() {
        return Redirect::to("/").into_response();
    }
    Json(FormPage {
        title: "Reset Password",
    })
    .into_response()
}

#[instrument(skip(state, payload))]
pub async fn reset_request(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(mut payload): Json<ResetRequestBody>,
) -> Result<Response, ApiError> {
    if session.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    payload.email = payload.email.trim().to_lowercase();
    check_email(&payload.email)?;

    // The acknowledgment is identical whether or not the address has an
    // account, but a transport failure for a real address must be visible.
    if let Some(user) = User::find_by_email(&state.db, &payload.email).await? {
        let keys = AuthKeys::from_ref(&state);
        let token = issue_reset_token(&state.db, &keys, &user).await?;
        let reset_url = format!("{}/reset_password/{}", state.config.mail.base_url, token);
        state
            .mailer
            .send_password_reset(&user.email, &user.username, &reset_url)
            .await?;
        info!(user_id = %user.id, "reset email sent");
    } else {
        warn!(email = %payload.email, "reset requested for unknown email");
    }

    Ok(Json(json!({
        "message": "If that address has an account, a reset link has been emailed."
    }))
    .into_response())
}

#[instrument(skip(state, token))]
pub async fn reset_form_page(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    if session.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let keys = AuthKeys::from_ref(&state);
    if verify_reset_token(&state.db, &keys, &token).await.is_none() {
        return Err(ApiError::InvalidResetToken);
    }
    Ok(Json(FormPage {
        title: "Reset Password",
    })
    .into_response())
}

#[instrument(skip(state, token, payload))]
pub async fn reset_submit(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordBody>,
) -> Result<Response, ApiError> {
    if session.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    check_password(&payload.password)?;

    // Consume only after the replacement password is known to be acceptable,
    // so a validation slip does not burn the single use.
    let keys = AuthKeys::from_ref(&state);
    let user = consume_reset_token(&state.db, &keys, &token)
        .await
        .ok_or(ApiError::InvalidResetToken)?;

    let hash = hash_password(&payload.password)?;
    User::set_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset");
    Ok(Redirect::to("/login").into_response())
}

fn malformed(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::validation(format!("malformed multipart field: {e}"))
}
