use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{FormPage, LoginRequest, PublicUser, RegisterRequest, SessionResponse},
        password::{hash_password, verify_password},
        session::{AuthKeys, MaybeSession, Session},
        validate::{check_email, check_password, check_username},
    },
    error::ApiError,
    state::AppState,
    users::repo::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

#[instrument(skip_all)]
pub async fn register_page(MaybeSession(session): MaybeSession) -> Response {
    if session.is_some() {
        return Redirect::to("/").into_response();
    }
    Json(FormPage { title: "Register" }).into_response()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    if session.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();
    check_username(&payload.username)?;
    check_email(&payload.email)?;
    check_password(&payload.password)?;

    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::validation("username already taken"));
    }
    if User::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::validation("email already registered"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))).into_response())
}

#[instrument(skip_all)]
pub async fn login_page(MaybeSession(session): MaybeSession) -> Response {
    if session.is_some() {
        return Redirect::to("/").into_response();
    }
    Json(FormPage { title: "Login" }).into_response()
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if session.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Credentials);
        }
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Credentials);
    }

    let session = Session::create(&state.db, user.id, state.config.auth.session_ttl_minutes).await?;
    let keys = AuthKeys::from_ref(&state);
    let token = keys.sign_session(user.id, session.id)?;

    info!(user_id = %user.id, session_id = %session.id, "user logged in");
    Ok(Json(SessionResponse {
        token,
        user: PublicUser::from(user),
    })
    .into_response())
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Result<Redirect, ApiError> {
    if let Some(session) = session {
        Session::revoke(&state.db, session.session_id).await?;
        info!(user_id = %session.user_id, session_id = %session.session_id, "session revoked");
    }
    Ok(Redirect::to("/"))
}
