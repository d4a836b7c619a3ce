use sqlx::PgPool;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::session::AuthKeys;
use crate::users::repo::User;

/// Issue a password-reset token for `user`: a `password_resets` row plus a
/// signed token whose `jti` names that row. The row is what makes the token
/// single-use; the signature and `exp` claim bound its lifetime.
pub async fn issue_reset_token(db: &PgPool, keys: &AuthKeys, user: &User) -> anyhow::Result<String> {
    let reset_id = Uuid::new_v4();
    let expires_at = OffsetDateTime::now_utc()
        + TimeDuration::seconds(keys.reset_ttl.as_secs() as i64);

    sqlx::query(
        r#"
        INSERT INTO password_resets (id, user_id, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(reset_id)
    .bind(user.id)
    .bind(expires_at)
    .execute(db)
    .await?;

    let token = keys.sign_reset(user.id, reset_id)?;
    debug!(user_id = %user.id, reset_id = %reset_id, "reset token issued");
    Ok(token)
}

/// Resolve a reset token to its user without consuming it. Fails closed:
/// signature mismatch, wrong token kind, expiry, an unknown row, or prior
/// use all yield `None` and never an error.
pub async fn verify_reset_token(db: &PgPool, keys: &AuthKeys, token: &str) -> Option<User> {
    let claims = keys.verify_reset(token).ok()?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT user_id FROM password_resets
        WHERE id = $1 AND used_at IS NULL AND expires_at > now()
        "#,
    )
    .bind(claims.jti)
    .fetch_optional(db)
    .await
    .ok()?;

    let (user_id,) = row?;
    User::find_by_id(db, user_id).await.ok()?
}

/// Resolve a reset token and mark it used in the same statement, so a token
/// grants exactly one password change even under concurrent submissions.
pub async fn consume_reset_token(db: &PgPool, keys: &AuthKeys, token: &str) -> Option<User> {
    let claims = keys.verify_reset(token).ok()?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE password_resets
        SET used_at = now()
        WHERE id = $1 AND used_at IS NULL AND expires_at > now()
        RETURNING user_id
        "#,
    )
    .bind(claims.jti)
    .fetch_optional(db)
    .await
    .ok()?;

    let Some((user_id,)) = row else {
        warn!(reset_id = %claims.jti, "reset token already used or expired");
        return None;
    };
    User::find_by_id(db, user_id).await.ok()?
}
