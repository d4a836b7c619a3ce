//! End-to-end repository flow against a real PostgreSQL instance.
//!
//! Set TEST_DATABASE_URL to run; without it the test is a no-op so the
//! suite stays green on machines without a database.

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use forkful::auth::password::{hash_password, verify_password};
use forkful::auth::session::AuthKeys;
use forkful::auth::can_mutate;
use forkful::config::{AppConfig, AuthConfig, MailConfig, UploadConfig};
use forkful::mail::{Mailer, RecordingMailer};
use forkful::posts::repo::{Post, PostFields};
use forkful::state::AppState;
use forkful::users::repo::User;
use forkful::users::reset::{consume_reset_token, issue_reset_token, verify_reset_token};

fn test_config(database_url: String) -> AppConfig {
    AppConfig {
        database_url,
        auth: AuthConfig {
            secret: "integration-secret".into(),
            issuer: "forkful".into(),
            audience: "forkful-web".into(),
            session_ttl_minutes: 5,
            reset_ttl_minutes: 30,
        },
        uploads: UploadConfig {
            profile_dir: "static/profile_pics".into(),
            post_dir: "static/post_img".into(),
        },
        mail: MailConfig {
            smtp_host: "localhost".into(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: "noreply@forkful.dev".into(),
            base_url: "http://localhost:8080".into(),
        },
    }
}

async fn cleanup(pool: &PgPool, user_ids: &[Uuid]) {
    for id in user_ids {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .expect("cleanup");
    }
}

#[tokio::test]
async fn registration_ownership_and_reset_against_postgres() {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

    let suffix = Uuid::new_v4().simple().to_string();
    let alice_name = format!("al-{}", &suffix[..8]);
    let bob_name = format!("bo-{}", &suffix[..8]);
    let alice_email = format!("{alice_name}@example.com");
    let bob_email = format!("{bob_name}@example.com");

    // Registration stores a hash, never the plaintext.
    let password = "pw1-secret-enough";
    let hash = hash_password(password).expect("hash");
    assert_ne!(hash, password);
    let alice = User::create(&pool, &alice_name, &alice_email, &hash)
        .await
        .expect("create alice");
    assert!(verify_password(password, &alice.password_hash).expect("verify"));
    assert!(!verify_password("pw1-secret-enougH", &alice.password_hash).expect("verify"));

    // Duplicate username is refused by the store.
    let dup = User::create(&pool, &alice_name, &bob_email, &hash).await;
    assert!(dup.is_err(), "duplicate username must be rejected");

    let bob = User::create(&pool, &bob_name, &bob_email, &hash)
        .await
        .expect("create bob");

    // Alice posts a recipe; it shows up newest-first on the feed.
    let fields = PostFields {
        title: "Soup".into(),
        ingredients: "water,salt".into(),
        steps: "boil".into(),
        time_minutes: Some(10),
        serves: Some(2),
        calories: None,
    };
    let post = Post::create(&pool, alice.id, &fields, None)
        .await
        .expect("create post");

    let (items, _) = Post::list_page(&pool, 1, 6).await.expect("list");
    assert!(items.len() <= 6);
    assert!(items.iter().any(|p| p.id == post.id));

    // Bob holds no capability over Alice's post; the handler boundary would
    // answer Forbidden and the row stays put.
    assert!(!can_mutate(bob.id, post.user_id));
    assert!(can_mutate(alice.id, post.user_id));
    assert!(Post::get(&pool, post.id).await.expect("get").is_some());

    // Reset tokens round-trip, and a consumed token is spent for good.
    let state = AppState::from_parts(
        pool.clone(),
        Arc::new(test_config(url.clone())),
        Arc::new(RecordingMailer::default()) as Arc<dyn Mailer>,
    );
    let keys = AuthKeys::from_ref(&state);

    let token = issue_reset_token(&pool, &keys, &alice).await.expect("issue");
    let resolved = verify_reset_token(&pool, &keys, &token).await;
    assert_eq!(resolved.map(|u| u.id), Some(alice.id));

    let consumed = consume_reset_token(&pool, &keys, &token).await;
    assert_eq!(consumed.map(|u| u.id), Some(alice.id));
    assert!(
        consume_reset_token(&pool, &keys, &token).await.is_none(),
        "a reset token grants exactly one use"
    );
    assert!(verify_reset_token(&pool, &keys, &token).await.is_none());

    // Tampered tokens fail closed.
    let mut tampered = token.clone();
    tampered.push('x');
    assert!(verify_reset_token(&pool, &keys, &tampered).await.is_none());

    // Owner delete is immediate.
    Post::delete(&pool, post.id).await.expect("delete");
    assert!(Post::get(&pool, post.id).await.expect("get").is_none());

    cleanup(&pool, &[alice.id, bob.id]).await;
}
