use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use std::path::Path as FsPath;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{can_mutate, dto::FormPage, session::AuthSession},
    error::ApiError,
    images,
    posts::{
        dto::{AuthorInfo, AuthorPosts, EditPost, PageQuery, PostBody, PostList, UpdateAck},
        repo::Post,
    },
    state::AppState,
    users::repo::User,
};

const HOME_PAGE_SIZE: i64 = 6;
const AUTHOR_PAGE_SIZE: i64 = 5;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/home", get(home))
        .route("/post/new", get(new_post_page).post(create_post))
        .route("/post/:id", get(post_detail))
        .route(
            "/post/:id/update",
            get(edit_post).post(apply_update).put(apply_update),
        )
        .route("/post/:id/delete", post(delete_post))
        .route("/user/:username", get(posts_by_author))
        .route("/about", get(about))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}

#[instrument]
pub async fn about() -> Json<FormPage> {
    Json(FormPage { title: "About" })
}

#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<PostList>, ApiError> {
    let (items, has_more) = Post::list_page(&state.db, q.page, HOME_PAGE_SIZE).await?;
    Ok(Json(PostList {
        items,
        page: q.page.max(1),
        has_more,
    }))
}

#[instrument(skip_all)]
pub async fn new_post_page(_session: AuthSession) -> Json<FormPage> {
    Json(FormPage { title: "New Post" })
}

#[instrument(skip(state, multipart))]
pub async fn create_post(
    State(state): State<AppState>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut title = String::new();
    let mut ingredients = String::new();
    let mut steps = String::new();
    let mut time_minutes = None;
    let mut serves = None;
    let mut calories = None;
    let mut picture = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => title = field.text().await.map_err(malformed)?,
            Some("ingredients") => ingredients = field.text().await.map_err(malformed)?,
            Some("steps") => steps = field.text().await.map_err(malformed)?,
            Some("time_minutes") => {
                time_minutes = parse_opt_i32("time_minutes", &field.text().await.map_err(malformed)?)?
            }
            Some("serves") => {
                serves = parse_opt_i32("serves", &field.text().await.map_err(malformed)?)?
            }
            Some("calories") => {
                calories = parse_opt_i32("calories", &field.text().await.map_err(malformed)?)?
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

    let fields = PostBody {
        title,
        ingredients,
        steps,
        time_minutes,
        serves,
        calories,
    }
    .into_fields()?;

    // Ingest before the insert: a post row must never reference a file that
    // was not written.
    let image = match picture {
        Some(data) => Some(images::ingest(
            &data,
            FsPath::new(&state.config.uploads.post_dir),
        )?),
        None => None,
    };

    let post = Post::create(&state.db, session.user_id, &fields, image.as_deref()).await?;
    info!(post_id = %post.id, user_id = %session.user_id, "post created");

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/post/{}", post.id)
            .parse()
            .expect("valid header value"),
    );
    Ok((StatusCode::CREATED, headers, Json(post)).into_response())
}

#[instrument(skip(state))]
pub async fn post_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let post = Post::get_with_author(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post).into_response())
}

#[instrument(skip(state))]
pub async fn edit_post(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<EditPost>, ApiError> {
    let post = Post::get(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    if !can_mutate(session.user_id, post.user_id) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(EditPost::from(post)))
}

#[instrument(skip(state, payload))]
pub async fn apply_update(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostBody>,
) -> Result<Json<UpdateAck>, ApiError> {
    let post = Post::get(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    if !can_mutate(session.user_id, post.user_id) {
        return Err(ApiError::Forbidden);
    }

    let fields = payload.into_fields()?;
    Post::update(&state.db, post.id, &fields).await?;

    info!(post_id = %post.id, user_id = %session.user_id, "post updated");
    Ok(Json(UpdateAck { success: true }))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let post = Post::get(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    if !can_mutate(session.user_id, post.user_id) {
        return Err(ApiError::Forbidden);
    }

    Post::delete(&state.db, post.id).await?;
    info!(post_id = %post.id, user_id = %session.user_id, "post deleted");
    Ok(Redirect::to("/"))
}

#[instrument(skip(state))]
pub async fn posts_by_author(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(q): Query<PageQuery>,
) -> Result<Json<AuthorPosts>, ApiError> {
    let user = User::find_by_username(&state.db, &username)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let (items, has_more) =
        Post::list_by_author(&state.db, user.id, q.page, AUTHOR_PAGE_SIZE).await?;
    Ok(Json(AuthorPosts {
        user: AuthorInfo {
            username: user.username,
            image_file: user.image_file,
        },
        items,
        page: q.page.max(1),
        has_more,
    }))
}

fn parse_opt_i32(name: &str, raw: &str) -> Result<Option<i32>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i32>()
        .map(Some)
        .map_err(|_| ApiError::validation(format!("{name} must be a whole number")))
}

fn malformed(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::validation(format!("malformed multipart field: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_numbers_parse_or_reject() {
        assert_eq!(parse_opt_i32("serves", "").unwrap(), None);
        assert_eq!(parse_opt_i32("serves", "  4 ").unwrap(), Some(4));
        assert!(parse_opt_i32("serves", "four").is_err());
    }
}
