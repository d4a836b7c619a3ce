use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Post record in the database. One owning user; mutated and deleted only
/// by that owner (enforced at the handler boundary).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub time_minutes: Option<i32>,
    pub serves: Option<i32>,
    pub calories: Option<i32>,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Listing projection with the author's username joined in.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub author: String,
}

/// Detail projection: the full post plus its author's username.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub time_minutes: Option<i32>,
    pub serves: Option<i32>,
    pub calories: Option<i32>,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub author: String,
}

/// Canonical mutable field set, shared by the create and update paths.
#[derive(Debug, Clone)]
pub struct PostFields {
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub time_minutes: Option<i32>,
    pub serves: Option<i32>,
    pub calories: Option<i32>,
}

/// 1-indexed page number to a row offset. Pages below 1 clamp to the first
/// page; pages past the end simply select no rows.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1) * per_page
}

/// Split a `per_page + 1` over-fetch into the page and a has-more flag.
pub fn split_has_more<T>(mut rows: Vec<T>, per_page: usize) -> (Vec<T>, bool) {
    let has_more = rows.len() > per_page;
    rows.truncate(per_page);
    (rows, has_more)
}

impl Post {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        fields: &PostFields,
        image: Option<&str>,
    ) -> anyhow::Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, title, ingredients, steps, time_minutes, serves, calories, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, title, ingredients, steps, time_minutes, serves, calories, image, created_at
            "#,
        )
        .bind(user_id)
        .bind(&fields.title)
        .bind(&fields.ingredients)
        .bind(&fields.steps)
        .bind(fields.time_minutes)
        .bind(fields.serves)
        .bind(fields.calories)
        .bind(image)
        .fetch_one(db)
        .await?;
        Ok(post)
    }

    pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, title, ingredients, steps, time_minutes, serves, calories, image, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(post)
    }

    pub async fn get_with_author(db: &PgPool, id: Uuid) -> anyhow::Result<Option<PostWithAuthor>> {
        let post = sqlx::query_as::<_, PostWithAuthor>(
            r#"
            SELECT p.id, p.user_id, p.title, p.ingredients, p.steps, p.time_minutes,
                   p.serves, p.calories, p.image, p.created_at, u.username AS author
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(post)
    }

    /// Newest first. Fetches one row past the page to learn whether more
    /// pages follow; out-of-range pages come back empty rather than erroring.
    pub async fn list_page(
        db: &PgPool,
        page: i64,
        per_page: i64,
    ) -> anyhow::Result<(Vec<PostSummary>, bool)> {
        let rows = sqlx::query_as::<_, PostSummary>(
            r#"
            SELECT p.id, p.title, p.image, p.created_at, u.username AS author
            FROM posts p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page + 1)
        .bind(page_offset(page, per_page))
        .fetch_all(db)
        .await?;
        Ok(split_has_more(rows, per_page as usize))
    }

    pub async fn list_by_author(
        db: &PgPool,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> anyhow::Result<(Vec<PostSummary>, bool)> {
        let rows = sqlx::query_as::<_, PostSummary>(
            r#"
            SELECT p.id, p.title, p.image, p.created_at, u.username AS author
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.user_id = $1
            ORDER BY p.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(per_page + 1)
        .bind(page_offset(page, per_page))
        .fetch_all(db)
        .await?;
        Ok(split_has_more(rows, per_page as usize))
    }

    /// Replace the canonical field set in one statement.
    pub async fn update(db: &PgPool, id: Uuid, fields: &PostFields) -> anyhow::Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = $2, ingredients = $3, steps = $4,
                time_minutes = $5, serves = $6, calories = $7
            WHERE id = $1
            RETURNING id, user_id, title, ingredients, steps, time_minutes, serves, calories, image, created_at
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.ingredients)
        .bind(&fields.steps)
        .bind(fields.time_minutes)
        .bind(fields.serves)
        .bind(fields.calories)
        .fetch_one(db)
        .await?;
        Ok(post)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM posts WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_one_indexed() {
        assert_eq!(page_offset(1, 6), 0);
        assert_eq!(page_offset(2, 6), 6);
        assert_eq!(page_offset(3, 5), 10);
    }

    #[test]
    fn pages_below_one_clamp_to_the_first() {
        assert_eq!(page_offset(0, 6), 0);
        assert_eq!(page_offset(-3, 6), 0);
    }

    #[test]
    fn over_fetch_detects_following_pages() {
        let (page, has_more) = split_has_more(vec![1, 2, 3, 4, 5, 6, 7], 6);
        assert_eq!(page, vec![1, 2, 3, 4, 5, 6]);
        assert!(has_more);
    }

    #[test]
    fn exact_page_has_no_more() {
        let (page, has_more) = split_has_more(vec![1, 2, 3], 6);
        assert_eq!(page.len(), 3);
        assert!(!has_more);
    }

    #[test]
    fn empty_store_yields_an_empty_page() {
        let (page, has_more) = split_has_more(Vec::<i32>::new(), 6);
        assert!(page.is_empty());
        assert!(!has_more);
    }
}
