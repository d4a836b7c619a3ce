use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::posts::repo::{Post, PostFields, PostSummary};

/// Page selector for listings. 1-indexed, defaulting to the first page.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// One page of the home (or author) feed.
#[derive(Debug, Serialize)]
pub struct PostList {
    pub items: Vec<PostSummary>,
    pub page: i64,
    pub has_more: bool,
}

/// Author header for the per-user listing.
#[derive(Debug, Serialize)]
pub struct AuthorInfo {
    pub username: String,
    pub image_file: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorPosts {
    pub user: AuthorInfo,
    pub items: Vec<PostSummary>,
    pub page: i64,
    pub has_more: bool,
}

/// Structured body shared by the create and update paths — the canonical
/// field set, one spelling everywhere.
#[derive(Debug, Deserialize)]
pub struct PostBody {
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub time_minutes: Option<i32>,
    pub serves: Option<i32>,
    pub calories: Option<i32>,
}

impl PostBody {
    /// Validation shared by both write paths.
    pub fn into_fields(self) -> Result<PostFields, ApiError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::validation("title is required"));
        }
        if title.chars().count() > 100 {
            return Err(ApiError::validation("title must be at most 100 characters"));
        }
        if self.ingredients.trim().is_empty() {
            return Err(ApiError::validation("ingredients are required"));
        }
        if self.steps.trim().is_empty() {
            return Err(ApiError::validation("steps are required"));
        }
        for (name, value) in [
            ("time_minutes", self.time_minutes),
            ("serves", self.serves),
            ("calories", self.calories),
        ] {
            if let Some(v) = value {
                if v < 0 {
                    return Err(ApiError::validation(format!("{name} must not be negative")));
                }
            }
        }
        Ok(PostFields {
            title,
            ingredients: self.ingredients,
            steps: self.steps,
            time_minutes: self.time_minutes,
            serves: self.serves,
            calories: self.calories,
        })
    }
}

/// Current field values, as handed to the edit form.
#[derive(Debug, Serialize)]
pub struct EditPost {
    pub id: Uuid,
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub time_minutes: Option<i32>,
    pub serves: Option<i32>,
    pub calories: Option<i32>,
    pub image: Option<String>,
}

impl From<Post> for EditPost {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            ingredients: p.ingredients,
            steps: p.steps,
            time_minutes: p.time_minutes,
            serves: p.serves,
            calories: p.calories,
            image: p.image,
        }
    }
}

/// Acknowledgment for a structured update.
#[derive(Debug, Serialize)]
pub struct UpdateAck {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> PostBody {
        PostBody {
            title: "Soup".into(),
            ingredients: "water,salt".into(),
            steps: "boil".into(),
            time_minutes: Some(10),
            serves: Some(2),
            calories: None,
        }
    }

    #[test]
    fn canonical_fields_pass() {
        let fields = body().into_fields().expect("valid");
        assert_eq!(fields.title, "Soup");
        assert_eq!(fields.time_minutes, Some(10));
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut b = body();
        b.title = "   ".into();
        assert!(b.into_fields().is_err());
    }

    #[test]
    fn missing_steps_are_rejected() {
        let mut b = body();
        b.steps = String::new();
        assert!(b.into_fields().is_err());
    }

    #[test]
    fn negative_numbers_are_rejected() {
        let mut b = body();
        b.serves = Some(-1);
        assert!(b.into_fields().is_err());
    }

    #[test]
    fn update_ack_shape() {
        let json = serde_json::to_string(&UpdateAck { success: true }).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }
}
