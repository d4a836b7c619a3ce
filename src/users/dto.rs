use serde::{Deserialize, Serialize};

use crate::users::repo::User;

/// Current profile values, as shown on the account form.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub image_file: String,
}

impl From<User> for ProfileResponse {
    fn from(u: User) -> Self {
        Self {
            username: u.username,
            email: u.email,
            image_file: u.image_file,
        }
    }
}

/// Request body asking for a reset email.
#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    pub email: String,
}

/// Request body carrying the replacement password.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub password: String,
}
