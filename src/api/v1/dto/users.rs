/*
 * Responsibility
 * - Users request/response DTOs
 * - validate() collects per-field messages for the Validation error details
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationDetails;
use crate::repos::user_repo::User;

const MAX_IMAGE_URL_LEN: usize = 256;

fn push_error(details: &mut ValidationDetails, field: &str, message: &str) {
    details
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub user_name: String,
    pub email: String,
    pub image_url: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationDetails> {
        let mut details = ValidationDetails::new();

        if self.user_name.trim().is_empty() {
            push_error(&mut details, "user_name", "user_name is required");
        }
        if !self.email.contains('@') {
            push_error(&mut details, "email", "email must contain '@'");
        }
        if let Some(url) = &self.image_url
            && url.len() > MAX_IMAGE_URL_LEN
        {
            push_error(&mut details, "image_url", "image_url must be <= 256 chars");
        }

        if details.is_empty() { Ok(()) } else { Err(details) }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub user_name: Option<String>,
    pub email: Option<String>,
    // Tri-state:
    // - None: field missing (do not update)
    // - Some(None): null (clear)
    // - Some(Some(v)): set value
    pub image_url: Option<Option<String>>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none() && self.email.is_none() && self.image_url.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationDetails> {
        let mut details = ValidationDetails::new();

        if let Some(name) = &self.user_name
            && name.trim().is_empty()
        {
            push_error(&mut details, "user_name", "user_name cannot be empty");
        }
        if let Some(email) = &self.email
            && !email.contains('@')
        {
            push_error(&mut details, "email", "email must contain '@'");
        }
        if let Some(Some(url)) = &self.image_url
            && url.len() > MAX_IMAGE_URL_LEN
        {
            push_error(&mut details, "image_url", "image_url must be <= 256 chars");
        }

        if details.is_empty() { Ok(()) } else { Err(details) }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            user_name: u.user_name,
            email: u.email,
            image_url: u.image_url,
            created_at: u.created_at,
        }
    }
}
