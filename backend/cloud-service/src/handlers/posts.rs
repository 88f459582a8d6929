/// Post handlers - publishing new clouds
use super::with_rate_limit_headers;
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rate_limit::RateLimitPolicy;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Validate)]
struct NewPost {
    #[validate(length(min = 1, max = 280, message = "Content must be between 1 and 280 characters"))]
    content: String,
}

fn parse_parent_id(raw: Option<&str>) -> Result<Option<Uuid>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::Validation("Invalid parent ID".to_string())),
    }
}

/// POST /api/tweets
pub async fn create_post(
    user_id: UserId,
    state: web::Data<AppState>,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Write, &user_id.0)?;

    let new_post = NewPost {
        content: req.content.trim().to_string(),
    };
    new_post.validate()?;
    let parent_id = parse_parent_id(req.parent_id.as_deref())?;
    state.moderate(&new_post.content)?;

    let post = state
        .content
        .create_post(&user_id.0, &new_post.content, parent_id)
        .await?;

    tracing::info!(post_id = %post.id, author_id = %user_id.0, "Post created");

    Ok(with_rate_limit_headers(
        HttpResponse::Created().json(post),
        decision,
    ))
}
