/// Moderation handlers - post and account removal
///
/// A post can be removed by its author, an account by its owner. Accounts
/// listed in `ADMIN_USER_IDS` may remove anything.
use super::engagement::parse_tweet_id;
use super::with_rate_limit_headers;
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rate_limit::RateLimitPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTweetRequest {
    #[serde(default)]
    pub tweet_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub ok: bool,
}

/// POST /api/admin/delete-tweet
pub async fn delete_tweet(
    user_id: UserId,
    state: web::Data<AppState>,
    req: web::Json<DeleteTweetRequest>,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Write, &user_id.0)?;
    let post_id = parse_tweet_id(&req.tweet_id)?;

    let author = state
        .content
        .post_author(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("post".to_string()))?;
    state.authorize_owner(&user_id.0, &author)?;

    state.content.delete_post(post_id).await?;

    tracing::info!(%post_id, deleted_by = %user_id.0, "Post deleted");

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(DeletedResponse { ok: true }),
        decision,
    ))
}

/// POST /api/admin/delete-user
///
/// Removes the account together with its posts and every like on them.
pub async fn delete_user(
    user_id: UserId,
    state: web::Data<AppState>,
    req: web::Json<DeleteUserRequest>,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Write, &user_id.0)?;

    let target = req.user_id.trim();
    if target.is_empty() {
        return Err(AppError::Validation("Missing userId".to_string()));
    }
    state.authorize_owner(&user_id.0, target)?;

    state.content.delete_user(target).await?;

    tracing::info!(user_id = %target, deleted_by = %user_id.0, "User deleted");

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(DeletedResponse { ok: true }),
        decision,
    ))
}
