/// Engagement handlers - likes, retweets and replies
use super::with_rate_limit_headers;
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rate_limit::RateLimitPolicy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetIdRequest {
    #[serde(default)]
    pub tweet_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    #[serde(default)]
    pub tweet_id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Validate)]
struct NewReply {
    #[validate(length(min = 1, max = 280, message = "Comment must be between 1 and 280 characters"))]
    content: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

#[derive(Debug, Serialize)]
pub struct RetweetResponse {
    pub retweeted: bool,
    pub retweets: i64,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub replies: i64,
}

pub(crate) fn parse_tweet_id(raw: &str) -> Result<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation("Missing tweetId".to_string()));
    }
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid tweet ID".to_string()))
}

/// POST /api/likes
pub async fn toggle_like(
    user_id: UserId,
    state: web::Data<AppState>,
    req: web::Json<TweetIdRequest>,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Write, &user_id.0)?;
    let post_id = parse_tweet_id(&req.tweet_id)?;

    let outcome = state.content.toggle_like(&user_id.0, post_id).await?;

    tracing::debug!(%post_id, liked = outcome.active, "Like toggled");

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(LikeResponse {
            liked: outcome.active,
            likes: outcome.count,
        }),
        decision,
    ))
}

/// POST /api/retweets
pub async fn toggle_retweet(
    user_id: UserId,
    state: web::Data<AppState>,
    req: web::Json<TweetIdRequest>,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Write, &user_id.0)?;
    let post_id = parse_tweet_id(&req.tweet_id)?;

    let outcome = state.content.toggle_retweet(&user_id.0, post_id).await?;

    tracing::debug!(%post_id, retweeted = outcome.active, "Retweet toggled");

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(RetweetResponse {
            retweeted: outcome.active,
            retweets: outcome.count,
        }),
        decision,
    ))
}

/// POST /api/replies
pub async fn add_reply(
    user_id: UserId,
    state: web::Data<AppState>,
    req: web::Json<CreateReplyRequest>,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Write, &user_id.0)?;
    let post_id = parse_tweet_id(&req.tweet_id)?;

    let reply = NewReply {
        content: req.content.trim().to_string(),
    };
    reply.validate()?;
    state.moderate(&reply.content)?;

    let replies = state
        .content
        .add_reply(&user_id.0, post_id, &reply.content)
        .await?;

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(ReplyResponse { replies }),
        decision,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tweet_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_tweet_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_tweet_id(""), Err(AppError::Validation(m)) if m == "Missing tweetId"));
        assert!(matches!(parse_tweet_id("abc"), Err(AppError::Validation(m)) if m == "Invalid tweet ID"));
    }

    #[test]
    fn test_reply_length_rules() {
        assert!(NewReply { content: String::new() }.validate().is_err());
        assert!(NewReply { content: "ok".into() }.validate().is_ok());
        assert!(NewReply { content: "x".repeat(281) }.validate().is_err());
    }
}
