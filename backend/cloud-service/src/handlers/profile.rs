/// Profile handlers - the viewer's own profile and posts
use super::with_rate_limit_headers;
use crate::error::{AppError, Result};
use crate::middleware::{requester_key, UserId};
use crate::models::{ProfilePost, ProfileUpdate, UserProfile};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use rate_limit::RateLimitPolicy;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Validate)]
struct ProfileInput {
    #[validate(length(min = 2, max = 50, message = "Display name must be between 2 and 50 characters"))]
    name: Option<String>,
    #[validate(length(max = 160, message = "Bio must be at most 160 characters"))]
    bio: Option<String>,
    #[validate(length(max = 2048, message = "Image URL is too long"))]
    image: Option<String>,
}

/// Most posts listed on the profile page
pub const PROFILE_POST_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub ok: bool,
    pub profile: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct ProfilePageResponse {
    pub profile: UserProfile,
    pub posts: Vec<ProfilePost>,
}

/// Normalise the request into an update.
///
/// Blank `name`/`imageUrl` count as absent; `bio` may be cleared with an
/// empty string.
fn to_update(req: &UpdateProfileRequest) -> Result<ProfileUpdate> {
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let input = ProfileInput {
        name: non_blank(&req.name),
        bio: req.bio.as_deref().map(|b| b.trim().to_string()),
        image: non_blank(&req.image_url),
    };

    if input.name.is_none() && input.bio.is_none() && input.image.is_none() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    input.validate()?;

    Ok(ProfileUpdate {
        name: input.name,
        bio: input.bio,
        image: input.image,
    })
}

/// GET /api/profile
///
/// 404 until the viewer has a `users` row (created on first post, reaction
/// or profile update).
pub async fn get_profile(
    user_id: UserId,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Read, &requester_key(&req))?;

    let (profile, posts) = tokio::try_join!(
        state.content.get_profile(&user_id.0),
        state.content.posts_by_author(&user_id.0, PROFILE_POST_LIMIT),
    )?;
    let profile = profile.ok_or_else(|| AppError::NotFound("profile".to_string()))?;

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(ProfilePageResponse { profile, posts }),
        decision,
    ))
}

/// PATCH /api/profile
pub async fn update_profile(
    user_id: UserId,
    state: web::Data<AppState>,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Standard, &user_id.0)?;
    let update = to_update(&req)?;

    let profile = state.content.update_profile(&user_id.0, &update).await?;

    tracing::info!(user_id = %user_id.0, "Profile updated");

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(ProfileResponse { ok: true, profile }),
        decision,
    ))
}
