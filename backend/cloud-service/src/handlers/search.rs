/// User search handler
use crate::error::{AppError, Result};
use crate::models::UserProfile;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

pub const MAX_QUERY_CHARS: usize = 100;
pub const MAX_RESULTS: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub users: Vec<UserProfile>,
}

/// GET /api/users/search
///
/// Rate limited by the middleware on the `/api/users` scope.
pub async fn search_users(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let raw = query.q.as_deref().unwrap_or("");
    if raw.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::Validation("Search query too long".to_string()));
    }

    let users = state.content.search_users(raw.trim(), MAX_RESULTS).await?;

    Ok(HttpResponse::Ok().json(SearchResponse { users }))
}
