/// HTTP request handlers for cloud-service
pub mod activity;
pub mod admin;
pub mod engagement;
pub mod feed;
pub mod health;
pub mod posts;
pub mod profile;
pub mod search;
pub mod stream;

pub use activity::get_activity;
pub use admin::{delete_tweet, delete_user};
pub use engagement::{add_reply, toggle_like, toggle_retweet};
pub use feed::get_feed;
pub use health::health_check;
pub use posts::create_post;
pub use profile::{get_profile, update_profile};
pub use search::search_users;
pub use stream::stream_updates;

use actix_web::HttpResponse;
use rate_limit::{insert_rate_limit_headers, RateLimitDecision};

/// Attach the `X-RateLimit-*` headers of an allowed request
pub(crate) fn with_rate_limit_headers(
    mut response: HttpResponse,
    decision: Option<RateLimitDecision>,
) -> HttpResponse {
    if let Some(decision) = decision {
        insert_rate_limit_headers(response.headers_mut(), &decision);
    }
    response
}
