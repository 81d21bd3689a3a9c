//! HTTP surface of the Challyme backend: route table, shared state and the
//! handlers that stitch the domain rules in `challyme-core` to storage.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;
use tracing::error;

use challyme_db::Database;

pub mod auth;
pub mod challenges;
pub mod error;
pub mod extract;
pub mod friends;
pub mod images;
pub mod invites;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod storage;

pub use error::ApiError;
pub use storage::Storage;

/// Whole-request cap for the multipart upload route. The image itself is
/// limited separately, see [`images::MAX_IMAGE_BYTES`].
pub const MAX_UPLOAD_BODY: usize = 8 * 1024 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub jwt_secret: String,
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let protected = Router::new()
        // Challenges
        .route("/create-challenge", post(challenges::create_challenge))
        .route("/challenges", get(challenges::list_challenges))
        .route("/confirm", post(challenges::confirm))
        .route("/poke", post(challenges::poke))
        .route("/delete-challenge", delete(challenges::delete_challenge))
        // Friends
        .route("/send-friend-request", post(friends::send_friend_request))
        .route("/accept-friend-request", post(friends::accept_friend_request))
        .route("/decline-friend-request", post(friends::decline_friend_request))
        .route("/friends", get(friends::list_friends))
        // Invites
        .route("/send-invite", post(invites::send_invite))
        .route("/accept-invite", post(invites::accept_invite))
        .route("/decline-invite", post(invites::decline_invite))
        .route("/reject-invite", post(invites::decline_invite))
        // Notifications
        .route("/notifications", get(notifications::get_notifications))
        .route("/notify-missed-day", post(notifications::notify_missed_day))
        // Chat + images
        .route("/send-challenge-message", post(messages::send_message))
        .route("/challenge-messages", get(messages::get_messages))
        .route(
            "/upload-challenge-image",
            post(images::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY)),
        )
        .route("/challenge-images", get(images::list_images))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service("/uploads", ServeDir::new(state.storage.dir()))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Runs blocking work (SQLite, password hashing) off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("Blocking task failed: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
}
