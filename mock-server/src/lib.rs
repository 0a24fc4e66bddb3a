//! In-memory stand-in for the SeriesTrack backend.
//!
//! Serves every endpoint the client facade calls, under `/api`, from a
//! single `RwLock`-guarded store. Validation failures answer 400 with a
//! `message` field; missing resources and conflicts answer 404/409 with an
//! `error` field, so clients see both error body shapes.

mod handlers;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub likes: u32,
    pub liked_by: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteList {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub series_ids: Vec<String>,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<String, User>,
    series: HashMap<String, Series>,
    friend_requests: HashMap<String, FriendRequest>,
    friendships: HashSet<(String, String)>,
    favorites: HashMap<String, FavoriteList>,
}

pub type Db = Arc<RwLock<Store>>;

/// Error reply: a status plus a JSON body.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    body: serde_json::Value,
}

impl Failure {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "message": message }),
        }
    }

    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({ "error": format!("{what} not found") }),
        }
    }

    fn conflict(message: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            body: json!({ "error": message }),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/users", post(handlers::create_user))
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/email/{email}", get(handlers::get_user_by_email))
        .route("/users/username/{username}", get(handlers::get_user_by_username))
        .route("/users/{id}/series", get(handlers::list_user_series))
        .route("/users/{id}/recommendations", get(handlers::recommendations))
        .route("/users/{id}/friend-requests", get(handlers::list_friend_requests))
        .route("/users/{id}/friends", get(handlers::list_friends))
        .route(
            "/users/{id}/friends/{friend_id}",
            axum::routing::delete(handlers::remove_friend),
        )
        .route("/users/{id}/favorites", get(handlers::list_favorites))
        .route("/series", post(handlers::create_series))
        .route(
            "/series/{user_id}/{series_id}",
            get(handlers::get_series)
                .put(handlers::update_series)
                .delete(handlers::delete_series),
        )
        .route("/series/{user_id}/{series_id}/like", post(handlers::like_series))
        .route("/series/{user_id}/{series_id}/unlike", post(handlers::unlike_series))
        .route("/friends/requests", post(handlers::send_friend_request))
        .route(
            "/friends/requests/{id}/accept",
            put(handlers::accept_friend_request),
        )
        .route(
            "/friends/requests/{id}/reject",
            put(handlers::reject_friend_request),
        )
        .route("/favorites", post(handlers::create_favorite))
        .route(
            "/favorites/{user_id}/{list_id}",
            get(handlers::get_favorite)
                .put(handlers::update_favorite)
                .delete(handlers::delete_favorite),
        )
        .route(
            "/favorites/{user_id}/{list_id}/series",
            post(handlers::add_favorite_series),
        )
        .route(
            "/favorites/{user_id}/{list_id}/series/{series_id}",
            axum::routing::delete(handlers::remove_favorite_series),
        )
        .with_state(db);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}
