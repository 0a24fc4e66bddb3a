//! Typed client facade for the SeriesTrack API.
//!
//! # Design
//! `ApiClient` holds only a `RequestEngine` and carries no mutable state
//! between calls. Each domain operation validates its required inputs
//! before dispatch, issues exactly one engine call, and decodes the JSON
//! payload into a typed DTO. A handful of operations remap specific
//! failures: 409 on user creation, 404 on user lookups, and 404 on the two
//! list reads that treat absence as an empty list.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{ClientConfig, ConfigError};
use crate::engine::{RequestEngine, RequestOptions};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    CreateFavoriteList, CreateSeries, CreateUser, FavoriteList, FriendRequest, Series,
    UpdateFavoriteList, UpdateSeries, UpdateUser, User,
};

/// Characters left alone by JavaScript's `encodeURIComponent`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a value for use as a single URL path segment.
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// One method per domain operation, dispatched through a `RequestEngine`.
#[derive(Debug, Clone)]
pub struct ApiClient<T = UreqTransport> {
    engine: RequestEngine<T>,
}

impl ApiClient<UreqTransport> {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new(config.request_timeout))
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(&ClientConfig::from_env()?))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            engine: RequestEngine::new(&config.base_url, transport, config.retry),
        }
    }

    pub fn engine(&self) -> &RequestEngine<T> {
        &self.engine
    }

    // -- users ---------------------------------------------------------------

    pub async fn create_user(&self, input: &CreateUser) -> Result<User, ApiError> {
        require("username", "Username", &input.username)?;
        require("email", "Email", &input.email)?;
        require("displayName", "Display name", &input.display_name)?;

        let options = RequestOptions::json(HttpMethod::Post, input)?;
        let value = self
            .engine
            .request("/users", options)
            .await
            .map_err(|err| match err.status() {
                Some(409) => ApiError::validation("Username or email already exists"),
                _ => err,
            })?;
        decode(value)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, ApiError> {
        require("userId", "User ID", user_id)?;
        let endpoint = format!("/users/{}", encode_segment(user_id));
        self.lookup_user(&endpoint, "User not found").await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, ApiError> {
        require("email", "Email", email)?;
        let endpoint = format!("/users/email/{}", encode_segment(email));
        self.lookup_user(&endpoint, "No user found with this email").await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<User, ApiError> {
        require("username", "Username", username)?;
        let endpoint = format!("/users/username/{}", encode_segment(username));
        self.lookup_user(&endpoint, "No user found with this username")
            .await
    }

    async fn lookup_user(&self, endpoint: &str, not_found: &str) -> Result<User, ApiError> {
        let value = self
            .engine
            .request(endpoint, RequestOptions::get())
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    ApiError::validation(not_found)
                } else {
                    err
                }
            })?;
        decode(value)
    }

    pub async fn update_user(&self, user_id: &str, input: &UpdateUser) -> Result<User, ApiError> {
        require("userId", "User ID", user_id)?;
        if input.is_empty() {
            return Err(ApiError::validation("No fields to update"));
        }
        let endpoint = format!("/users/{}", encode_segment(user_id));
        let options = RequestOptions::json(HttpMethod::Put, input)?;
        decode(self.engine.request(&endpoint, options).await?)
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        require("userId", "User ID", user_id)?;
        let endpoint = format!("/users/{}", encode_segment(user_id));
        self.engine.request(&endpoint, RequestOptions::delete()).await?;
        Ok(())
    }

    // -- series --------------------------------------------------------------

    pub async fn create_series(&self, input: &CreateSeries) -> Result<Series, ApiError> {
        require("userId", "User ID", &input.user_id)?;
        require("title", "Title", &input.title)?;
        require("genre", "Genre", &input.genre)?;

        let options = RequestOptions::json(HttpMethod::Post, input)?;
        decode(self.engine.request("/series", options).await?)
    }

    pub async fn get_series(&self, user_id: &str, series_id: &str) -> Result<Series, ApiError> {
        let endpoint = series_endpoint(user_id, series_id)?;
        decode(self.engine.request(&endpoint, RequestOptions::get()).await?)
    }

    pub async fn update_series(
        &self,
        user_id: &str,
        series_id: &str,
        input: &UpdateSeries,
    ) -> Result<Series, ApiError> {
        let endpoint = series_endpoint(user_id, series_id)?;
        if input.is_empty() {
            return Err(ApiError::validation("No fields to update"));
        }
        let options = RequestOptions::json(HttpMethod::Put, input)?;
        decode(self.engine.request(&endpoint, options).await?)
    }

    pub async fn delete_series(&self, user_id: &str, series_id: &str) -> Result<(), ApiError> {
        let endpoint = series_endpoint(user_id, series_id)?;
        self.engine.request(&endpoint, RequestOptions::delete()).await?;
        Ok(())
    }

    /// The user's watch-list. A 404 means the user has no list yet.
    pub async fn get_user_series(&self, user_id: &str) -> Result<Vec<Series>, ApiError> {
        require("userId", "User ID", user_id)?;
        let endpoint = format!("/users/{}/series", encode_segment(user_id));
        self.list_or_empty(&endpoint).await
    }

    /// Community series ranked by likes. A 404 means nothing to recommend.
    pub async fn get_recommendations(&self, user_id: &str) -> Result<Vec<Series>, ApiError> {
        require("userId", "User ID", user_id)?;
        let endpoint = format!("/users/{}/recommendations", encode_segment(user_id));
        self.list_or_empty(&endpoint).await
    }

    async fn list_or_empty<R: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<R>, ApiError> {
        match self.engine.request(endpoint, RequestOptions::get()).await {
            Ok(value) => decode_list(value),
            Err(ApiError::Response { status: 404, .. }) => {
                debug!(endpoint, "list not found, returning empty");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// `user_id` is the user doing the liking; `owner_id` owns the series.
    pub async fn like_series(
        &self,
        series_id: &str,
        owner_id: &str,
        user_id: &str,
    ) -> Result<Series, ApiError> {
        self.toggle_like(series_id, owner_id, user_id, "like").await
    }

    pub async fn unlike_series(
        &self,
        series_id: &str,
        owner_id: &str,
        user_id: &str,
    ) -> Result<Series, ApiError> {
        self.toggle_like(series_id, owner_id, user_id, "unlike")
            .await
    }

    async fn toggle_like(
        &self,
        series_id: &str,
        owner_id: &str,
        user_id: &str,
        action: &str,
    ) -> Result<Series, ApiError> {
        require("seriesId", "Series ID", series_id)?;
        require("ownerId", "Series owner ID", owner_id)?;
        require("userId", "User ID", user_id)?;

        let endpoint = format!(
            "/series/{}/{}/{action}",
            encode_segment(owner_id),
            encode_segment(series_id)
        );
        let options = RequestOptions::json(HttpMethod::Post, &json!({ "userId": user_id }))?;
        decode(self.engine.request(&endpoint, options).await?)
    }

    // -- friends -------------------------------------------------------------

    pub async fn send_friend_request(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<FriendRequest, ApiError> {
        require("fromUserId", "Sender ID", from_user_id)?;
        require("toUserId", "Recipient ID", to_user_id)?;

        let body = json!({ "fromUserId": from_user_id, "toUserId": to_user_id });
        let options = RequestOptions::json(HttpMethod::Post, &body)?;
        decode(self.engine.request("/friends/requests", options).await?)
    }

    /// Pending requests addressed to `user_id`.
    pub async fn get_friend_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>, ApiError> {
        require("userId", "User ID", user_id)?;
        let endpoint = format!("/users/{}/friend-requests", encode_segment(user_id));
        decode_list(self.engine.request(&endpoint, RequestOptions::get()).await?)
    }

    pub async fn accept_friend_request(&self, request_id: &str) -> Result<FriendRequest, ApiError> {
        self.answer_friend_request(request_id, "accept").await
    }

    pub async fn reject_friend_request(&self, request_id: &str) -> Result<FriendRequest, ApiError> {
        self.answer_friend_request(request_id, "reject").await
    }

    async fn answer_friend_request(
        &self,
        request_id: &str,
        action: &str,
    ) -> Result<FriendRequest, ApiError> {
        require("requestId", "Request ID", request_id)?;
        let endpoint = format!("/friends/requests/{}/{action}", encode_segment(request_id));
        let options = RequestOptions {
            method: HttpMethod::Put,
            ..RequestOptions::default()
        };
        decode(self.engine.request(&endpoint, options).await?)
    }

    pub async fn get_friends(&self, user_id: &str) -> Result<Vec<User>, ApiError> {
        require("userId", "User ID", user_id)?;
        let endpoint = format!("/users/{}/friends", encode_segment(user_id));
        decode_list(self.engine.request(&endpoint, RequestOptions::get()).await?)
    }

    pub async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<(), ApiError> {
        require("userId", "User ID", user_id)?;
        require("friendId", "Friend ID", friend_id)?;
        let endpoint = format!(
            "/users/{}/friends/{}",
            encode_segment(user_id),
            encode_segment(friend_id)
        );
        self.engine.request(&endpoint, RequestOptions::delete()).await?;
        Ok(())
    }

    // -- favorite lists ------------------------------------------------------

    pub async fn create_favorite_list(
        &self,
        input: &CreateFavoriteList,
    ) -> Result<FavoriteList, ApiError> {
        require("userId", "User ID", &input.user_id)?;
        require("name", "List name", &input.name)?;

        let options = RequestOptions::json(HttpMethod::Post, input)?;
        decode(self.engine.request("/favorites", options).await?)
    }

    pub async fn get_favorite_lists(&self, user_id: &str) -> Result<Vec<FavoriteList>, ApiError> {
        require("userId", "User ID", user_id)?;
        let endpoint = format!("/users/{}/favorites", encode_segment(user_id));
        decode_list(self.engine.request(&endpoint, RequestOptions::get()).await?)
    }

    pub async fn get_favorite_list(
        &self,
        user_id: &str,
        list_id: &str,
    ) -> Result<FavoriteList, ApiError> {
        let endpoint = favorite_endpoint(user_id, list_id)?;
        decode(self.engine.request(&endpoint, RequestOptions::get()).await?)
    }

    pub async fn update_favorite_list(
        &self,
        user_id: &str,
        list_id: &str,
        input: &UpdateFavoriteList,
    ) -> Result<FavoriteList, ApiError> {
        let endpoint = favorite_endpoint(user_id, list_id)?;
        if input.is_empty() {
            return Err(ApiError::validation("No fields to update"));
        }
        let options = RequestOptions::json(HttpMethod::Put, input)?;
        decode(self.engine.request(&endpoint, options).await?)
    }

    pub async fn delete_favorite_list(&self, user_id: &str, list_id: &str) -> Result<(), ApiError> {
        let endpoint = favorite_endpoint(user_id, list_id)?;
        self.engine.request(&endpoint, RequestOptions::delete()).await?;
        Ok(())
    }

    pub async fn add_series_to_list(
        &self,
        user_id: &str,
        list_id: &str,
        series_id: &str,
    ) -> Result<FavoriteList, ApiError> {
        let endpoint = format!("{}/series", favorite_endpoint(user_id, list_id)?);
        require("seriesId", "Series ID", series_id)?;
        let options = RequestOptions::json(HttpMethod::Post, &json!({ "seriesId": series_id }))?;
        decode(self.engine.request(&endpoint, options).await?)
    }

    pub async fn remove_series_from_list(
        &self,
        user_id: &str,
        list_id: &str,
        series_id: &str,
    ) -> Result<FavoriteList, ApiError> {
        let base = favorite_endpoint(user_id, list_id)?;
        require("seriesId", "Series ID", series_id)?;
        let endpoint = format!("{base}/series/{}", encode_segment(series_id));
        decode(self.engine.request(&endpoint, RequestOptions::delete()).await?)
    }
}

fn require(field: &str, label: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid_field(field, format!("{label} is required")));
    }
    Ok(())
}

fn series_endpoint(user_id: &str, series_id: &str) -> Result<String, ApiError> {
    require("userId", "User ID", user_id)?;
    require("seriesId", "Series ID", series_id)?;
    Ok(format!(
        "/series/{}/{}",
        encode_segment(user_id),
        encode_segment(series_id)
    ))
}

fn favorite_endpoint(user_id: &str, list_id: &str) -> Result<String, ApiError> {
    require("userId", "User ID", user_id)?;
    require("listId", "List ID", list_id)?;
    Ok(format!(
        "/favorites/{}/{}",
        encode_segment(user_id),
        encode_segment(list_id)
    ))
}

fn decode<R: DeserializeOwned>(value: Option<Value>) -> Result<R, ApiError> {
    let value =
        value.ok_or_else(|| ApiError::Deserialization("expected a JSON body".to_string()))?;
    serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// An empty body decodes as an empty list.
fn decode_list<R: DeserializeOwned>(value: Option<Value>) -> Result<Vec<R>, ApiError> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => {
            serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
        }
    }
}
