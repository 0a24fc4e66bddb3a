//! Client-side API access layer for the SeriesTrack service.
//!
//! # Overview
//! Every network call between a UI and the SeriesTrack backend goes through
//! three layers:
//! - `engine`: one HTTP call, outcome classification, bounded retry with
//!   exponential backoff.
//! - `client`: one typed method per domain operation, with client-side
//!   validation and a few domain-specific remaps.
//! - `adapter`: observable loading/error/data state for UI call sites, with
//!   retry and auto-fetching queries.
//!
//! # Design
//! - Requests and responses are plain data (`http`); the `Transport` trait
//!   is the only place bytes move, so everything above it is testable with
//!   scripted responses.
//! - Configuration is injected through `ClientConfig`; there is no global
//!   client.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod adapter;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod retry;
pub mod transport;
pub mod types;

pub use adapter::{user_message, ApiCall, CallState, Query, QueryOptions};
pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError, Environment};
pub use engine::{classify_response, Disposition, RequestEngine, RequestOptions};
pub use error::{ApiError, ErrorBody};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use retry::RetryPolicy;
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{
    CreateFavoriteList, CreateSeries, CreateUser, FavoriteList, FriendRequest,
    FriendRequestStatus, Series, UpdateFavoriteList, UpdateSeries, UpdateUser, User, WatchStatus,
};
