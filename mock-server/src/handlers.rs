use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Db, Failure, FavoriteList, FriendRequest, Series, Store, User};

type Reply<T> = Result<T, Failure>;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUser {
    username: String,
    email: String,
    display_name: String,
    bio: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUser {
    username: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    bio: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSeries {
    user_id: String,
    title: String,
    genre: String,
    status: Option<String>,
    rating: Option<u8>,
    review: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSeries {
    title: Option<String>,
    genre: Option<String>,
    status: Option<String>,
    rating: Option<u8>,
    review: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Liker {
    user_id: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NewFriendRequest {
    from_user_id: String,
    to_user_id: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFavorite {
    user_id: String,
    name: String,
    description: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateFavorite {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FavoriteSeries {
    series_id: String,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn friendship(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn ensure_user(store: &Store, id: &str) -> Reply<()> {
    if store.users.contains_key(id) {
        Ok(())
    } else {
        Err(Failure::not_found("User"))
    }
}

fn find_series<'a>(store: &'a Store, user_id: &str, series_id: &str) -> Reply<&'a Series> {
    store
        .series
        .get(series_id)
        .filter(|s| s.user_id == user_id)
        .ok_or_else(|| Failure::not_found("Series"))
}

fn find_favorite<'a>(store: &'a Store, user_id: &str, list_id: &str) -> Reply<&'a FavoriteList> {
    store
        .favorites
        .get(list_id)
        .filter(|f| f.user_id == user_id)
        .ok_or_else(|| Failure::not_found("Favorite list"))
}

fn owned_series<'a>(store: &'a mut Store, user_id: &str, series_id: &str) -> Reply<&'a mut Series> {
    store
        .series
        .get_mut(series_id)
        .filter(|s| s.user_id == user_id)
        .ok_or_else(|| Failure::not_found("Series"))
}

fn owned_favorite<'a>(
    store: &'a mut Store,
    user_id: &str,
    list_id: &str,
) -> Reply<&'a mut FavoriteList> {
    store
        .favorites
        .get_mut(list_id)
        .filter(|f| f.user_id == user_id)
        .ok_or_else(|| Failure::not_found("Favorite list"))
}

// --- users ---

pub async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> Reply<(StatusCode, Json<User>)> {
    if input.username.trim().is_empty()
        || input.email.trim().is_empty()
        || input.display_name.trim().is_empty()
    {
        return Err(Failure::bad_request(
            "username, email and displayName are required",
        ));
    }
    let mut store = db.write().await;
    let taken = store.users.values().any(|u| {
        u.username == input.username || u.email.eq_ignore_ascii_case(&input.email)
    });
    if taken {
        return Err(Failure::conflict("User already exists"));
    }
    let user = User {
        id: new_id(),
        username: input.username,
        email: input.email,
        display_name: input.display_name,
        bio: input.bio,
    };
    store.users.insert(user.id.clone(), user.clone());
    tracing::debug!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(State(db): State<Db>, Path(id): Path<String>) -> Reply<Json<User>> {
    let store = db.read().await;
    store
        .users
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| Failure::not_found("User"))
}

pub async fn get_user_by_email(
    State(db): State<Db>,
    Path(email): Path<String>,
) -> Reply<Json<User>> {
    let store = db.read().await;
    store
        .users
        .values()
        .find(|u| u.email.eq_ignore_ascii_case(&email))
        .cloned()
        .map(Json)
        .ok_or_else(|| Failure::not_found("User"))
}

pub async fn get_user_by_username(
    State(db): State<Db>,
    Path(username): Path<String>,
) -> Reply<Json<User>> {
    let store = db.read().await;
    store
        .users
        .values()
        .find(|u| u.username == username)
        .cloned()
        .map(Json)
        .ok_or_else(|| Failure::not_found("User"))
}

pub async fn update_user(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateUser>,
) -> Reply<Json<User>> {
    let mut store = db.write().await;
    let user = store
        .users
        .get_mut(&id)
        .ok_or_else(|| Failure::not_found("User"))?;
    if let Some(username) = input.username {
        user.username = username;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    if let Some(display_name) = input.display_name {
        user.display_name = display_name;
    }
    if let Some(bio) = input.bio {
        user.bio = Some(bio);
    }
    Ok(Json(user.clone()))
}

pub async fn delete_user(State(db): State<Db>, Path(id): Path<String>) -> Reply<StatusCode> {
    let mut store = db.write().await;
    store
        .users
        .remove(&id)
        .ok_or_else(|| Failure::not_found("User"))?;
    store.series.retain(|_, s| s.user_id != id);
    store.favorites.retain(|_, f| f.user_id != id);
    store.friendships.retain(|(a, b)| a != &id && b != &id);
    Ok(StatusCode::NO_CONTENT)
}

// --- series ---

pub async fn create_series(
    State(db): State<Db>,
    Json(input): Json<CreateSeries>,
) -> Reply<(StatusCode, Json<Series>)> {
    if input.user_id.trim().is_empty()
        || input.title.trim().is_empty()
        || input.genre.trim().is_empty()
    {
        return Err(Failure::bad_request("userId, title and genre are required"));
    }
    let series = Series {
        id: new_id(),
        user_id: input.user_id,
        title: input.title,
        genre: input.genre,
        status: input.status,
        rating: input.rating,
        review: input.review,
        likes: 0,
        liked_by: Vec::new(),
    };
    db.write()
        .await
        .series
        .insert(series.id.clone(), series.clone());
    Ok((StatusCode::CREATED, Json(series)))
}

pub async fn list_user_series(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Reply<Json<Vec<Series>>> {
    let store = db.read().await;
    ensure_user(&store, &id)?;
    let mut series: Vec<Series> = store
        .series
        .values()
        .filter(|s| s.user_id == id)
        .cloned()
        .collect();
    series.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(Json(series))
}

pub async fn get_series(
    State(db): State<Db>,
    Path((user_id, series_id)): Path<(String, String)>,
) -> Reply<Json<Series>> {
    let store = db.read().await;
    find_series(&store, &user_id, &series_id).map(|s| Json(s.clone()))
}

pub async fn update_series(
    State(db): State<Db>,
    Path((user_id, series_id)): Path<(String, String)>,
    Json(input): Json<UpdateSeries>,
) -> Reply<Json<Series>> {
    let mut store = db.write().await;
    let series = owned_series(&mut store, &user_id, &series_id)?;
    if let Some(title) = input.title {
        series.title = title;
    }
    if let Some(genre) = input.genre {
        series.genre = genre;
    }
    if input.status.is_some() {
        series.status = input.status;
    }
    if input.rating.is_some() {
        series.rating = input.rating;
    }
    if input.review.is_some() {
        series.review = input.review;
    }
    Ok(Json(series.clone()))
}

pub async fn delete_series(
    State(db): State<Db>,
    Path((user_id, series_id)): Path<(String, String)>,
) -> Reply<StatusCode> {
    let mut store = db.write().await;
    owned_series(&mut store, &user_id, &series_id)?;
    store.series.remove(&series_id);
    for list in store.favorites.values_mut() {
        list.series_ids.retain(|id| id != &series_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_series(
    State(db): State<Db>,
    Path((user_id, series_id)): Path<(String, String)>,
    Json(liker): Json<Liker>,
) -> Reply<Json<Series>> {
    if liker.user_id.trim().is_empty() {
        return Err(Failure::bad_request("userId is required"));
    }
    let mut store = db.write().await;
    let series = owned_series(&mut store, &user_id, &series_id)?;
    if !series.liked_by.contains(&liker.user_id) {
        series.liked_by.push(liker.user_id);
        series.likes += 1;
    }
    Ok(Json(series.clone()))
}

pub async fn unlike_series(
    State(db): State<Db>,
    Path((user_id, series_id)): Path<(String, String)>,
    Json(liker): Json<Liker>,
) -> Reply<Json<Series>> {
    if liker.user_id.trim().is_empty() {
        return Err(Failure::bad_request("userId is required"));
    }
    let mut store = db.write().await;
    let series = owned_series(&mut store, &user_id, &series_id)?;
    if let Some(pos) = series.liked_by.iter().position(|id| id == &liker.user_id) {
        series.liked_by.remove(pos);
        series.likes = series.likes.saturating_sub(1);
    }
    Ok(Json(series.clone()))
}

/// Other users' series, most liked first.
pub async fn recommendations(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Reply<Json<Vec<Series>>> {
    let store = db.read().await;
    ensure_user(&store, &id)?;
    let mut series: Vec<Series> = store
        .series
        .values()
        .filter(|s| s.user_id != id)
        .cloned()
        .collect();
    series.sort_by(|a, b| b.likes.cmp(&a.likes).then_with(|| a.title.cmp(&b.title)));
    Ok(Json(series))
}

// --- friends ---

pub async fn send_friend_request(
    State(db): State<Db>,
    Json(input): Json<NewFriendRequest>,
) -> Reply<(StatusCode, Json<FriendRequest>)> {
    if input.from_user_id.trim().is_empty() || input.to_user_id.trim().is_empty() {
        return Err(Failure::bad_request("fromUserId and toUserId are required"));
    }
    if input.from_user_id == input.to_user_id {
        return Err(Failure::bad_request("Cannot send a friend request to yourself"));
    }
    let mut store = db.write().await;
    ensure_user(&store, &input.from_user_id)?;
    ensure_user(&store, &input.to_user_id)?;
    if store
        .friendships
        .contains(&friendship(&input.from_user_id, &input.to_user_id))
    {
        return Err(Failure::conflict("Already friends"));
    }
    let pending = store.friend_requests.values().any(|r| {
        r.status == "pending"
            && friendship(&r.from_user_id, &r.to_user_id)
                == friendship(&input.from_user_id, &input.to_user_id)
    });
    if pending {
        return Err(Failure::conflict("Friend request already pending"));
    }
    let request = FriendRequest {
        id: new_id(),
        from_user_id: input.from_user_id,
        to_user_id: input.to_user_id,
        status: "pending".to_string(),
    };
    store
        .friend_requests
        .insert(request.id.clone(), request.clone());
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_friend_requests(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Json<Vec<FriendRequest>> {
    let store = db.read().await;
    Json(
        store
            .friend_requests
            .values()
            .filter(|r| r.to_user_id == id && r.status == "pending")
            .cloned()
            .collect(),
    )
}

pub async fn accept_friend_request(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Reply<Json<FriendRequest>> {
    answer_friend_request(db, id, "accepted").await
}

pub async fn reject_friend_request(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Reply<Json<FriendRequest>> {
    answer_friend_request(db, id, "rejected").await
}

async fn answer_friend_request(db: Db, id: String, status: &str) -> Reply<Json<FriendRequest>> {
    let mut store = db.write().await;
    let request = store
        .friend_requests
        .get_mut(&id)
        .ok_or_else(|| Failure::not_found("Friend request"))?;
    if request.status != "pending" {
        return Err(Failure::conflict("Friend request already answered"));
    }
    request.status = status.to_string();
    let request = request.clone();
    if status == "accepted" {
        store
            .friendships
            .insert(friendship(&request.from_user_id, &request.to_user_id));
    }
    Ok(Json(request))
}

pub async fn list_friends(State(db): State<Db>, Path(id): Path<String>) -> Reply<Json<Vec<User>>> {
    let store = db.read().await;
    ensure_user(&store, &id)?;
    let mut friends: Vec<User> = store
        .friendships
        .iter()
        .filter_map(|(a, b)| {
            if a == &id {
                store.users.get(b)
            } else if b == &id {
                store.users.get(a)
            } else {
                None
            }
        })
        .cloned()
        .collect();
    friends.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(Json(friends))
}

pub async fn remove_friend(
    State(db): State<Db>,
    Path((id, friend_id)): Path<(String, String)>,
) -> Reply<StatusCode> {
    let mut store = db.write().await;
    if store.friendships.remove(&friendship(&id, &friend_id)) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Failure::not_found("Friendship"))
    }
}

// --- favorite lists ---

pub async fn create_favorite(
    State(db): State<Db>,
    Json(input): Json<CreateFavorite>,
) -> Reply<(StatusCode, Json<FavoriteList>)> {
    if input.user_id.trim().is_empty() || input.name.trim().is_empty() {
        return Err(Failure::bad_request("userId and name are required"));
    }
    let list = FavoriteList {
        id: new_id(),
        user_id: input.user_id,
        name: input.name,
        description: input.description,
        series_ids: Vec::new(),
    };
    db.write()
        .await
        .favorites
        .insert(list.id.clone(), list.clone());
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn list_favorites(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Json<Vec<FavoriteList>> {
    let store = db.read().await;
    let mut lists: Vec<FavoriteList> = store
        .favorites
        .values()
        .filter(|f| f.user_id == id)
        .cloned()
        .collect();
    lists.sort_by(|a, b| a.name.cmp(&b.name));
    Json(lists)
}

pub async fn get_favorite(
    State(db): State<Db>,
    Path((user_id, list_id)): Path<(String, String)>,
) -> Reply<Json<FavoriteList>> {
    let store = db.read().await;
    find_favorite(&store, &user_id, &list_id).map(|f| Json(f.clone()))
}

pub async fn update_favorite(
    State(db): State<Db>,
    Path((user_id, list_id)): Path<(String, String)>,
    Json(input): Json<UpdateFavorite>,
) -> Reply<Json<FavoriteList>> {
    let mut store = db.write().await;
    let list = owned_favorite(&mut store, &user_id, &list_id)?;
    if let Some(name) = input.name {
        list.name = name;
    }
    if input.description.is_some() {
        list.description = input.description;
    }
    Ok(Json(list.clone()))
}

pub async fn delete_favorite(
    State(db): State<Db>,
    Path((user_id, list_id)): Path<(String, String)>,
) -> Reply<StatusCode> {
    let mut store = db.write().await;
    owned_favorite(&mut store, &user_id, &list_id)?;
    store.favorites.remove(&list_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite_series(
    State(db): State<Db>,
    Path((user_id, list_id)): Path<(String, String)>,
    Json(input): Json<FavoriteSeries>,
) -> Reply<Json<FavoriteList>> {
    if input.series_id.trim().is_empty() {
        return Err(Failure::bad_request("seriesId is required"));
    }
    let mut store = db.write().await;
    let list = owned_favorite(&mut store, &user_id, &list_id)?;
    if !list.series_ids.contains(&input.series_id) {
        list.series_ids.push(input.series_id);
    }
    Ok(Json(list.clone()))
}

pub async fn remove_favorite_series(
    State(db): State<Db>,
    Path((user_id, list_id, series_id)): Path<(String, String, String)>,
) -> Reply<Json<FavoriteList>> {
    let mut store = db.write().await;
    let list = owned_favorite(&mut store, &user_id, &list_id)?;
    list.series_ids.retain(|id| id != &series_id);
    Ok(Json(list.clone()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::RwLock;

    use super::*;

    fn seeded() -> Db {
        let mut store = Store::default();
        store.series.insert(
            "s1".to_string(),
            Series {
                id: "s1".to_string(),
                user_id: "u1".to_string(),
                title: "Dark".to_string(),
                genre: "Sci-Fi".to_string(),
                status: None,
                rating: None,
                review: None,
                likes: 0,
                liked_by: Vec::new(),
            },
        );
        store.favorites.insert(
            "l1".to_string(),
            FavoriteList {
                id: "l1".to_string(),
                user_id: "u1".to_string(),
                name: "Faves".to_string(),
                description: None,
                series_ids: vec!["s1".to_string()],
            },
        );
        Arc::new(RwLock::new(store))
    }

    fn ids(a: &str, b: &str) -> Path<(String, String)> {
        Path((a.to_string(), b.to_string()))
    }

    #[tokio::test]
    async fn single_reads_share_the_store_with_other_readers() {
        let db = seeded();
        let _reader = db.read().await;

        let series = tokio::time::timeout(
            Duration::from_secs(1),
            get_series(State(Arc::clone(&db)), ids("u1", "s1")),
        )
        .await
        .expect("get_series blocked behind a reader")
        .unwrap();
        assert_eq!(series.0.title, "Dark");

        let list = tokio::time::timeout(
            Duration::from_secs(1),
            get_favorite(State(Arc::clone(&db)), ids("u1", "l1")),
        )
        .await
        .expect("get_favorite blocked behind a reader")
        .unwrap();
        assert_eq!(list.0.series_ids, vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn single_reads_are_scoped_to_the_owner() {
        let db = seeded();
        let err = get_series(State(Arc::clone(&db)), ids("u2", "s1"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let err = get_favorite(State(db), ids("u2", "l1")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
