use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

use catalog_api::{
    db::MemoryStore,
    models::{Title, TitleType},
    routes::{create_router, AppState},
    services::TokenManager,
};

fn catalog() -> Vec<Title> {
    vec![
        Title::new("s1", "Action Movie", TitleType::Movie)
            .with_director("Director 1")
            .with_rating("PG-13")
            .with_release_year(2020)
            .with_description("Action movie")
            .with_genres("Action, Adventure"),
        Title::new("s2", "Comedy Movie", TitleType::Movie)
            .with_director("Director 2")
            .with_rating("PG")
            .with_release_year(2021)
            .with_description("Comedy movie")
            .with_genres("Comedy, Romance"),
        Title::new("s3", "Drama Series", TitleType::Series)
            .with_director("Director 3")
            .with_rating("TV-MA")
            .with_release_year(2022)
            .with_description("Drama series")
            .with_genres("Drama, Thriller"),
        Title::new("s4", "Action Comedy", TitleType::Movie)
            .with_director("Director 4")
            .with_rating("PG-13")
            .with_release_year(2023)
            .with_description("Action comedy movie")
            .with_genres("Action, Comedy"),
        Title::new("s5", "Romantic Drama", TitleType::Movie)
            .with_director("Director 5")
            .with_rating("PG-13")
            .with_release_year(2023)
            .with_description("Romantic drama movie")
            .with_genres("Romance, Drama"),
    ]
}

fn create_test_server() -> TestServer {
    let store = Arc::new(MemoryStore::with_titles(catalog()));
    let state = AppState::new(store, TokenManager::new("test-secret", 3600));
    let app = create_router(Arc::new(state));
    TestServer::new(app).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn authorization() -> HeaderName {
    HeaderName::from_static("authorization")
}

async fn register(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "testuser",
            "email": email,
            "password": "password123"
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

async fn authed_get(server: &TestServer, path: &str, token: &str) -> TestResponse {
    server.get(path).add_header(authorization(), bearer(token)).await
}

async fn authed_post(server: &TestServer, path: &str, token: &str, body: Value) -> TestResponse {
    server
        .post(path)
        .add_header(authorization(), bearer(token))
        .json(&body)
        .await
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let id = "6f1c1d7e-7a53-4a52-9a35-0d3f0f5d2c11";
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(id),
        )
        .await;
    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_list_titles_with_pagination() {
    let server = create_test_server();
    let response = server.get("/api/titles?limit=2&page=2").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["titles"].as_array().unwrap().len(), 2);
    assert_eq!(body["titles"][0]["show_id"], "s3");
    assert_eq!(body["pagination"]["total"], 5);
    assert_eq!(body["pagination"]["totalPages"], 3);
}

#[tokio::test]
async fn test_filter_titles() {
    let server = create_test_server();

    let response = server.get("/api/titles?director=director%203").await;
    let body: Value = response.json();
    assert_eq!(body["titles"].as_array().unwrap().len(), 1);
    assert_eq!(body["titles"][0]["type"], "TV Show");

    let response = server.get("/api/titles?rating=PG&search=&director=").await;
    let body: Value = response.json();
    assert_eq!(body["titles"].as_array().unwrap().len(), 1);
    assert_eq!(body["titles"][0]["rating"], "PG");

    let response = server.get("/api/titles?search=drama").await;
    let body: Value = response.json();
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn test_sort_titles_by_release_year() {
    let server = create_test_server();
    let response = server
        .get("/api/titles?sortBy=release_year&sortOrder=desc")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["titles"][0]["release_year"], 2023);
    assert_eq!(body["titles"][4]["release_year"], 2020);
}

#[tokio::test]
async fn test_sort_by_unknown_column_is_rejected() {
    let server = create_test_server();
    let response = server.get("/api/titles?sortBy=password").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_title() {
    let server = create_test_server();

    let response = server.get("/api/titles/s1").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Action Movie");
    assert_eq!(body["listed_in"], "Action, Adventure");

    let response = server.get("/api/titles/nonexistent").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Title not found");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let server = create_test_server();
    register(&server, "test@example.com").await;

    let duplicate = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "other",
            "email": "test@example.com",
            "password": "password123"
        }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "test@example.com", "password": "password123" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let token = body["token"].as_str().unwrap();
    assert_eq!(body["user"]["username"], "testuser");

    let me = authed_get(&server, "/api/auth/me", token).await;
    me.assert_status_ok();
    let profile: Value = me.json();
    assert_eq!(profile["email"], "test@example.com");
    assert!(profile.get("password_hash").is_none());

    let bad = server
        .post("/api/auth/login")
        .json(&json!({ "email": "test@example.com", "password": "wrong" }))
        .await;
    bad.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_authentication() {
    let server = create_test_server();

    server
        .get("/api/recommendations")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/favorites")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/api/reviews")
        .json(&json!({ "show_id": "s1", "rating": 5, "review": "Great movie!" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    authed_get(&server, "/api/recommendations", "garbage")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reviews_flow() {
    let server = create_test_server();
    let token = register(&server, "test@example.com").await;

    let response = authed_post(
        &server,
        "/api/reviews",
        &token,
        json!({ "show_id": "s1", "rating": 5, "review": "Great movie!" }),
    )
    .await;
    response.assert_status_ok();
    let created: Value = response.json();
    let review_id = created["id"].as_i64().unwrap();

    authed_post(
        &server,
        "/api/reviews",
        &token,
        json!({ "show_id": "s1", "rating": 3, "review": "Okay movie" }),
    )
    .await
    .assert_status_ok();

    let reviews: Vec<Value> = server.get("/api/reviews/s1").await.json();
    assert_eq!(reviews.len(), 2);

    let average: Value = server.get("/api/reviews/s1/average").await.json();
    assert_eq!(average["average_rating"], 4.0);

    let unrated: Value = server.get("/api/reviews/s2/average").await.json();
    assert_eq!(unrated["average_rating"], 0.0);

    let mine: Vec<Value> = authed_get(&server, "/api/reviews/user", &token).await.json();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0]["title"], "Action Movie");

    let update = server
        .put(&format!("/api/reviews/{}", review_id))
        .add_header(authorization(), bearer(&token))
        .json(&json!({ "rating": 1, "review": "Changed my mind" }))
        .await;
    update.assert_status_ok();

    let average: Value = server.get("/api/reviews/s1/average").await.json();
    assert_eq!(average["average_rating"], 2.0);

    let delete = server
        .delete(&format!("/api/reviews/{}", review_id))
        .add_header(authorization(), bearer(&token))
        .await;
    delete.assert_status_ok();

    let reviews: Vec<Value> = server.get("/api/reviews/s1").await.json();
    assert_eq!(reviews.len(), 1);
}

#[tokio::test]
async fn test_review_validation_and_ownership() {
    let server = create_test_server();
    let author = register(&server, "author@example.com").await;
    let stranger = register(&server, "stranger@example.com").await;

    authed_post(
        &server,
        "/api/reviews",
        &author,
        json!({ "show_id": "s1", "rating": 9, "review": "" }),
    )
    .await
    .assert_status(StatusCode::BAD_REQUEST);

    authed_post(
        &server,
        "/api/reviews",
        &author,
        json!({ "show_id": "missing", "rating": 4, "review": "" }),
    )
    .await
    .assert_status(StatusCode::NOT_FOUND);

    let created: Value = authed_post(
        &server,
        "/api/reviews",
        &author,
        json!({ "show_id": "s1", "rating": 4, "review": "Nice" }),
    )
    .await
    .json();

    server
        .delete(&format!("/api/reviews/{}", created["id"]))
        .add_header(authorization(), bearer(&stranger))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorites_flow() {
    let server = create_test_server();
    let token = register(&server, "test@example.com").await;

    let response = authed_post(&server, "/api/favorites", &token, json!({ "show_id": "s1" })).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body.get("id").is_some());

    authed_post(&server, "/api/favorites", &token, json!({ "show_id": "s1" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let favorites: Vec<Value> = authed_get(&server, "/api/favorites", &token).await.json();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["show_id"], "s1");
    assert_eq!(favorites[0]["avg_rating"], 0.0);

    let removed = server
        .delete("/api/favorites/s1")
        .add_header(authorization(), bearer(&token))
        .await;
    removed.assert_status_ok();
    let body: Value = removed.json();
    assert_eq!(body["message"], "Removed from favorites");

    let favorites: Vec<Value> = authed_get(&server, "/api/favorites", &token).await.json();
    assert!(favorites.is_empty());

    server
        .delete("/api/favorites/s1")
        .add_header(authorization(), bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendations_empty_without_history() {
    let server = create_test_server();
    let token = register(&server, "test@example.com").await;

    let response = authed_get(&server, "/api/recommendations", &token).await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_personalized_recommendations() {
    let server = create_test_server();
    let token = register(&server, "test@example.com").await;
    let other = register(&server, "other@example.com").await;

    authed_post(&server, "/api/favorites", &token, json!({ "show_id": "s1" }))
        .await
        .assert_status_ok();
    authed_post(
        &server,
        "/api/reviews",
        &token,
        json!({ "show_id": "s2", "rating": 5, "review": "Great movie!" }),
    )
    .await
    .assert_status_ok();
    authed_post(
        &server,
        "/api/reviews",
        &other,
        json!({ "show_id": "s5", "rating": 4, "review": "Lovely" }),
    )
    .await
    .assert_status_ok();

    let response = authed_get(&server, "/api/recommendations", &token).await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();

    let ids: Vec<&str> = items
        .iter()
        .map(|item| item["show_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["s4", "s5"]);
    assert_eq!(items[0]["genre_match_score"], 2);
    assert_eq!(items[1]["avg_rating"], 4.0);
    assert_eq!(items[1]["listed_in"], "Romance, Drama");
}

#[tokio::test]
async fn test_review_at_rating_four_drives_recommendations() {
    let server = create_test_server();
    let token = register(&server, "four@example.com").await;
    let other = register(&server, "three@example.com").await;

    authed_post(
        &server,
        "/api/reviews",
        &token,
        json!({ "show_id": "s3", "rating": 4, "review": "Solid" }),
    )
    .await
    .assert_status_ok();
    authed_post(
        &server,
        "/api/reviews",
        &other,
        json!({ "show_id": "s3", "rating": 3, "review": "Fine" }),
    )
    .await
    .assert_status_ok();

    let response = authed_get(&server, "/api/recommendations", &token).await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    let ids: Vec<&str> = items
        .iter()
        .map(|item| item["show_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["s5"]);
    assert_eq!(items[0]["genre_match_score"], 1);

    let response = authed_get(&server, "/api/recommendations", &other).await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert!(items.is_empty());
}
