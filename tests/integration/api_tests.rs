//! API integration tests against a running server

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique suffix so repeated runs do not collide on usernames or names
fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..10])
}

/// Registers a fresh reader and returns (id, username, password)
async fn register_reader(client: &Client) -> (i64, String, String) {
    let username = unique("reader");
    let password = "correct-horse-battery".to_string();
    let response = client
        .post(format!("{}/account/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.org", username),
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse register response");
    (body["id"].as_i64().expect("No id in response"), username, password)
}

/// Registers a fresh reader and returns (id, bearer token)
async fn reader_with_token(client: &Client) -> (i64, String) {
    let (id, username, password) = register_reader(client).await;
    let response = client
        .post(format!("{}/auth/token", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send token request");

    let body: Value = response.json().await.expect("Failed to parse token response");
    let token = body["token"].as_str().expect("No token in response").to_string();
    (id, token)
}

/// Helper to get a bearer token for a fresh reader
async fn get_auth_token(client: &Client) -> String {
    reader_with_token(client).await.1
}

async fn post_json(client: &Client, token: &str, path: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request")
}

async fn get_status(client: &Client, path: &str) -> StatusCode {
    client
        .get(format!("{}{}", BASE_URL, path))
        .send()
        .await
        .expect("Failed to send request")
        .status()
}

async fn delete(client: &Client, token: &str, path: &str) -> StatusCode {
    client
        .delete(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .status()
}

async fn create_language(client: &Client, token: &str) -> i64 {
    let language: Value = post_json(client, token, "/languages", json!({ "name": unique("lang") }))
        .await
        .json()
        .await
        .unwrap();
    language["id"].as_i64().unwrap()
}

/// Creates a genre, an author and a book in `language`; returns the book JSON
async fn create_book_in(client: &Client, token: &str, language: i64) -> Value {
    let genre: Value = post_json(client, token, "/genres", json!({ "name": unique("genre") }))
        .await
        .json()
        .await
        .unwrap();
    let author: Value = post_json(
        client,
        token,
        "/authors",
        json!({ "first_name": "Ivan", "last_name": unique("Goncharov") }),
    )
    .await
    .json()
    .await
    .unwrap();

    let isbn = format!("978{:010}", rand::random::<u32>());
    let response = post_json(
        client,
        token,
        "/books",
        json!({
            "title": unique("Oblomov "),
            "summary": "A nobleman who rarely leaves his bed.",
            "isbn": isbn,
            "authors": [author["id"]],
            "genre": [genre["id"]],
            "language": language
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

/// Creates a language, a genre, an author and a book; returns the book JSON
async fn create_book(client: &Client, token: &str) -> Value {
    let language = create_language(client, token).await;
    create_book_in(client, token, language).await
}

/// Creates a copy of `book` and returns its id
async fn create_copy(client: &Client, token: &str, copy: Value) -> String {
    let response = post_json(client, token, "/bookcopy", copy).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_token_login() {
    let client = Client::new();
    let (_, username, password) = register_reader(&client).await;

    let response = client
        .post(format!("{}/auth/token", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
}

#[tokio::test]
#[ignore]
async fn test_invalid_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/account/login", BASE_URL))
        .json(&json!({
            "username": "nobody-at-all",
            "password": "wrong-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Access denied: wrong username or password.");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration() {
    let client = Client::new();
    let (_, username, _) = register_reader(&client).await;

    let response = client
        .post(format!("{}/account/register", BASE_URL))
        .json(&json!({ "username": username, "password": "another-password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["username"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_session_login_and_csrf() {
    let client = Client::builder().cookie_store(true).build().unwrap();
    let (_, username, password) = register_reader(&client).await;

    let response = client
        .post(format!("{}/account/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let csrf = response
        .cookies()
        .find(|c| c.name() == "csrftoken")
        .map(|c| c.value().to_string())
        .expect("No CSRF cookie");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["is_librarian"], false);

    // Reads need no token
    let response = client.get(format!("{}/mybooks", BASE_URL)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Unsafe requests without the header are refused
    let response = client
        .post(format!("{}/genres", BASE_URL))
        .json(&json!({ "name": unique("genre") }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .post(format!("{}/genres", BASE_URL))
        .header("X-CSRFToken", &csrf)
        .json(&json!({ "name": unique("genre") }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/accounts/logout", BASE_URL))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.get(format!("{}/mybooks", BASE_URL)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_anonymous_writes_are_refused() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({ "title": "Anonymous" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_book_lifecycle() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let book = create_book(&client, &token).await;
    let book_id = book["id"].as_i64().unwrap();
    assert!(book["bookinstance_set"].as_array().unwrap().is_empty());
    assert_eq!(book["authors"].as_array().unwrap().len(), 1);

    // Search matches author surnames as well as titles
    let surname = book["authors"][0]["last_name"].as_str().unwrap();
    let found: Value = client
        .get(format!("{}/books", BASE_URL))
        .query(&[("search", surname.to_lowercase())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(found.as_array().unwrap().iter().any(|b| b["id"] == book["id"]));

    // A second book with the same ISBN is rejected
    let response = post_json(
        &client,
        &token,
        "/books",
        json!({
            "title": "Duplicate",
            "isbn": book["isbn"],
            "genre": [1],
            "language": 1
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A copy blocks deletion of its book
    let copy: Value = post_json(
        &client,
        &token,
        "/bookcopy",
        json!({ "book": book_id, "imprint": "Moscow, 1859", "status": "available" }),
    )
    .await
    .json()
    .await
    .unwrap();
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .delete(format!("{}/bookcopy/{}", BASE_URL, copy["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn test_reviews_and_relations() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let other = get_auth_token(&client).await;
    let book = create_book(&client, &token).await;
    let book_id = book["id"].as_i64().unwrap();

    let response = post_json(
        &client,
        &token,
        "/reviews",
        json!({ "title": "Slow", "review_text": "Beautifully slow.", "book": book_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let review: Value = response.json().await.unwrap();

    // Only the author may edit
    let response = client
        .patch(format!("{}/reviews/{}", BASE_URL, review["id"]))
        .bearer_auth(&other)
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // First relation write needs a rate
    let url = format!("{}/book_relation/{}", BASE_URL, book_id);
    let response = client
        .patch(&url)
        .bearer_auth(&token)
        .json(&json!({ "like": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .patch(&url)
        .bearer_auth(&token)
        .json(&json!({ "like": true, "rate": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .patch(&url)
        .bearer_auth(&token)
        .json(&json!({ "in_bookmarks": true }))
        .send()
        .await
        .unwrap();
    let relation: Value = response.json().await.unwrap();
    assert_eq!(relation["like"], true);
    assert_eq!(relation["in_bookmarks"], true);
    assert_eq!(relation["rate"], 4);
}

#[tokio::test]
#[ignore]
async fn test_borrowed_views() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/mybooks", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body.as_array().unwrap().is_empty());

    // A plain reader is not a librarian
    let response = client
        .get(format!("{}/allborrowed", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_language_delete_cascades_to_books() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let language = create_language(&client, &token).await;
    let first = create_book_in(&client, &token, language).await;
    let second = create_book_in(&client, &token, language).await;

    assert_eq!(delete(&client, &token, &format!("/languages/{}", language)).await, StatusCode::NO_CONTENT);

    assert_eq!(get_status(&client, &format!("/languages/{}", language)).await, StatusCode::NOT_FOUND);
    for book in [&first, &second] {
        assert_eq!(get_status(&client, &format!("/books/{}", book["id"])).await, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
#[ignore]
async fn test_language_delete_refused_while_books_have_copies() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let language = create_language(&client, &token).await;
    let book = create_book_in(&client, &token, language).await;
    let copy = create_copy(
        &client,
        &token,
        json!({ "book": book["id"], "imprint": "St Petersburg, 1859", "status": "available" }),
    )
    .await;

    assert_eq!(delete(&client, &token, &format!("/languages/{}", language)).await, StatusCode::CONFLICT);

    // Nothing was removed
    assert_eq!(get_status(&client, &format!("/languages/{}", language)).await, StatusCode::OK);
    assert_eq!(get_status(&client, &format!("/books/{}", book["id"])).await, StatusCode::OK);
    assert_eq!(get_status(&client, &format!("/bookcopy/{}", copy)).await, StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_user_delete_keeps_copies_and_reviews() {
    let client = Client::new();
    let (reader_id, reader_token) = reader_with_token(&client).await;
    let admin_token = get_auth_token(&client).await;
    let book = create_book(&client, &admin_token).await;

    let copy = create_copy(
        &client,
        &admin_token,
        json!({
            "book": book["id"],
            "imprint": "Moscow, 1859",
            "status": "on_loan",
            "due_back": "2030-01-15",
            "borrower": reader_id
        }),
    )
    .await;
    let response = post_json(
        &client,
        &reader_token,
        "/reviews",
        json!({ "title": "Lazy", "review_text": "Oblomov never gets up.", "book": book["id"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let review: Value = response.json().await.unwrap();

    assert_eq!(delete(&client, &admin_token, &format!("/users/{}", reader_id)).await, StatusCode::NO_CONTENT);

    let copy: Value = client
        .get(format!("{}/bookcopy/{}", BASE_URL, copy))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(copy["borrower"].is_null());
    assert_eq!(copy["status"], "on_loan");

    let review: Value = client
        .get(format!("{}/reviews/{}", BASE_URL, review["id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(review["author"].is_null());
    assert_eq!(review["title"], "Lazy");
}

#[tokio::test]
#[ignore]
async fn test_mybooks_lists_own_loans_by_due_date() {
    let client = Client::new();
    let (reader_id, reader_token) = reader_with_token(&client).await;
    let (other_id, _) = reader_with_token(&client).await;
    let book = create_book(&client, &reader_token).await;

    let copy = |due_back: &str, status: &str, borrower: i64| {
        json!({
            "book": book["id"],
            "imprint": "Moscow, 1859",
            "status": status,
            "due_back": due_back,
            "borrower": borrower
        })
    };
    let later = create_copy(&client, &reader_token, copy("2031-05-01", "on_loan", reader_id)).await;
    let sooner = create_copy(&client, &reader_token, copy("2030-01-01", "on_loan", reader_id)).await;
    create_copy(&client, &reader_token, copy("2029-06-01", "available", reader_id)).await;
    create_copy(&client, &reader_token, copy("2028-06-01", "on_loan", other_id)).await;

    let response = client
        .get(format!("{}/mybooks", BASE_URL))
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![sooner.as_str(), later.as_str()]);
    assert!(body.as_array().unwrap().iter().all(|c| c["borrower"]["id"] == reader_id));
}
