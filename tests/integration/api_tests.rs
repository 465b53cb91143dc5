//! API integration tests
//!
//! Require a running server seeded with `data/books.json` and `data/members.json`.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn login(client: &Client, last_name: &str, first_name: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "last_name": last_name,
            "first_name": first_name,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Helper to get an administrator token
async fn get_admin_token(client: &Client) -> String {
    login(client, "Admin", "Biblio", "admin").await
}

/// Helper to get a regular member token
async fn get_member_token(client: &Client) -> String {
    login(client, "Dupont", "Jean", "jean1234").await
}

async fn create_book(client: &Client, token: &str, title: &str) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": title, "author": "Test Author" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn delete_book(client: &Client, token: &str, id: i64) {
    client
        .delete(format!("{}/books/{}", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
}

fn unique(prefix: &str) -> String {
    format!("{} {}", prefix, uuid::Uuid::new_v4().simple())
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
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "last_name": "dupont",
            "first_name": "JEAN",
            "password": "jean1234"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["member"]["last_name"], "Dupont");
    assert!(body["member"].get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "last_name": "Dupont",
            "first_name": "Jean",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_login_missing_fields() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "last_name": "Dupont", "password": "jean1234" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_me_and_logout() {
    let client = Client::new();
    let token = get_member_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["connected"], true);
    assert_eq!(body["member"]["first_name"], "Jean");

    let response = client
        .post(format!("{}/auth/logout", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    // The token outlives its session
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_books_is_public() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_search_books_by_title() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .query(&[("title", "misérables")])
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let items = body["items"].as_array().expect("items array");
    assert!(!items.is_empty());
    for item in items {
        let title = item["title"].as_str().unwrap_or_default().to_lowercase();
        assert!(title.contains("misérables"));
    }
}

#[tokio::test]
#[ignore]
async fn test_create_book_requires_admin() {
    let client = Client::new();
    let token = get_member_token(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": unique("Forbidden"), "author": "Nobody" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_title_rejected() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let title = unique("Duplicate");
    let book = create_book(&client, &token, &title).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": title.to_uppercase(), "author": "Someone Else" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);

    delete_book(&client, &token, book["id"].as_i64().unwrap_or_default()).await;
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;
    let member = get_member_token(&client).await;
    let book = create_book(&client, &admin, &unique("Cycle")).await;
    let id = book["id"].as_i64().expect("book id");
    assert_eq!(book["status"], "Available");

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "Borrowed");
    assert_eq!(body["borrower"], "Dupont Jean");

    // Borrowing twice is refused
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower": "Martin Claire" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "Available");
    assert!(body["borrower"].is_null());

    // Returning an available book is refused
    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    delete_book(&client, &admin, id).await;

    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_borrow_requires_session() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books/1/borrow", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_members_as_admin() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/members", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let items = body["items"].as_array().expect("items array");
    assert!(items.iter().all(|m| m.get("password").is_none()));
}

#[tokio::test]
#[ignore]
async fn test_members_forbidden_to_regular_member() {
    let client = Client::new();
    let token = get_member_token(&client).await;

    let response = client
        .get(format!("{}/members", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_create_member_reports_every_problem() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .post(format!("{}/members", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "last_name": "", "first_name": "", "password": "" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    let details = body["details"].as_array().expect("details array");
    assert_eq!(details.len(), 4);
}

#[tokio::test]
#[ignore]
async fn test_member_lifecycle() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let last_name = unique("Member");

    let response = client
        .post(format!("{}/members", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "last_name": last_name,
            "first_name": "Test",
            "role": "Membre",
            "password": "secret"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let member: Value = response.json().await.expect("Failed to parse response");
    let id = member["id"].as_i64().expect("member id");
    assert_eq!(member["role"], "Member");

    // Short passwords are refused
    let response = client
        .put(format!("{}/members/{}", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "last_name": last_name,
            "first_name": "Test",
            "role": "Member",
            "password": "abc"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let new_token = login(&client, &last_name, "Test", "secret").await;
    assert!(!new_token.is_empty());

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    // Deleting a member ends their sessions
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", new_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_search_q_matches_author() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .query(&[("q", "flaubert")])
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let items = body["items"].as_array().expect("items array");
    assert!(items.iter().any(|b| b["title"] == "Madame Bovary"));
    for item in items {
        let title = item["title"].as_str().unwrap_or_default().to_lowercase();
        let author = item["author"].as_str().unwrap_or_default().to_lowercase();
        assert!(title.contains("flaubert") || author.contains("flaubert"));
    }
}

#[tokio::test]
#[ignore]
async fn test_rename_to_existing_title_rejected() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let first = create_book(&client, &token, &unique("First")).await;
    let second = create_book(&client, &token, &unique("Second")).await;
    let second_id = second["id"].as_i64().expect("book id");

    let response = client
        .put(format!("{}/books/{}", BASE_URL, second_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": first["title"] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Renaming a book to its own title is fine
    let response = client
        .put(format!("{}/books/{}", BASE_URL, second_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": second["title"] }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    delete_book(&client, &token, first["id"].as_i64().unwrap_or_default()).await;
    delete_book(&client, &token, second_id).await;
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_only_one_wins() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;
    let member = get_member_token(&client).await;
    let book = create_book(&client, &admin, &unique("Race")).await;
    let id = book["id"].as_i64().expect("book id");

    let borrow = |token: String| {
        let client = client.clone();
        async move {
            client
                .post(format!("{}/books/{}/borrow", BASE_URL, id))
                .header("Authorization", format!("Bearer {}", token))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }
    };

    let (a, b) = tokio::join!(borrow(admin.clone()), borrow(member));
    let mut statuses = [a.as_u16(), b.as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 409]);

    delete_book(&client, &admin, id).await;
}

#[tokio::test]
#[ignore]
async fn test_borrow_rejects_malformed_body() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;
    let book = create_book(&client, &admin, &unique("Malformed")).await;
    let id = book["id"].as_i64().expect("book id");

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower": 42 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Without a content type the body is still honoured
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", admin))
        .body(r#"{"borrower":"Martin Claire"}"#)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["borrower"], "Martin Claire");

    delete_book(&client, &admin, id).await;
}

/// Assumes the seeded administrator is the only one when the test starts
#[tokio::test]
#[ignore]
async fn test_administrator_roster_protections() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let me: Value = response.json().await.expect("Failed to parse response");
    let admin_id = me["member"]["id"].as_i64().expect("member id");

    // The last administrator cannot be demoted
    let response = client
        .put(format!("{}/members/{}", BASE_URL, admin_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "last_name": "Admin",
            "first_name": "Biblio",
            "role": "Member"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // A second administrator cannot delete their own account
    let last_name = unique("Deputy");
    let response = client
        .post(format!("{}/members", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "last_name": last_name,
            "first_name": "Admin",
            "role": "Administrator",
            "password": "deputy"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let deputy: Value = response.json().await.expect("Failed to parse response");
    let deputy_id = deputy["id"].as_i64().expect("member id");

    let deputy_token = login(&client, &last_name, "Admin", "deputy").await;
    let response = client
        .delete(format!("{}/members/{}", BASE_URL, deputy_id))
        .header("Authorization", format!("Bearer {}", deputy_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, deputy_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_rename_ends_member_sessions() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;
    let last_name = unique("Rename");

    let response = client
        .post(format!("{}/members", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({
            "last_name": last_name,
            "first_name": "Paul",
            "role": "Member",
            "password": "secret"
        }))
        .send()
        .await
        .expect("Failed to send request");
    let member: Value = response.json().await.expect("Failed to parse response");
    let id = member["id"].as_i64().expect("member id");
    let token = login(&client, &last_name, "Paul", "secret").await;

    let response = client
        .put(format!("{}/members/{}", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({
            "last_name": last_name,
            "first_name": "Pierre",
            "role": "Member"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    client
        .delete(format!("{}/members/{}", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
}

#[tokio::test]
#[ignore]
async fn test_page_far_past_the_end_is_empty() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .query(&[("page", i64::MAX.to_string())])
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["items"].as_array().map(Vec::len), Some(0));
}
