//! Integration tests for shop create, update, and delete.
//!
//! These tests cover:
//! - Authentication rules: reads are public, writes need a bearer token
//! - Geocoding exactly when the coordinate pair is absent
//! - Partial updates: merge semantics, explicit nulls, PUT as an alias
//! - Atomicity of failed creates and cascading deletes

use garden_integration_tests::TestApp;
use reqwest::StatusCode;
use serde_json::{Value, json};
use sqlx::SqlitePool;

/// Full creation payload for a shop named `name`, without coordinates.
fn shop_payload(name: &str) -> Value {
    json!({
        "name": name,
        "address": {
            "postal_code": "150-0041",
            "prefecture": "東京都",
            "city": "渋谷区",
            "town": "神南",
            "street_address": "1-2-3",
        },
        "phone_number": "03-1234-5678",
        "seat_count": 12,
        "capacity": 20,
    })
}

/// Create a shop and return the response body.
async fn create_shop(app: &TestApp, token: &str, payload: &Value) -> Value {
    let response = app
        .client
        .post(app.url("/api/shops/shops"))
        .bearer_auth(token)
        .json(payload)
        .send()
        .await
        .expect("Failed to create shop");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse shop response")
}

/// Create a type tag and return its ID.
async fn create_type_tag(app: &TestApp, token: &str, name: &str) -> i64 {
    let response = app
        .client
        .post(app.url("/api/shops/types"))
        .bearer_auth(token)
        .json(&json!({"name": name}))
        .send()
        .await
        .expect("Failed to create tag");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse tag response");
    body["id"].as_i64().expect("tag id missing")
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

// ============ Authentication Tests ============

#[tokio::test]
async fn test_writes_require_a_bearer_token() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/api/shops/shops"))
        .json(&shop_payload("Unauthenticated"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Authentication credentials were not provided.");

    let response = app
        .client
        .post(app.url("/api/shops/shops"))
        .bearer_auth("wrong-token")
        .json(&shop_payload("Impostor"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Invalid token.");

    let response = app
        .client
        .delete(app.url("/api/shops/shops/1"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reads_are_public() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let mut payload = shop_payload("Open Door");
    payload["latitude"] = json!(35.66);
    payload["longitude"] = json!(139.7);
    let created = create_shop(&app, &token, &payload).await;
    let id = created["id"].as_i64().expect("shop id missing");

    // No Authorization header on either read
    let response = app
        .client
        .get(app.url("/api/shops/shops"))
        .send()
        .await
        .expect("Failed to list shops");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .get(app.url(&format!("/api/shops/shops/{id}")))
        .send()
        .await
        .expect("Failed to fetch shop");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["name"], "Open Door");
    assert!(
        body.get("created_by").is_none(),
        "responses must not expose the creating user"
    );
}

// ============ Geocoding Tests ============

#[tokio::test]
async fn test_create_geocodes_when_coordinates_missing() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;
    app.geocoder.respond_with(35.6895, 139.6917);

    let body = create_shop(&app, &token, &shop_payload("Geocoded")).await;
    assert_eq!(body["latitude"], 35.6895);
    assert_eq!(body["longitude"], 139.6917);
    assert_eq!(app.geocoder.calls(), 1, "expected exactly one lookup");
}

#[tokio::test]
async fn test_create_with_coordinates_skips_geocoding() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;
    app.geocoder.respond_with(1.0, 2.0);

    let mut payload = shop_payload("Pinned");
    payload["latitude"] = json!(35.0);
    payload["longitude"] = json!(135.0);

    let body = create_shop(&app, &token, &payload).await;
    assert_eq!(body["latitude"], 35.0);
    assert_eq!(body["longitude"], 135.0);
    assert_eq!(app.geocoder.calls(), 0, "no lookup expected");
}

#[tokio::test]
async fn test_create_survives_failed_geocoding() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;
    // Stub answers with no results by default

    let body = create_shop(&app, &token, &shop_payload("Unlocated")).await;
    assert!(body["latitude"].is_null());
    assert!(body["longitude"].is_null());
    assert_eq!(app.geocoder.calls(), 1);
}

#[tokio::test]
async fn test_clearing_coordinates_regeocodes_the_address() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let mut payload = shop_payload("Moving");
    payload["latitude"] = json!(35.0);
    payload["longitude"] = json!(135.0);
    let created = create_shop(&app, &token, &payload).await;
    let id = created["id"].as_i64().expect("shop id missing");
    assert_eq!(app.geocoder.calls(), 0);

    app.geocoder.respond_with(34.702, 135.495);
    let response = app
        .client
        .patch(app.url(&format!("/api/shops/shops/{id}")))
        .bearer_auth(&token)
        .json(&json!({"latitude": null, "longitude": null}))
        .send()
        .await
        .expect("Failed to update shop");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["latitude"], 34.702);
    assert_eq!(body["longitude"], 135.495);
    assert_eq!(app.geocoder.calls(), 1);
}

// ============ Validation Tests ============

#[tokio::test]
async fn test_create_reports_missing_and_blank_fields() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let response = app
        .client
        .post(app.url("/api/shops/shops"))
        .bearer_auth(&token)
        .json(&json!({
            "address": {
                "postal_code": "150-0041",
                "prefecture": "東京都",
                "city": "渋谷区",
                "town": "   ",
                "street_address": "1-2-3",
            },
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["name"][0], "This field is required.");
    assert_eq!(body["address.town"][0], "This field may not be blank.");

    let response = app
        .client
        .post(app.url("/api/shops/shops"))
        .bearer_auth(&token)
        .json(&json!({"name": "No Address"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["address"][0], "This field is required.");
}

#[tokio::test]
async fn test_create_rejects_half_set_coordinates() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let mut payload = shop_payload("Halfway");
    payload["latitude"] = json!(35.0);

    let response = app
        .client
        .post(app.url("/api/shops/shops"))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        body["non_field_errors"][0],
        "latitude and longitude must be provided together"
    );
}

#[tokio::test]
async fn test_create_with_unknown_tag_writes_nothing() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let mut payload = shop_payload("Ghost");
    payload["types"] = json!([999]);

    let response = app
        .client
        .post(app.url("/api/shops/shops"))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["types"][0], "Tag 999 does not exist.");

    // The rejected create must not leave partial rows behind
    assert_eq!(count(&app.pool, "shops").await, 0);
    assert_eq!(count(&app.pool, "addresses").await, 0);
}

// ============ Update Tests ============

#[tokio::test]
async fn test_patch_merges_only_present_fields() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let mut payload = shop_payload("Before");
    payload["latitude"] = json!(35.66);
    payload["longitude"] = json!(139.7);
    let created = create_shop(&app, &token, &payload).await;
    let id = created["id"].as_i64().expect("shop id missing");

    let response = app
        .client
        .patch(app.url(&format!("/api/shops/shops/{id}")))
        .bearer_auth(&token)
        .json(&json!({"name": "After"}))
        .send()
        .await
        .expect("Failed to update shop");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["name"], "After");
    assert_eq!(body["phone_number"], "03-1234-5678");
    assert_eq!(body["seat_count"], 12);
    assert_eq!(body["address"]["city"], "渋谷区");
    assert_eq!(body["latitude"], 35.66);

    // Explicit null clears a nullable field
    let response = app
        .client
        .patch(app.url(&format!("/api/shops/shops/{id}")))
        .bearer_auth(&token)
        .json(&json!({"phone_number": null}))
        .send()
        .await
        .expect("Failed to update shop");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["phone_number"].is_null());
    assert_eq!(body["name"], "After");
}

#[tokio::test]
async fn test_put_behaves_like_patch() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let mut payload = shop_payload("Original");
    payload["latitude"] = json!(35.66);
    payload["longitude"] = json!(139.7);
    let created = create_shop(&app, &token, &payload).await;
    let id = created["id"].as_i64().expect("shop id missing");

    let response = app
        .client
        .put(app.url(&format!("/api/shops/shops/{id}")))
        .bearer_auth(&token)
        .json(&json!({"name": "Replaced"}))
        .send()
        .await
        .expect("Failed to update shop");
    assert_eq!(response.status(), StatusCode::OK);

    // Fields absent from the PUT body survive, exactly as with PATCH
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["name"], "Replaced");
    assert_eq!(body["phone_number"], "03-1234-5678");
    assert_eq!(body["address"]["town"], "神南");
}

#[tokio::test]
async fn test_update_tag_list_semantics() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let bar = create_type_tag(&app, &token, "バー").await;
    let diner = create_type_tag(&app, &token, "食堂").await;

    let mut payload = shop_payload("Tagged");
    payload["latitude"] = json!(35.66);
    payload["longitude"] = json!(139.7);
    payload["types"] = json!([bar]);
    let created = create_shop(&app, &token, &payload).await;
    let id = created["id"].as_i64().expect("shop id missing");
    assert_eq!(created["types"], json!([bar]));

    // A present list replaces membership; duplicates collapse
    let response = app
        .client
        .patch(app.url(&format!("/api/shops/shops/{id}")))
        .bearer_auth(&token)
        .json(&json!({"types": [diner, diner, bar]}))
        .send()
        .await
        .expect("Failed to update shop");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["types"], json!([bar, diner]));

    // An absent list keeps membership
    let response = app
        .client
        .patch(app.url(&format!("/api/shops/shops/{id}")))
        .bearer_auth(&token)
        .json(&json!({"name": "Still Tagged"}))
        .send()
        .await
        .expect("Failed to update shop");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["types"], json!([bar, diner]));

    // An empty list clears membership
    let response = app
        .client
        .patch(app.url(&format!("/api/shops/shops/{id}")))
        .bearer_auth(&token)
        .json(&json!({"types": []}))
        .send()
        .await
        .expect("Failed to update shop");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["types"], json!([]));
}

#[tokio::test]
async fn test_update_missing_shop_is_404() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let response = app
        .client
        .patch(app.url("/api/shops/shops/9999"))
        .bearer_auth(&token)
        .json(&json!({"name": "Nobody"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Not found");
}

// ============ Delete Tests ============

#[tokio::test]
async fn test_delete_cascades_to_dependents() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let mut payload = shop_payload("Doomed");
    payload["latitude"] = json!(35.66);
    payload["longitude"] = json!(139.7);
    let created = create_shop(&app, &token, &payload).await;
    let id = created["id"].as_i64().expect("shop id missing");

    let response = app
        .client
        .post(app.url("/api/shops/photos"))
        .bearer_auth(&token)
        .json(&json!({"shop_id": id, "image_url": "https://cdn.example.com/doomed.jpg"}))
        .send()
        .await
        .expect("Failed to create photo");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .client
        .post(app.url("/api/shops/reviews"))
        .bearer_auth(&token)
        .json(&json!({"shop": id, "title": "Fine", "content": "Was fine."}))
        .send()
        .await
        .expect("Failed to create review");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .client
        .delete(app.url(&format!("/api/shops/shops/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete shop");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .get(app.url(&format!("/api/shops/shops/{id}")))
        .send()
        .await
        .expect("Failed to fetch shop");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(count(&app.pool, "addresses").await, 0);
    assert_eq!(count(&app.pool, "shop_photos").await, 0);
    assert_eq!(count(&app.pool, "reviews").await, 0);
}

#[tokio::test]
async fn test_delete_missing_shop_is_404() {
    let app = TestApp::spawn().await;
    let token = app.register_user("owner").await;

    let response = app
        .client
        .delete(app.url("/api/shops/shops/424242"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
