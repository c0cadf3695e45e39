use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use serde_json::{json, Value};
use std::time::Duration;
use storefront_core::{hash_token, Role};
use tower::ServiceExt;

const TEST_SALT: &str = "test-salt";

#[test]
fn api_error_validation_error_maps_to_bad_request() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("not_found", StatusCode::NOT_FOUND),
        ("unauthorized", StatusCode::UNAUTHORIZED),
        ("forbidden", StatusCode::FORBIDDEN),
        ("conflict", StatusCode::CONFLICT),
        ("payload_too_large", StatusCode::PAYLOAD_TOO_LARGE),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "msg").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[test]
fn core_forbidden_maps_to_forbidden_code() {
    let err = map_core_error("req-1", &storefront_core::CoreError::Forbidden);
    assert_eq!(err.error.code, "forbidden");

    let err = map_core_error("req-1", &storefront_core::CoreError::InvalidRating(9));
    assert_eq!(err.error.code, "validation_error");
}

// ---------------------------------------------------------------------------
// Live router tests
// ---------------------------------------------------------------------------

struct Fixture {
    app: Router,
    admin: String,
    alice: String,
    bob: String,
}

async fn seed_user(pool: &PgPool, name: &str, email: &str, role: Role) -> String {
    let token = format!("tok-{email}");
    storefront_db::create_user(pool, name, email, role, &hash_token(TEST_SALT, &token))
        .await
        .expect("create user");
    token
}

async fn fixture(pool: PgPool) -> Fixture {
    let admin = seed_user(&pool, "Admin", "admin@example.com", Role::Admin).await;
    let alice = seed_user(&pool, "Alice", "alice@example.com", Role::User).await;
    let bob = seed_user(&pool, "Bob", "bob@example.com", Role::User).await;

    let uploads = UploadSettings {
        dir: std::env::temp_dir().join(format!("storefront-test-{}", uuid::Uuid::new_v4())),
        max_bytes: 1024,
    };
    let auth = AuthState::new(pool.clone(), TEST_SALT);
    let app = build_app(
        AppState { pool, uploads },
        auth,
        RateLimitState::new(10_000, Duration::from_secs(60)),
    );

    Fixture {
        app,
        admin,
        alice,
        bob,
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn product_body(name: &str) -> Value {
    json!({
        "name": name,
        "price": 25,
        "description": "A sturdy chair",
        "category": "office",
        "company": "ikea"
    })
}

async fn create_product(fx: &Fixture, name: &str) -> i64 {
    let (status, json) = send(
        &fx.app,
        Method::POST,
        "/api/v1/products",
        Some(&fx.admin),
        Some(product_body(name)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"]["id"].as_i64().expect("product id")
}

async fn create_review(fx: &Fixture, token: &str, product: i64, rating: i64) -> (StatusCode, Value) {
    send(
        &fx.app,
        Method::POST,
        "/api/v1/reviews",
        Some(token),
        Some(json!({
            "product": product,
            "rating": rating,
            "title": "Solid",
            "comment": "Does the job"
        })),
    )
    .await
}

async fn product_detail(fx: &Fixture, product: i64) -> (StatusCode, Value) {
    send(
        &fx.app,
        Method::GET,
        &format!("/api/v1/products/{product}"),
        None,
        None,
    )
    .await
}

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_database_ok(pool: PgPool) {
    let fx = fixture(pool).await;
    let (status, json) = send(&fx.app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert!(json["meta"]["request_id"].is_string());
}

#[sqlx::test(migrations = "../../migrations")]
async fn users_me_requires_a_known_token(pool: PgPool) {
    let fx = fixture(pool).await;

    let (status, _) = send(&fx.app, Method::GET, "/api/v1/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&fx.app, Method::GET, "/api/v1/users/me", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) =
        send(&fx.app, Method::GET, "/api/v1/users/me", Some(&fx.alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["email"], "alice@example.com");
    assert_eq!(json["data"]["role"], "user");
}

#[sqlx::test(migrations = "../../migrations")]
async fn product_writes_require_admin(pool: PgPool) {
    let fx = fixture(pool).await;

    let (status, _) = send(
        &fx.app,
        Method::POST,
        "/api/v1/products",
        None,
        Some(product_body("Chair")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send(
        &fx.app,
        Method::POST,
        "/api/v1/products",
        Some(&fx.alice),
        Some(product_body("Chair")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "forbidden");

    let id = create_product(&fx, "Chair").await;
    let (status, json) = product_detail(&fx, id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["product"]["num_of_reviews"], 0);
    assert_eq!(json["data"]["product"]["colors"], json!(["#222"]));
    assert_eq!(json["data"]["product"]["image"], "/uploads/example.jpeg");
}

#[sqlx::test(migrations = "../../migrations")]
async fn product_body_cannot_set_rating_fields(pool: PgPool) {
    let fx = fixture(pool).await;
    let id = create_product(&fx, "Desk").await;

    let (status, json) = send(
        &fx.app,
        Method::PATCH,
        &format!("/api/v1/products/{id}"),
        Some(&fx.admin),
        Some(json!({ "average_rating": 5, "num_of_reviews": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, json) = send(
        &fx.app,
        Method::PATCH,
        &format!("/api/v1/products/{id}"),
        Some(&fx.admin),
        Some(json!({ "featured": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["featured"], true);
    assert_eq!(json["data"]["name"], "Desk");
}

#[sqlx::test(migrations = "../../migrations")]
async fn reviews_keep_product_rating_current(pool: PgPool) {
    let fx = fixture(pool).await;
    let id = create_product(&fx, "Lamp").await;

    let (status, alice_review) = create_review(&fx, &fx.alice, id, 4).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, bob_review) = create_review(&fx, &fx.bob, id, 2).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = product_detail(&fx, id).await;
    assert_eq!(json["data"]["product"]["num_of_reviews"], 2);
    assert_eq!(json["data"]["product"]["average_rating"], "3.0");
    assert_eq!(json["data"]["reviews"].as_array().map(Vec::len), Some(2));

    let bob_review_id = bob_review["data"]["id"].as_i64().expect("review id");
    let (status, _) = send(
        &fx.app,
        Method::DELETE,
        &format!("/api/v1/reviews/{bob_review_id}"),
        Some(&fx.bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = product_detail(&fx, id).await;
    assert_eq!(json["data"]["product"]["num_of_reviews"], 1);
    assert_eq!(json["data"]["product"]["average_rating"], "4.0");

    let alice_review_id = alice_review["data"]["id"].as_i64().expect("review id");
    let (status, json) = send(
        &fx.app,
        Method::PATCH,
        &format!("/api/v1/reviews/{alice_review_id}"),
        Some(&fx.alice),
        Some(json!({ "rating": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["rating"], 1);

    let (_, json) = product_detail(&fx, id).await;
    assert_eq!(json["data"]["product"]["average_rating"], "1.0");
}

#[sqlx::test(migrations = "../../migrations")]
async fn review_validation_and_duplicates(pool: PgPool) {
    let fx = fixture(pool).await;
    let id = create_product(&fx, "Rug").await;

    let (status, json) = create_review(&fx, &fx.alice, id, 6).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, _) = create_review(&fx, &fx.alice, id, 5).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = create_review(&fx, &fx.alice, id, 3).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");

    let (status, _) = create_review(&fx, &fx.alice, id + 1_000, 3).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = product_detail(&fx, id).await;
    assert_eq!(json["data"]["product"]["num_of_reviews"], 1);
    assert_eq!(json["data"]["product"]["average_rating"], "5.0");
}

#[sqlx::test(migrations = "../../migrations")]
async fn only_owner_or_admin_may_change_a_review(pool: PgPool) {
    let fx = fixture(pool).await;
    let id = create_product(&fx, "Sofa").await;
    let (_, review) = create_review(&fx, &fx.alice, id, 4).await;
    let review_id = review["data"]["id"].as_i64().expect("review id");
    let uri = format!("/api/v1/reviews/{review_id}");

    let (status, json) = send(
        &fx.app,
        Method::PATCH,
        &uri,
        Some(&fx.bob),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "forbidden");

    let (status, _) = send(&fx.app, Method::DELETE, &uri, Some(&fx.bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&fx.app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["title"], "Solid");
    assert_eq!(json["data"]["user"]["name"], "Alice");
    assert_eq!(json["data"]["product"]["name"], "Sofa");

    let (status, _) = send(&fx.app, Method::DELETE, &uri, Some(&fx.admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&fx.app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_a_product_removes_its_reviews(pool: PgPool) {
    let fx = fixture(pool).await;
    let doomed = create_product(&fx, "Bed").await;
    let kept = create_product(&fx, "Shelf").await;
    create_review(&fx, &fx.alice, doomed, 5).await;
    create_review(&fx, &fx.bob, doomed, 3).await;
    create_review(&fx, &fx.alice, kept, 2).await;

    let (status, json) = send(
        &fx.app,
        Method::DELETE,
        &format!("/api/v1/products/{doomed}"),
        Some(&fx.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["reviews_deleted"], 2);

    let (status, _) = product_detail(&fx, doomed).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&fx.app, Method::GET, "/api/v1/reviews", None, None).await;
    assert_eq!(json["data"]["count"], 1);
    assert_eq!(json["data"]["reviews"][0]["product"]["id"], kept);

    let (status, json) = send(
        &fx.app,
        Method::DELETE,
        &format!("/api/v1/products/{doomed}"),
        Some(&fx.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn upload_rejects_non_image_parts(pool: PgPool) {
    let fx = fixture(pool).await;
    let boundary = "X-BOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"notes.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         hello\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/products/upload-image")
        .header(header::AUTHORIZATION, format!("Bearer {}", fx.admin))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");

    let response = fx.app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upload_stores_image_and_returns_public_path(pool: PgPool) {
    let fx = fixture(pool).await;
    let boundary = "X-BOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"chair.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         not-really-a-png\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/products/upload-image")
        .header(header::AUTHORIZATION, format!("Bearer {}", fx.admin))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");

    let response = fx.app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&bytes).expect("json parse");
    let path = json["data"]["image"].as_str().expect("image path");
    assert!(path.starts_with("/uploads/"));
    assert!(path.ends_with("-chair.png"));

    let (status, _) = send(&fx.app, Method::GET, path, None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reviews_of_a_missing_product_are_not_found(pool: PgPool) {
    let fx = fixture(pool).await;
    let id = create_product(&fx, "Ottoman").await;

    let (status, json) = send(
        &fx.app,
        Method::GET,
        &format!("/api/v1/products/{id}/reviews"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 0);

    let (status, json) = send(
        &fx.app,
        Method::GET,
        &format!("/api/v1/products/{}/reviews", id + 1_000),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn price_beyond_column_precision_is_rejected(pool: PgPool) {
    let fx = fixture(pool).await;
    let mut body = product_body("Throne");
    body["price"] = json!(100_000_000_000_i64);

    let (status, json) = send(
        &fx.app,
        Method::POST,
        "/api/v1/products",
        Some(&fx.admin),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn routing_errors_use_the_json_envelope(pool: PgPool) {
    let fx = fixture(pool).await;

    let (status, json) = send(&fx.app, Method::GET, "/api/v1/products/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
    assert!(json["meta"]["request_id"].is_string());

    let (status, json) = send(&fx.app, Method::GET, "/api/v1/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
    assert!(json["meta"]["request_id"].is_string());

    let (status, json) = send(&fx.app, Method::PUT, "/api/v1/reviews", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json["error"]["code"], "method_not_allowed");
}

#[sqlx::test(migrations = "../../migrations")]
async fn rejected_token_carries_request_id(pool: PgPool) {
    let fx = fixture(pool).await;
    let request = Request::builder()
        .uri("/api/v1/users/me")
        .header(header::AUTHORIZATION, "Bearer not-a-real-token")
        .header("x-request-id", "req-bad-token")
        .body(Body::empty())
        .expect("request");

    let response = fx.app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&bytes).expect("json parse");
    assert_eq!(json["error"]["code"], "unauthorized");
    assert_eq!(json["meta"]["request_id"], "req-bad-token");
}

// ---------------------------------------------------------------------------
// Orders and user administration
// ---------------------------------------------------------------------------

async fn place_order(fx: &Fixture, token: &str, items: Value) -> (StatusCode, Value) {
    send(
        &fx.app,
        Method::POST,
        "/api/v1/orders",
        Some(token),
        Some(json!({ "items": items, "tax": "2.50", "shipping_fee": 10 })),
    )
    .await
}

#[sqlx::test(migrations = "../../migrations")]
async fn checkout_uses_catalog_prices(pool: PgPool) {
    let fx = fixture(pool).await;
    let chair = create_product(&fx, "Chair").await;

    let (status, _) = send(
        &fx.app,
        Method::POST,
        "/api/v1/orders",
        None,
        Some(json!({ "items": [{ "product": chair, "amount": 1 }], "tax": 0, "shipping_fee": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = place_order(&fx, &fx.alice, json!([{ "product": chair, "amount": 2 }])).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    // 25.00 * 2 + 2.50 + 10.00
    assert_eq!(json["data"]["order"]["subtotal"], "50.00");
    assert_eq!(json["data"]["order"]["total"], "62.50");
    assert_eq!(json["data"]["order"]["status"], "pending");
    assert_eq!(json["data"]["order"]["items"][0]["name"], "Chair");
    assert!(json["data"]["client_secret"].is_string());

    let (status, json) = place_order(
        &fx,
        &fx.alice,
        json!([{ "product": chair, "amount": 1, "price": "0.01" }]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, json) = place_order(&fx, &fx.alice, json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, json) =
        place_order(&fx, &fx.alice, json!([{ "product": chair + 1_000, "amount": 1 }])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn orders_are_visible_to_owner_and_admin_only(pool: PgPool) {
    let fx = fixture(pool).await;
    let chair = create_product(&fx, "Chair").await;
    let (_, placed) = place_order(&fx, &fx.alice, json!([{ "product": chair, "amount": 1 }])).await;
    let order_id = placed["data"]["order"]["id"].as_i64().expect("order id");
    let uri = format!("/api/v1/orders/{order_id}");

    let (status, _) = send(&fx.app, Method::GET, &uri, Some(&fx.bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&fx.app, Method::GET, &uri, Some(&fx.alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&fx.app, Method::GET, &uri, Some(&fx.admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&fx.app, Method::GET, "/api/v1/orders", Some(&fx.alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, json) = send(&fx.app, Method::GET, "/api/v1/orders", Some(&fx.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 1);

    let (_, json) = send(&fx.app, Method::GET, "/api/v1/orders/mine", Some(&fx.alice), None).await;
    assert_eq!(json["data"]["count"], 1);
    let (_, json) = send(&fx.app, Method::GET, "/api/v1/orders/mine", Some(&fx.bob), None).await;
    assert_eq!(json["data"]["count"], 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn paying_an_order_records_the_intent_once(pool: PgPool) {
    let fx = fixture(pool).await;
    let chair = create_product(&fx, "Chair").await;
    let (_, placed) = place_order(&fx, &fx.alice, json!([{ "product": chair, "amount": 1 }])).await;
    let order_id = placed["data"]["order"]["id"].as_i64().expect("order id");
    let uri = format!("/api/v1/orders/{order_id}");
    let body = json!({ "payment_intent_id": "pi_abc" });

    let (status, _) = send(&fx.app, Method::PATCH, &uri, Some(&fx.bob), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) =
        send(&fx.app, Method::PATCH, &uri, Some(&fx.alice), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "paid");
    assert_eq!(json["data"]["payment_intent_id"], "pi_abc");

    let (status, json) = send(&fx.app, Method::PATCH, &uri, Some(&fx.alice), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");
}

#[sqlx::test(migrations = "../../migrations")]
async fn user_directory_is_admin_only(pool: PgPool) {
    let fx = fixture(pool).await;

    let (status, _) = send(&fx.app, Method::GET, "/api/v1/users", Some(&fx.alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&fx.app, Method::GET, "/api/v1/users", Some(&fx.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 2);
    let bob_id = json["data"]["users"][1]["id"].as_i64().expect("bob id");
    assert_eq!(json["data"]["users"][1]["email"], "bob@example.com");

    let uri = format!("/api/v1/users/{bob_id}");
    let (status, _) = send(&fx.app, Method::GET, &uri, Some(&fx.alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, json) = send(&fx.app, Method::GET, &uri, Some(&fx.bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Bob");

    let (status, _) = send(
        &fx.app,
        Method::GET,
        &format!("/api/v1/users/{}", bob_id + 1_000),
        Some(&fx.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn profile_update_rejects_taken_email(pool: PgPool) {
    let fx = fixture(pool).await;

    let (status, json) = send(
        &fx.app,
        Method::PATCH,
        "/api/v1/users/me",
        Some(&fx.alice),
        Some(json!({ "name": " Alice L. " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Alice L.");

    let (status, json) = send(
        &fx.app,
        Method::PATCH,
        "/api/v1/users/me",
        Some(&fx.alice),
        Some(json!({ "email": "BOB@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");

    let (status, _) = send(
        &fx.app,
        Method::PATCH,
        "/api/v1/users/me",
        Some(&fx.alice),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
