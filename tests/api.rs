//! End-to-end tests of the REST surface.
//!
//! Each test builds the real router over the in-memory note store and
//! profile directory, signs HS256 tokens locally and drives requests through
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{prelude::*, Duration};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt; // for `.oneshot()`
use uuid::Uuid;

use braggy::{
    identity::MemoryDirectory,
    jwt_auth::{TokenClaims, TokenVerifier},
    model::{Note, NoteChanges},
    route::create_router,
    service::NoteService,
    signature::WebhookVerifier,
    store::{MemoryNoteStore, NoteStore, StoreError},
    subscription::{ProfileMetadata, SubscriptionTier},
    AppState, RouterOptions,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const JWT_SECRET: &[u8] = b"integration-test-secret";
const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

struct TestApp {
    router: Router,
    directory: Arc<MemoryDirectory>,
}

fn setup() -> TestApp {
    setup_with(
        Arc::new(MemoryNoteStore::new()),
        RouterOptions {
            admin_routes: true,
            ..Default::default()
        },
        Some(WEBHOOK_SECRET),
    )
}

fn setup_with(
    store: Arc<dyn NoteStore>,
    options: RouterOptions,
    webhook_secret: Option<&str>,
) -> TestApp {
    let directory = Arc::new(MemoryDirectory::new());
    let state = AppState {
        notes: NoteService::new(store),
        directory: directory.clone(),
        verifier: TokenVerifier::hs256(JWT_SECRET),
        webhook: webhook_secret.map(|secret| WebhookVerifier::new(secret).unwrap()),
        options,
    };
    TestApp {
        router: create_router(Arc::new(state)),
        directory,
    }
}

fn claims(sub: Option<&str>) -> TokenClaims {
    let now = Utc::now().timestamp();
    TokenClaims {
        sub: sub.map(str::to_owned),
        exp: (now + 3600) as usize,
        iat: Some(now as usize),
        pla: None,
        public_metadata: None,
    }
}

fn sign(claims: &TokenClaims) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(JWT_SECRET),
    )
    .unwrap()
}

fn token(sub: &str) -> String {
    sign(&claims(Some(sub)))
}

fn premium_token(sub: &str, end: Option<DateTime<Utc>>) -> String {
    let mut claims = claims(Some(sub));
    claims.public_metadata = Some(ProfileMetadata {
        subscription_tier: Some(SubscriptionTier::Premium),
        is_canceled: Some(true),
        subscription_end_date: end,
        ..Default::default()
    });
    sign(&claims)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn note_body(title: &str) -> Value {
    json!({
        "title": title,
        "content": "Closed the quarter ahead of plan",
        "date": "2024-06-30",
    })
}

async fn create(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
    send(
        &app.router,
        request(Method::POST, "/api/notes", Some(token), Some(body)),
    )
    .await
}

async fn note_count(app: &TestApp, token: &str) -> u64 {
    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/notes", Some(token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["count"].as_u64().unwrap()
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_uses_the_callers_subject_as_owner() {
    let app = setup();
    let mut body = note_body("Promoted");
    body["ownerId"] = json!("user_intruder");

    let (status, body) = create(&app, &token("user_a"), body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Note created successfully");
    assert_eq!(body["note"]["ownerId"], "user_a");
    assert_eq!(body["note"]["title"], "Promoted");
    assert_eq!(body["note"]["tags"], json!([]));
    assert_eq!(body["note"]["createdAt"], body["note"]["updatedAt"]);
}

#[tokio::test]
async fn tags_keep_their_order() {
    let app = setup();
    let user = token("user_a");
    let mut body = note_body("Tagged");
    body["tags"] = json!(["x", "y"]);

    let (_, created) = create(&app, &user, body).await;
    let id = created["note"]["id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        request(Method::GET, &format!("/api/notes/{id}"), Some(&user), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["tags"], json!(["x", "y"]));
}

#[tokio::test]
async fn list_is_newest_first_with_count() {
    let app = setup();
    let user = token("user_a");
    create(&app, &user, note_body("first")).await;
    create(&app, &user, note_body("second")).await;
    create(&app, &token("user_b"), note_body("not mine")).await;

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/notes", Some(&user), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["notes"][0]["title"], "second");
    assert_eq!(body["notes"][1]["title"], "first");
}

#[tokio::test]
async fn other_users_get_not_found() {
    let app = setup();
    let owner = token("user_a");
    let stranger = token("user_b");
    let (_, created) = create(&app, &owner, note_body("Private")).await;
    let uri = format!("/api/notes/{}", created["note"]["id"].as_str().unwrap());

    for (method, body) in [
        (Method::GET, None),
        (Method::PUT, Some(json!({ "title": "Mine now" }))),
        (Method::DELETE, None),
    ] {
        let (status, body) = send(&app.router, request(method, &uri, Some(&stranger), body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], true);
        assert_eq!(body["message"], "Note not found");
        assert!(body.get("note").is_none());
    }

    let (status, body) = send(&app.router, request(Method::GET, &uri, Some(&owner), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["title"], "Private");
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() {
    let app = setup();
    let user = token("user_a");
    let mut body = note_body("Draft");
    body["tags"] = json!(["work"]);
    let (_, created) = create(&app, &user, body).await;
    let uri = format!("/api/notes/{}", created["note"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app.router,
        request(Method::PUT, &uri, Some(&user), Some(json!({ "title": "Final" }))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note updated successfully");
    assert_eq!(body["note"]["title"], "Final");
    assert_eq!(body["note"]["content"], created["note"]["content"]);
    assert_eq!(body["note"]["tags"], json!(["work"]));
    assert_eq!(body["note"]["createdAt"], created["note"]["createdAt"]);
}

fn timestamp(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn update_stamps_a_later_updated_at() {
    let app = setup();
    let user = token("user_a");
    let (_, created) = create(&app, &user, note_body("Draft")).await;
    let uri = format!("/api/notes/{}", created["note"]["id"].as_str().unwrap());

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let (status, body) = send(
        &app.router,
        request(Method::PUT, &uri, Some(&user), Some(json!({ "title": "Final" }))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["createdAt"], created["note"]["createdAt"]);
    assert!(timestamp(&body["note"]["updatedAt"]) > timestamp(&created["note"]["updatedAt"]));
}

#[tokio::test]
async fn update_validates_present_fields() {
    let app = setup();
    let user = token("user_a");
    let (_, created) = create(&app, &user, note_body("Draft")).await;
    let uri = format!("/api/notes/{}", created["note"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app.router,
        request(Method::PUT, &uri, Some(&user), Some(json!({ "tags": "solo" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Tags must be an array");

    let (status, body) = send(&app.router, request(Method::PUT, &uri, Some(&user), Some(json!({})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Empty JSON body received");
}

#[tokio::test]
async fn deleting_twice_is_not_found_the_second_time() {
    let app = setup();
    let user = token("user_a");
    let (_, created) = create(&app, &user, note_body("Temporary")).await;
    let uri = format!("/api/notes/{}", created["note"]["id"].as_str().unwrap());

    let (status, body) = send(&app.router, request(Method::DELETE, &uri, Some(&user), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note deleted successfully");

    for _ in 0..2 {
        let (status, _) = send(&app.router, request(Method::DELETE, &uri, Some(&user), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = setup();
    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/notes/not-a-uuid", Some(&token("user_a")), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid ID format");
}

#[tokio::test]
async fn title_length_boundary() {
    let app = setup();
    let user = token("user_a");

    let (status, _) = create(&app, &user, note_body(&"a".repeat(200))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create(&app, &user, note_body(&"a".repeat(201))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert!(body["message"].as_str().unwrap().contains("200"));
}

#[tokio::test]
async fn empty_body_creates_nothing() {
    let app = setup();
    let user = token("user_a");

    let (status, body) = create(&app, &user, json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Empty JSON body received");
    assert_eq!(note_count(&app, &user).await, 0);
}

#[tokio::test]
async fn missing_fields_are_reported() {
    let app = setup();
    let (status, body) = create(&app, &token("user_a"), json!({ "title": "Only a title" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title, content, and date are required");
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn requests_without_valid_tokens_are_unauthorized() {
    let app = setup();

    let (status, body) = send(&app.router, request(Method::GET, "/api/notes", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token provided");

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/notes", Some("garbage"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/notes", Some(&sign(&claims(None))), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token payload");
}

#[tokio::test]
async fn mistyped_profile_metadata_still_authenticates() {
    let app = setup();
    let claims = json!({
        "sub": "user_a",
        "exp": Utc::now().timestamp() + 3600,
        "publicMetadata": { "isCanceled": "false", "subscriptionTier": 1, "theme": "dark" },
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET),
    )
    .unwrap();

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/notes", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, _) = create(&app, &token, note_body("still counted as free")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = setup();
    let req = Request::builder()
        .method(Method::GET)
        .uri("/api/notes")
        .header(header::COOKIE, format!("__session={}", token("user_a")))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() {
    let app = setup();
    let (status, body) = send(&app.router, request(Method::GET, "/api/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Route /api/nope not found");
}

#[tokio::test]
async fn root_answers_without_auth() {
    let app = setup();
    let (status, body) = send(&app.router, request(Method::GET, "/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "hello");
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

async fn fill_to_limit(app: &TestApp, sub: &str) {
    let user = token(sub);
    for i in 0..10 {
        let (status, _) = create(app, &user, note_body(&format!("note {i}"))).await;
        assert_eq!(status, StatusCode::CREATED, "note {i} should fit the free tier");
    }
}

#[tokio::test]
async fn free_tier_stops_at_ten_notes() {
    let app = setup();
    fill_to_limit(&app, "user_free").await;

    let (status, body) = create(&app, &token("user_free"), note_body("eleventh")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], true);
    assert_eq!(
        body["message"],
        "Note limit reached. Upgrade to Premium for unlimited notes."
    );
    assert_eq!(note_count(&app, &token("user_free")).await, 10);
}

#[tokio::test]
async fn canceled_premium_writes_until_the_period_ends() {
    let app = setup();
    fill_to_limit(&app, "user_p").await;

    let paid_through = premium_token("user_p", Some(Utc::now() + Duration::hours(1)));
    let (status, _) = create(&app, &paid_through, note_body("eleventh")).await;
    assert_eq!(status, StatusCode::CREATED);

    let lapsed = premium_token("user_p", Some(Utc::now() - Duration::hours(1)));
    let (status, _) = create(&app, &lapsed, note_body("twelfth")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn legacy_plan_claim_is_unlimited() {
    let app = setup();
    fill_to_limit(&app, "user_legacy").await;

    let mut claims = claims(Some("user_legacy"));
    claims.pla = Some("u:premium".into());
    let (status, _) = create(&app, &sign(&claims), note_body("eleventh")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn quota_does_not_block_reads_or_updates() {
    let app = setup();
    fill_to_limit(&app, "user_free").await;
    let user = token("user_free");

    let (_, listed) = send(&app.router, request(Method::GET, "/api/notes", Some(&user), None)).await;
    let uri = format!("/api/notes/{}", listed["notes"][0]["id"].as_str().unwrap());
    let (status, _) = send(
        &app.router,
        request(Method::PUT, &uri, Some(&user), Some(json!({ "content": "edited" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

fn webhook_request(body: &Value, secret: &str) -> Request<Body> {
    let payload = body.to_string();
    let timestamp = Utc::now().timestamp();
    let signature = WebhookVerifier::new(secret)
        .unwrap()
        .sign("msg_test", timestamp, payload.as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/clerk")
        .header(header::CONTENT_TYPE, "application/json")
        .header("svix-id", "msg_test")
        .header("svix-timestamp", timestamp.to_string())
        .header("svix-signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

#[tokio::test]
async fn cancellation_webhook_keeps_premium_until_period_end() {
    let app = setup();
    app.directory.insert_user(
        "user_w",
        json!({ "subscriptionTier": "premium", "isCanceled": false, "nickname": "w" }),
    );
    let period_end: i64 = 1_767_225_600;
    let event = json!({
        "type": "subscription.canceled",
        "data": { "user_id": "user_w", "current_period_end": period_end },
    });

    let (status, body) = send(&app.router, webhook_request(&event, WEBHOOK_SECRET)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Webhook processed successfully");
    let bag = app.directory.metadata("user_w").unwrap();
    let profile = ProfileMetadata::from_bag(&bag).unwrap();
    assert_eq!(
        profile.subscription_end_date,
        Utc.timestamp_opt(period_end, 0).single()
    );
    assert!(profile.is_canceled());
    assert_eq!(profile.tier(), SubscriptionTier::Premium);
    assert_eq!(bag["nickname"], "w");
}

#[tokio::test]
async fn premium_activation_webhook_updates_the_profile() {
    let app = setup();
    app.directory.insert_user("user_w", json!({}));
    let event = json!({
        "type": "subscription.created",
        "data": { "user_id": "user_w", "status": "active", "plan": { "name": "Premium" } },
    });

    let (status, _) = send(&app.router, webhook_request(&event, WEBHOOK_SECRET)).await;

    assert_eq!(status, StatusCode::OK);
    let profile = ProfileMetadata::from_bag(&app.directory.metadata("user_w").unwrap()).unwrap();
    assert_eq!(profile.tier(), SubscriptionTier::Premium);
    assert!(!profile.is_canceled());
    assert!(profile.subscription_end_date.unwrap() > Utc::now());
}

#[tokio::test]
async fn webhooks_with_bad_signatures_are_rejected() {
    let app = setup();
    app.directory.insert_user("user_w", json!({ "subscriptionTier": "premium" }));
    let event = json!({ "type": "subscription.deleted", "data": { "user_id": "user_w" } });

    let (status, body) = send(
        &app.router,
        webhook_request(&event, "whsec_c2VjcmV0LWE="),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Error verifying webhook");
    assert_eq!(app.directory.metadata("user_w").unwrap()["subscriptionTier"], "premium");
}

#[tokio::test]
async fn webhooks_need_headers_and_a_secret() {
    let app = setup();
    let (status, body) = send(
        &app.router,
        request(Method::POST, "/api/webhooks/clerk", None, Some(json!({ "type": "x" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing svix headers");

    let unconfigured = setup_with(Arc::new(MemoryNoteStore::new()), RouterOptions::default(), None);
    let event = json!({ "type": "subscription.deleted", "data": { "user_id": "user_w" } });
    let (status, body) = send(&unconfigured.router, webhook_request(&event, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Webhook secret not configured");
}

#[tokio::test]
async fn unknown_webhook_types_are_acknowledged() {
    let app = setup();
    let event = json!({ "type": "user.updated", "data": { "id": "user_w" } });
    let (status, _) = send(&app.router, webhook_request(&event, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reconciliation_failures_are_bad_requests() {
    let app = setup();
    let event = json!({ "type": "subscription.deleted", "data": { "user_id": "user_unknown" } });
    let (status, body) = send(&app.router, webhook_request(&event, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Webhook processing failed");
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_routes_manage_the_callers_subscription() {
    let app = setup();
    app.directory.insert_user("user_a", json!({ "theme": "dark" }));
    let user = token("user_a");

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/admin/check-subscription", Some(&user), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscriptionTier"], "free");
    assert_eq!(body["data"]["noteLimit"], 10);

    let (status, body) = send(
        &app.router,
        request(Method::POST, "/api/admin/cancel-subscription", Some(&user), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No active premium subscription to cancel");

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/api/admin/update-subscription",
            Some(&user),
            Some(json!({ "subscriptionType": "premium" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscriptionTier"], "premium");
    assert_eq!(body["data"]["hasUnrestrictedAccess"], true);

    let (status, body) = send(
        &app.router,
        request(Method::POST, "/api/admin/cancel-subscription", Some(&user), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCanceled"], true);
    assert_eq!(body["data"]["hasUnrestrictedAccess"], true);
    assert_eq!(app.directory.metadata("user_a").unwrap()["theme"], "dark");

    let (status, _) = send(
        &app.router,
        request(
            Method::POST,
            "/api/admin/update-subscription",
            Some(&user),
            Some(json!({ "subscriptionType": "gold" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_a_token_and_the_flag() {
    let app = setup();
    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/admin/check-subscription", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let locked = setup_with(
        Arc::new(MemoryNoteStore::new()),
        RouterOptions::default(),
        Some(WEBHOOK_SECRET),
    );
    let (status, _) = send(
        &locked.router,
        request(Method::GET, "/api/admin/check-subscription", Some(&token("user_a")), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Store failures
// ---------------------------------------------------------------------------

struct BrokenStore;

#[async_trait]
impl NoteStore for BrokenStore {
    async fn insert(&self, _: Note) -> Result<Note, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn find_by_owner(&self, _: &str) -> Result<Vec<Note>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn find_one(&self, _: &str, _: Uuid) -> Result<Option<Note>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn update(
        &self,
        _: &str,
        _: Uuid,
        _: &NoteChanges,
        _: DateTime<Utc>,
    ) -> Result<Option<Note>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn delete(&self, _: &str, _: Uuid) -> Result<Option<Note>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn count_by_owner(&self, _: &str) -> Result<i64, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }
}

#[tokio::test]
async fn store_failures_are_generic_500s() {
    let app = setup_with(Arc::new(BrokenStore), RouterOptions::default(), None);
    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/notes", Some(&token("user_a")), None),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Something went wrong");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn development_mode_exposes_failure_details() {
    let app = setup_with(
        Arc::new(BrokenStore),
        RouterOptions {
            development: true,
            ..Default::default()
        },
        None,
    );
    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/notes", Some(&token("user_a")), None),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Something went wrong");
    assert!(body["details"].as_str().unwrap().contains("Database error"));
}
