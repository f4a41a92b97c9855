//! Integration tests for the link API
//!
//! These tests drive the full router (auth middleware, handlers, redb
//! storage) with `oneshot` requests against a throwaway database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use ledgerly::database::{init_db, AppState};
use ledgerly::middleware::TokenAuth;
use ledgerly::model::User;
use ledgerly::route::create_app;

struct TestApp {
    app: axum::Router,
    auth: TokenAuth,
    _temp_db: NamedTempFile,
}

impl TestApp {
    fn new() -> Self {
        let temp_db = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_db.path().to_str().unwrap();
        let db = init_db(db_path).expect("Failed to initialize test database");
        let auth = TokenAuth::new("test-secret");
        let state = AppState::new(db, auth.clone());

        Self {
            app: create_app(state),
            auth,
            _temp_db: temp_db,
        }
    }

    fn token(&self, user_id: &str) -> String {
        let user = User {
            id: user_id.to_string(),
            username: format!("{user_id}-name"),
            avatar: format!("https://avatars.example/{user_id}.png"),
            email: String::new(),
        };
        self.auth.issue(&user, 1).unwrap()
    }

    async fn send(&self, method: &str, uri: &str, user_id: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token(user_id)));
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Failed to parse JSON")
        };
        (status, value)
    }

    async fn create(&self, user_id: &str, body: Value) -> Value {
        let (status, link) = self.send("POST", "/api/links", user_id, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {link}");
        link
    }
}

fn titles(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|link| link["title"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_create_link_success() {
    let app = TestApp::new();

    let link = app
        .create(
            "alice",
            json!({
                "title": "Rust",
                "url": "https://www.rust-lang.org",
                "category": "Development",
                "tags": ["lang", "systems"],
                "pricing": "Free"
            }),
        )
        .await;

    assert_eq!(link["title"], "Rust");
    assert_eq!(link["category"], "Development");
    assert_eq!(link["user"], "alice");
    assert_eq!(link["clicks"], 0);
    assert_eq!(link["isPublic"], true);
    assert_eq!(link["isOfficial"], false);
    assert_eq!(link["starredBy"], json!([]));
    assert!(link["id"].as_str().is_some());
}

#[tokio::test]
async fn test_create_link_invalid_category_defaults_to_other() {
    let app = TestApp::new();

    let link = app
        .create("alice", json!({ "title": "X", "url": "https://x.dev", "category": "Gardening" }))
        .await;
    assert_eq!(link["category"], "Other");

    let link = app
        .create("alice", json!({ "title": "Y", "url": "https://y.dev" }))
        .await;
    assert_eq!(link["category"], "Other");
}

#[tokio::test]
async fn test_create_link_missing_fields() {
    let app = TestApp::new();

    let (status, body) = app
        .send("POST", "/api/links", "alice", Some(json!({ "title": "  ", "url": "https://x.dev" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (status, _) = app
        .send("POST", "/api/links", "alice", Some(json!({ "title": "X" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparseable_body_uses_error_shape() {
    let app = TestApp::new();

    let (status, body) = app
        .send("POST", "/api/links", "alice", Some(json!({ "title": null, "url": "https://x.dev" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert!(body["message"].as_str().is_some());

    let request = Request::builder()
        .method("POST")
        .uri("/api/links/import")
        .header("authorization", format!("Bearer {}", app.token("alice")))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn test_create_link_duplicate_url() {
    let app = TestApp::new();

    let first = app
        .create("alice", json!({ "title": "X", "url": "https://foo.com" }))
        .await;

    let (status, body) = app
        .send(
            "POST",
            "/api/links",
            "alice",
            Some(json!({ "title": "X again", "url": "https://foo.com/" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DuplicateUrl");
    assert_eq!(body["existingLink"]["id"], first["id"]);
    assert_eq!(body["existingLink"]["title"], "X");
    assert_eq!(body["existingLink"]["url"], "https://foo.com");

    // Same URL under another owner is fine
    app.create("bob", json!({ "title": "X", "url": "HTTPS://WWW.foo.com/" }))
        .await;
}

#[tokio::test]
async fn test_create_link_starred_on_create() {
    let app = TestApp::new();

    let link = app
        .create("alice", json!({ "title": "X", "url": "https://x.dev", "isStarred": true }))
        .await;
    assert_eq!(link["starredBy"], json!(["alice"]));

    let (_, starred) = app.send("GET", "/api/links/starred", "alice", None).await;
    assert_eq!(titles(&starred), vec!["X"]);
}

#[tokio::test]
async fn test_list_public_populates_owner() {
    let app = TestApp::new();

    app.create("alice", json!({ "title": "Public", "url": "https://a.dev" }))
        .await;
    app.create("alice", json!({ "title": "Private", "url": "https://b.dev", "isPublic": false }))
        .await;

    let (status, body) = app.send("GET", "/api/links", "bob", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Public"]);
    assert_eq!(body[0]["user"]["username"], "alice-name");
    assert_eq!(body[0]["user"]["avatar"], "https://avatars.example/alice.png");
    assert_eq!(body[0]["isStarred"], false);
}

#[tokio::test]
async fn test_list_public_orders_by_clicks_then_recency() {
    let app = TestApp::new();

    let old = app
        .create("alice", json!({ "title": "Old", "url": "https://old.dev" }))
        .await;
    app.create("alice", json!({ "title": "New", "url": "https://new.dev" }))
        .await;

    let uri = format!("/api/links/{}/click", old["id"].as_str().unwrap());
    let (status, _) = app.send("POST", &uri, "bob", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send("GET", "/api/links", "bob", None).await;
    assert_eq!(titles(&body), vec!["Old", "New"]);

    let (_, body) = app.send("GET", "/api/links/community", "bob", None).await;
    assert_eq!(titles(&body), vec!["New", "Old"]);
    assert_eq!(body[0]["user"]["username"], "alice-name");
}

#[tokio::test]
async fn test_list_my_links() {
    let app = TestApp::new();

    app.create("alice", json!({ "title": "First", "url": "https://1.dev" }))
        .await;
    app.create("alice", json!({ "title": "Second", "url": "https://2.dev", "isPublic": false }))
        .await;
    app.create("bob", json!({ "title": "Bob's", "url": "https://3.dev" }))
        .await;

    let (status, body) = app.send("GET", "/api/links/my-links", "alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Second", "First"]);
    assert_eq!(body[0]["user"], "alice");
}

#[tokio::test]
async fn test_trending_excludes_viewer() {
    let app = TestApp::new();

    for i in 1..=5 {
        app.create(
            "alice",
            json!({ "title": format!("Link {i}"), "url": format!("https://l{i}.dev") }),
        )
        .await;
    }

    let (_, body) = app.send("GET", "/api/links/trending", "alice", None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (_, body) = app.send("GET", "/api/links/trending", "bob", None).await;
    assert_eq!(titles(&body), vec!["Link 5", "Link 4", "Link 3"]);
}

#[tokio::test]
async fn test_toggle_star_round_trip() {
    let app = TestApp::new();

    let link = app
        .create("alice", json!({ "title": "X", "url": "https://x.dev" }))
        .await;
    let uri = format!("/api/links/{}/star", link["id"].as_str().unwrap());

    let (status, body) = app.send("PUT", &uri, "bob", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isStarred"], true);
    assert_eq!(body["starredBy"], json!(["bob"]));

    // Bob's star is invisible to alice
    let (_, mine) = app.send("GET", "/api/links/my-links", "alice", None).await;
    assert_eq!(mine[0]["isStarred"], false);
    let (_, starred) = app.send("GET", "/api/links/starred", "alice", None).await;
    assert!(starred.as_array().unwrap().is_empty());

    let (_, body) = app.send("PUT", &uri, "bob", None).await;
    assert_eq!(body["isStarred"], false);
    assert_eq!(body["starredBy"], json!([]));
}

#[tokio::test]
async fn test_toggle_star_by_owner_mirrors_legacy_flag() {
    let app = TestApp::new();

    let link = app
        .create("alice", json!({ "title": "X", "url": "https://x.dev" }))
        .await;
    let id = link["id"].as_str().unwrap();

    let (_, body) = app
        .send("PUT", &format!("/api/links/{id}/star"), "alice", None)
        .await;
    assert_eq!(body["isStarred"], true);

    let (_, starred) = app.send("GET", "/api/links/starred", "alice", None).await;
    assert_eq!(titles(&starred), vec!["X"]);
}

#[tokio::test]
async fn test_toggle_star_not_found() {
    let app = TestApp::new();

    let (status, body) = app
        .send("PUT", "/api/links/does-not-exist/star", "alice", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_update_link_partial() {
    let app = TestApp::new();

    let link = app
        .create(
            "alice",
            json!({ "title": "X", "url": "https://x.dev", "tags": ["keep"], "category": "Design" }),
        )
        .await;
    let uri = format!("/api/links/{}", link["id"].as_str().unwrap());

    let (status, body) = app
        .send("PUT", &uri, "alice", Some(json!({ "title": "Renamed", "isPublic": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["isPublic"], false);
    assert_eq!(body["tags"], json!(["keep"]));
    assert_eq!(body["category"], "Design");
    assert_eq!(body["url"], "https://x.dev");
}

#[tokio::test]
async fn test_update_does_not_recheck_duplicates() {
    let app = TestApp::new();

    app.create("alice", json!({ "title": "A", "url": "https://a.dev" }))
        .await;
    let second = app
        .create("alice", json!({ "title": "B", "url": "https://b.dev" }))
        .await;

    let uri = format!("/api/links/{}", second["id"].as_str().unwrap());
    let (status, body) = app
        .send("PUT", &uri, "alice", Some(json!({ "url": "https://a.dev/" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://a.dev/");
}

#[tokio::test]
async fn test_update_link_by_non_owner() {
    let app = TestApp::new();

    let link = app
        .create("alice", json!({ "title": "X", "url": "https://x.dev" }))
        .await;
    let uri = format!("/api/links/{}", link["id"].as_str().unwrap());

    let (status, body) = app
        .send("PUT", &uri, "mallory", Some(json!({ "title": "Pwned" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotOwner");

    let (_, mine) = app.send("GET", "/api/links/my-links", "alice", None).await;
    assert_eq!(titles(&mine), vec!["X"]);
}

#[tokio::test]
async fn test_update_link_not_found() {
    let app = TestApp::new();

    let (status, _) = app
        .send("PUT", "/api/links/nope", "alice", Some(json!({ "title": "Y" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_link() {
    let app = TestApp::new();

    let link = app
        .create("alice", json!({ "title": "X", "url": "https://x.dev" }))
        .await;
    let id = link["id"].as_str().unwrap();
    let uri = format!("/api/links/{id}");

    let (status, _) = app.send("DELETE", &uri, "mallory", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send("DELETE", &uri, "alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedId"], id);

    let (status, _) = app.send("DELETE", &uri, "alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The URL can be saved again once the old link is gone
    app.create("alice", json!({ "title": "X", "url": "https://x.dev" }))
        .await;
}

#[tokio::test]
async fn test_register_click_not_found() {
    let app = TestApp::new();

    let (status, _) = app
        .send("POST", "/api/links/missing/click", "alice", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clicks_are_all_counted() {
    let app = TestApp::new();

    let link = app
        .create("alice", json!({ "title": "X", "url": "https://x.dev" }))
        .await;
    let uri = format!("/api/links/{}/click", link["id"].as_str().unwrap());
    let token = app.token("bob");

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let router = app.app.clone();
        let uri = uri.clone();
        let token = token.clone();
        tasks.push(tokio::spawn(async move {
            router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .header("authorization", format!("Bearer {token}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap()
                .status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let (_, mine) = app.send("GET", "/api/links/my-links", "alice", None).await;
    assert_eq!(mine[0]["clicks"], 20);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();

    let response = app
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
