//! Integration tests for the video request backend.

use std::sync::Arc;

use reqwest::multipart::Form;
use reqwest::{redirect, Client};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

const ADMIN_KEY: &str = "test-admin-key";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_admin_key(Some(ADMIN_KEY.to_string())).await
    }

    async fn with_admin_key(admin_key: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let config = Config {
            admin_key,
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_json: false,
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and return the user id taken from the redirect.
    async fn login(&self, name: &str, email: &str) -> String {
        let resp = self
            .client
            .post(self.url("/users/login"))
            .form(&[("author_name", name), ("author_email", email)])
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 303);
        let location = resp.headers()["location"].to_str().unwrap().to_string();
        location
            .strip_prefix("/?id=")
            .expect("redirect to the board")
            .to_string()
    }

    async fn submit(&self, form: Form) -> reqwest::Response {
        self.client
            .post(self.url("/video-request"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    async fn create(&self, title: &str) -> Value {
        let form = Form::new()
            .text("topic_title", title.to_string())
            .text("topic_details", format!("Details about {}", title));
        let resp = self.submit(form).await;
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    async fn vote(&self, id: &str, vote_type: &str, user_id: &str) -> reqwest::Response {
        self.client
            .put(self.url("/video-request/vote"))
            .json(&json!({ "id": id, "vote_type": vote_type, "user_id": user_id }))
            .send()
            .await
            .unwrap()
    }
}

fn titles(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|r| r["topic_title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_create_with_author() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.login("Ada Lovelace", "ada@example.com").await;

    let form = Form::new()
        .text("topic_title", "Error handling in Rust")
        .text("topic_details", "When to use thiserror vs anyhow")
        .text("expected_result", "A decision checklist")
        .text("target_level", "medium")
        .text("author_id", user_id.clone());
    let resp = fixture.submit(form).await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["topic_title"], "Error handling in Rust");
    assert_eq!(body["author_id"], user_id.as_str());
    assert_eq!(body["author_name"], "Ada Lovelace");
    assert_eq!(body["author_email"], "ada@example.com");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["target_level"], "medium");
    assert!(body["submit_date"].is_string());
    assert_eq!(body["votes"], json!({ "ups": [], "downs": [] }));

    // Stored document matches the response
    let id = body["id"].as_str().unwrap();
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/video-request/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 200);
    let stored: Value = get_resp.json().await.unwrap();
    assert_eq!(stored["author_name"], "Ada Lovelace");
    assert_eq!(stored["submit_date"], body["submit_date"]);
}

#[tokio::test]
async fn test_create_without_author() {
    let fixture = TestFixture::new().await;

    let form = Form::new()
        .text("topic_title", "Iterators")
        .text("topic_details", "Adapters and laziness")
        .text("author_id", "");
    let resp = fixture.submit(form).await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("author_name").is_none());
    assert_eq!(body["target_level"], "beginner");
}

#[tokio::test]
async fn test_create_validation_errors() {
    let fixture = TestFixture::new().await;

    // Missing title
    let resp = fixture
        .submit(Form::new().text("topic_details", "details"))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Title too long
    let resp = fixture
        .submit(
            Form::new()
                .text("topic_title", "x".repeat(101))
                .text("topic_details", "details"),
        )
        .await;
    assert_eq!(resp.status(), 400);

    // Unknown author
    let resp = fixture
        .submit(
            Form::new()
                .text("topic_title", "Title")
                .text("topic_details", "details")
                .text("author_id", "no-such-user"),
        )
        .await;
    assert_eq!(resp.status(), 400);

    // Nothing was stored
    let list: Value = fixture
        .client
        .get(fixture.url("/video-request"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_order_and_limit() {
    let fixture = TestFixture::new().await;
    for title in ["Oldest", "Middle", "Newest"] {
        fixture.create(title).await;
    }

    let list: Value = fixture
        .client
        .get(fixture.url("/video-request?sortBy=newlyAdded&searchKey="))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&list), vec!["Newest", "Middle", "Oldest"]);

    let limited: Value = fixture
        .client
        .get(fixture.url("/video-request?limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&limited), vec!["Newest", "Middle"]);
}

#[tokio::test]
async fn test_search_case_insensitive() {
    let fixture = TestFixture::new().await;
    fixture.create("Borrow checker deep dive").await;
    fixture.create("Tokio runtime internals").await;
    fixture.create("The BORROW trait").await;

    let found: Value = fixture
        .client
        .get(fixture.url("/video-request?searchKey=borrow"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        titles(&found),
        vec!["The BORROW trait", "Borrow checker deep dive"]
    );
}

#[tokio::test]
async fn test_vote_toggle() {
    let fixture = TestFixture::new().await;
    let created = fixture.create("Vote on me").await;
    let id = created["id"].as_str().unwrap();

    let resp = fixture.vote(id, "ups", "alice").await;
    assert_eq!(resp.status(), 200);
    let tally: Value = resp.json().await.unwrap();
    assert_eq!(tally, json!({ "id": id, "ups": 1, "downs": 0, "score": 1 }));

    // Switching direction drops the up vote
    let tally: Value = fixture.vote(id, "downs", "alice").await.json().await.unwrap();
    assert_eq!(tally["ups"], 0);
    assert_eq!(tally["downs"], 1);
    assert_eq!(tally["score"], -1);

    // Same direction again removes the vote
    let tally: Value = fixture.vote(id, "downs", "alice").await.json().await.unwrap();
    assert_eq!(tally["score"], 0);

    fixture.vote(id, "ups", "bob").await;
    let stored: Value = fixture
        .client
        .get(fixture.url(&format!("/video-request/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["votes"], json!({ "ups": ["bob"], "downs": [] }));
}

#[tokio::test]
async fn test_vote_errors() {
    let fixture = TestFixture::new().await;
    let created = fixture.create("Needs a voter").await;
    let id = created["id"].as_str().unwrap();

    let resp = fixture.vote(id, "ups", "  ").await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let resp = fixture.vote("missing", "ups", "alice").await;
    assert_eq!(resp.status(), 404);
}

/// Assert a response carries the error envelope with the given status and code.
async fn assert_error(resp: reqwest::Response, status: u16, code: &str) {
    assert_eq!(resp.status(), status);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], code);
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_malformed_input_uses_error_envelope() {
    let fixture = TestFixture::new().await;
    let created = fixture.create("Strict input").await;
    let id = created["id"].as_str().unwrap();

    // Unknown vote type
    let resp = fixture.vote(id, "sideways", "alice").await;
    assert_error(resp, 400, "VALIDATION_ERROR").await;

    // Body that is not JSON at all
    let resp = fixture
        .client
        .put(fixture.url("/video-request/vote"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_error(resp, 400, "BAD_REQUEST").await;

    // Unknown sort order and empty limit
    for query in ["?sortBy=bogus", "?limit=", "?limit=-1"] {
        let resp = fixture
            .client
            .get(fixture.url(&format!("/video-request{}", query)))
            .send()
            .await
            .unwrap();
        assert_error(resp, 400, "VALIDATION_ERROR").await;
    }

    let resp = fixture
        .client
        .get(fixture.url("/video-request/cards?sortBy=bogus"))
        .send()
        .await
        .unwrap();
    assert_error(resp, 400, "VALIDATION_ERROR").await;

    // Unknown status on the admin update
    let resp = fixture
        .client
        .put(fixture.url(&format!("/video-request/{}", id)))
        .header("x-api-key", ADMIN_KEY)
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_error(resp, 400, "VALIDATION_ERROR").await;
}

#[tokio::test]
async fn test_search_non_ascii_title() {
    let fixture = TestFixture::new().await;
    fixture.create("École de Rust").await;
    fixture.create("Ecole without accent").await;

    let resp = fixture
        .client
        .get(fixture.url("/video-request"))
        .query(&[("searchKey", "éCOLE")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let list: Value = resp.json().await.unwrap();
    assert_eq!(titles(&list), vec!["École de Rust"]);
}

#[tokio::test]
async fn test_top_voted_sort() {
    let fixture = TestFixture::new().await;
    let popular = fixture.create("Popular").await;
    fixture.create("Ignored").await;
    let disliked = fixture.create("Disliked").await;

    let popular_id = popular["id"].as_str().unwrap();
    fixture.vote(popular_id, "ups", "a").await;
    fixture.vote(popular_id, "ups", "b").await;
    fixture
        .vote(disliked["id"].as_str().unwrap(), "downs", "a")
        .await;

    let list: Value = fixture
        .client
        .get(fixture.url("/video-request?sortBy=topVoted"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&list), vec!["Popular", "Ignored", "Disliked"]);
}

#[tokio::test]
async fn test_admin_update_requires_key() {
    let fixture = TestFixture::new().await;
    let created = fixture.create("Admin only").await;
    let url = fixture.url(&format!("/video-request/{}", created["id"].as_str().unwrap()));
    let update = json!({ "status": "done", "res_video": "https://videos.example.com/1" });

    // Without key
    let resp = fixture.client.put(&url).json(&update).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Wrong key
    let resp = fixture
        .client
        .put(&url)
        .header("x-api-key", "wrong-key")
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Bearer token
    let resp = fixture
        .client
        .put(&url)
        .bearer_auth(ADMIN_KEY)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "done");
    assert_eq!(body["video_ref"]["link"], "https://videos.example.com/1");
    assert!(body["video_ref"]["date"].is_string());

    // Reading stays public
    let resp = fixture.client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_admin_delete() {
    let fixture = TestFixture::new().await;
    let created = fixture.create("To be removed").await;
    let id = created["id"].as_str().unwrap();
    fixture.vote(id, "ups", "alice").await;
    let url = fixture.url(&format!("/video-request/{}", id));

    let resp = fixture
        .client
        .delete(&url)
        .header("x-api-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], id);

    let resp = fixture.client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .client
        .delete(&url)
        .header("x-api-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_admin_open_without_key() {
    let fixture = TestFixture::with_admin_key(None).await;
    let created = fixture.create("Open board").await;

    let resp = fixture
        .client
        .put(fixture.url(&format!("/video-request/{}", created["id"].as_str().unwrap())))
        .json(&json!({ "status": "planned" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "planned");
    assert!(body.get("video_ref").is_none());
}

#[tokio::test]
async fn test_users() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.login("Grace", "grace@example.com").await;

    // Logging in again keeps the id
    assert_eq!(fixture.login("Grace", "grace@example.com").await, user_id);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/users/{}", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["author_email"], "grace@example.com");

    let resp = fixture
        .client
        .post(fixture.url("/users/login"))
        .form(&[("author_name", "Nobody"), ("author_email", "not-an-email")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .get(fixture.url("/users/non-existent-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_board_page() {
    let fixture = TestFixture::new().await;
    fixture.create("<b>Shown escaped</b>").await;

    // Anonymous visitors get the login form
    let html = fixture
        .client
        .get(fixture.url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("login-form"));
    assert!(!html.contains("Shown escaped"));

    let user_id = fixture.login("Ada", "ada@example.com").await;
    let resp = fixture
        .client
        .get(fixture.url(&format!("/?id={}&sortBy=topVoted", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("videoRequestForm"));
    assert!(html.contains("&lt;b&gt;Shown escaped&lt;/b&gt;"));
    assert!(html.contains(r#"class="btn btn-outline-primary active" id="sortBy_TopVoted""#));

    let resp = fixture
        .client
        .get(fixture.url("/assets/app.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/javascript"));
    let script = resp.text().await.unwrap();
    // Title length is checked in code points, like the server's char count
    assert!(script.contains("[...topicTitle].length > MAX_TITLE_LENGTH"));
    assert!(script.contains(&format!(
        "const MAX_TITLE_LENGTH = {};",
        crate::models::MAX_TITLE_LENGTH
    )));
}

#[tokio::test]
async fn test_card_fragments() {
    let fixture = TestFixture::new().await;
    let created = fixture.create("Fragment").await;
    fixture.create("Other topic").await;
    let id = created["id"].as_str().unwrap();
    fixture.vote(id, "ups", "alice").await;

    let html = fixture
        .client
        .get(fixture.url("/video-request/cards?sortBy=newlyAdded&searchKey=fragment"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(&format!(r#"<h3 id="voteScore_{}">1</h3>"#, id)));
    assert!(!html.contains("Other topic"));

    let resp = fixture
        .client
        .get(fixture.url(&format!("/video-request/{}/card", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("PENDING"));

    let resp = fixture
        .client
        .get(fixture.url("/video-request/non-existent-id/card"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/video-request/non-existent-id"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
