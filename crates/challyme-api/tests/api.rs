//! End-to-end tests: drive the full router in-process against an in-memory
//! database and a scratch upload directory.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use challyme_api::{AppStateInner, Storage, router};
use challyme_db::Database;

struct TestApp {
    router: Router,
    upload_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

impl TestApp {
    async fn new() -> Self {
        let upload_dir = std::env::temp_dir().join(format!("challyme_api_test_{}", Uuid::new_v4()));
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage: Storage::new(upload_dir.clone()).await.unwrap(),
            jwt_secret: "integration-test-secret".into(),
        });
        Self {
            router: router(state),
            upload_dir,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/register",
                None,
                Some(json!({ "username": username, "password": "correct-horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a challenge starting today and returns its id.
    async fn create_challenge(&self, token: &str, creator: &str, duration: u32) -> String {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let (status, body) = self
            .post(
                "/create-challenge",
                token,
                json!({
                    "title": "Morning run",
                    "duration": duration,
                    "startDate": today,
                    "username": creator,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["challenge"]["id"].as_str().unwrap().to_string()
    }

    /// `inviter` invites `invitee` who accepts.
    async fn join(&self, cid: &str, inviter: (&str, &str), invitee: (&str, &str)) {
        let (status, body) = self
            .post(
                "/send-invite",
                inviter.1,
                json!({ "challengeId": cid, "invitedBy": inviter.0, "invitedUser": invitee.0 }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let (status, body) = self
            .post("/accept-invite", invitee.1, json!({ "username": invitee.0, "challengeId": cid }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    async fn upload(
        &self,
        token: &str,
        cid: &str,
        username: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        self.upload_for_day(token, cid, username, "1", content_type, data).await
    }

    async fn upload_for_day(
        &self,
        token: &str,
        cid: &str,
        username: &str,
        day: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let boundary = "challyme-test-boundary";
        let mut body = Vec::new();
        for (name, value) in [("challengeId", cid), ("username", username), ("day", day)] {
            body.extend_from_slice(
                format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"proof.png\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/upload-challenge-image")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }
}

#[tokio::test]
async fn register_and_login() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/register",
            None,
            Some(json!({ "username": "alice", "password": "another-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "alice", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, body) = app
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new().await;
    let (status, _) = app.call(Method::GET, "/challenges?username=alice", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/challenges?username=alice", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cannot_act_as_someone_else() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;

    let (status, _) = app.get("/challenges?username=bob", &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/send-friend-request", &alice, json!({ "fromUser": "bob", "toUser": "alice" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn confirm_once_per_day_until_complete() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let cid = app.create_challenge(&alice, "alice", 1).await;

    let (status, body) = app
        .post("/confirm", &alice, json!({ "username": "alice", "challengeId": cid }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["days"], 1);
    assert_eq!(body["points"], 10);
    assert_eq!(body["completed"], true);

    let (status, body) = app
        .post("/confirm", &alice, json!({ "username": "alice", "challengeId": cid }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, list) = app.get("/challenges?username=alice", &alice).await;
    assert_eq!(list[0]["streaks"][0]["days"], 1);
    assert_eq!(list[0]["completed"], true);
}

#[tokio::test]
async fn invalid_challenges_are_rejected() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let (status, _) = app
        .post(
            "/create-challenge",
            &alice,
            json!({
                "title": "Run",
                "duration": 0,
                "startDate": "2024-01-01",
                "username": "alice",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/create-challenge",
            &alice,
            json!({ "title": "Run", "duration": 5, "startDate": "someday", "username": "alice" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/confirm", &alice, json!({ "username": "alice", "challengeId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn poke_is_gated_on_both_confirmations() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let cid = app.create_challenge(&alice, "alice", 30).await;
    app.join(&cid, ("alice", &alice), ("bob", &bob)).await;

    let poke = json!({ "username": "alice", "friend": "bob", "challengeId": cid });

    // alice hasn't confirmed yet
    let (status, _) = app.post("/poke", &alice, poke.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.post("/confirm", &alice, json!({ "username": "alice", "challengeId": cid })).await;
    let (status, body) = app.post("/poke", &alice, poke.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // nothing to nag about once bob has confirmed
    app.post("/confirm", &bob, json!({ "username": "bob", "challengeId": cid })).await;
    let (status, _) = app.post("/poke", &alice, poke).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, list) = app.get("/challenges?username=bob", &bob).await;
    assert_eq!(list[0]["pokes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn friend_requests_resolve_once() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let (status, _) = app
        .post("/send-friend-request", &alice, json!({ "fromUser": "alice", "toUser": "bob" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // duplicate, and the reverse direction, are both refused
    let (status, _) = app
        .post("/send-friend-request", &alice, json!({ "fromUser": "alice", "toUser": "bob" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/send-friend-request", &bob, json!({ "fromUser": "bob", "toUser": "alice" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, friends) = app.get("/friends?username=bob", &bob).await;
    assert_eq!(friends["friendRequests"], json!(["alice"]));

    let accept = json!({ "username": "bob", "friend": "alice" });
    let (status, _) = app.post("/accept-friend-request", &bob, accept.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/accept-friend-request", &bob, accept).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, friends) = app.get("/friends?username=alice", &alice).await;
    assert_eq!(friends["friends"], json!(["bob"]));
    let (_, friends) = app.get("/friends?username=bob", &bob).await;
    assert_eq!(friends["friends"], json!(["alice"]));
    assert_eq!(friends["friendRequests"], json!([]));

    let (status, _) = app
        .post("/send-friend-request", &alice, json!({ "fromUser": "alice", "toUser": "nobody" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invites_show_up_and_admit_once() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let cid = app.create_challenge(&alice, "alice", 30).await;

    let invite = json!({ "challengeId": cid, "invitedBy": "alice", "invitedUser": "bob" });
    let (status, _) = app.post("/send-invite", &alice, invite.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/send-invite", &alice, invite.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, notices) = app.get("/notifications?username=bob", &bob).await;
    assert_eq!(notices[0]["type"], "invite");
    assert_eq!(notices[0]["from"], "alice");

    let answer = json!({ "username": "bob", "challengeId": cid });
    let (status, _) = app.post("/accept-invite", &bob, answer.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/accept-invite", &bob, answer.clone()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post("/reject-invite", &bob, answer).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = app.get("/challenges?username=bob", &bob).await;
    assert_eq!(list[0]["participants"], json!(["alice", "bob"]));
    assert_eq!(list[0]["streaks"].as_array().unwrap().len(), 2);

    // already in: a fresh invite is a conflict
    let (status, _) = app.post("/send-invite", &alice, invite).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missed_day_notice_clears_after_confirm() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let cid = app.create_challenge(&alice, "alice", 30).await;

    let ask = json!({ "username": "alice", "challengeId": cid });
    let (status, body) = app.post("/notify-missed-day", &alice, ask.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["type"], "missed_day");
    assert_eq!(body["notification"]["day"], 1);

    app.post("/confirm", &alice, ask.clone()).await;

    let (_, body) = app.post("/notify-missed-day", &alice, ask).await;
    assert!(body.get("notification").is_none());
    assert!(body["message"].is_string());
    let (_, notices) = app.get("/notifications?username=alice", &alice).await;
    assert_eq!(notices, json!([]));
}

#[tokio::test]
async fn chat_is_for_participants() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let mallory = app.register("mallory").await;
    let cid = app.create_challenge(&alice, "alice", 30).await;

    let (status, _) = app
        .post(
            "/send-challenge-message",
            &alice,
            json!({ "challengeId": cid, "username": "alice", "content": "Day one done!" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/send-challenge-message",
            &mallory,
            json!({ "challengeId": cid, "username": "mallory", "content": "hi" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/send-challenge-message",
            &alice,
            json!({ "challengeId": cid, "username": "alice", "content": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, messages) = app.get(&format!("/challenge-messages?challengeId={cid}"), &alice).await;
    assert_eq!(messages.as_array().unwrap().len(), 1);
    assert_eq!(messages[0]["content"], "Day one done!");
}

#[tokio::test]
async fn image_upload_checks_size_and_type() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let cid = app.create_challenge(&alice, "alice", 30).await;

    let (status, body) = app.upload(&alice, &cid, "alice", "image/png", b"\x89PNG fake").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let file_ref = body["fileRef"].as_str().unwrap().to_string();
    assert!(file_ref.ends_with(".png"));
    assert!(app.upload_dir.join(&file_ref).exists());

    let too_big = vec![0u8; 6 * 1024 * 1024];
    let (status, _) = app.upload(&alice, &cid, "alice", "image/png", &too_big).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // rejected before anything reached the disk
    assert_eq!(std::fs::read_dir(&app.upload_dir).unwrap().count(), 1);

    let (status, _) = app.upload(&alice, &cid, "alice", "text/plain", b"hello").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(&app.upload_dir).unwrap().count(), 1);

    let (_, images) = app.get(&format!("/challenge-images?challengeId={cid}"), &alice).await;
    assert_eq!(images.as_array().unwrap().len(), 1);
    assert_eq!(images[0]["fileRef"], file_ref.as_str());
    assert_eq!(images[0]["day"], 1);

    let (status, _) = app.call(Method::GET, &format!("/uploads/{file_ref}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn leaving_and_deleting() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let carol = app.register("carol").await;
    let cid = app.create_challenge(&alice, "alice", 30).await;
    app.join(&cid, ("alice", &alice), ("bob", &bob)).await;

    let (status, body) = app.upload(&bob, &cid, "bob", "image/jpeg", b"jpeg").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let bobs_file = app.upload_dir.join(body["fileRef"].as_str().unwrap());

    // bob leaves and takes his image with him
    let (status, _) = app
        .call(
            Method::DELETE,
            "/delete-challenge",
            Some(&bob),
            Some(json!({ "challengeId": cid, "username": "bob" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!bobs_file.exists());
    let (_, list) = app.get("/challenges?username=alice", &alice).await;
    assert_eq!(list[0]["participants"], json!(["alice"]));
    assert_eq!(list[0]["images"], json!([]));

    // a pending invite dies with the challenge
    app.post(
        "/send-invite",
        &alice,
        json!({ "challengeId": cid, "invitedBy": "alice", "invitedUser": "carol" }),
    )
    .await;
    let (status, _) = app
        .call(
            Method::DELETE,
            "/delete-challenge",
            Some(&alice),
            Some(json!({ "challengeId": cid, "username": "alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app.get("/challenges?username=alice", &alice).await;
    assert_eq!(list, json!([]));
    let (_, notices) = app.get("/notifications?username=carol", &carol).await;
    assert_eq!(notices, json!([]));
    let (status, _) = app
        .post("/accept-invite", &carol, json!({ "username": "carol", "challengeId": cid }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unparsable_day_falls_back_to_one() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let cid = app.create_challenge(&alice, "alice", 30).await;

    for day in ["two", "0", "-3"] {
        let (status, body) =
            app.upload_for_day(&alice, &cid, "alice", day, "image/png", b"png").await;
        assert_eq!(status, StatusCode::OK, "{day}: {body}");
    }
    let (status, _) = app.upload_for_day(&alice, &cid, "alice", "3", "image/png", b"png").await;
    assert_eq!(status, StatusCode::OK);

    let (_, images) = app.get(&format!("/challenge-images?challengeId={cid}"), &alice).await;
    let days: Vec<u64> = images
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["day"].as_u64().unwrap())
        .collect();
    assert_eq!(days, vec![1, 1, 1, 3]);
}

fn confirm_request(token: &str, username: &str, cid: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/confirm")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "username": username, "challengeId": cid }).to_string()))
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_confirms_lose_no_updates() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let cid = app.create_challenge(&alice, "alice", 30).await;

    let mut members = vec![("alice".to_string(), alice.clone())];
    for i in 0..5 {
        let name = format!("runner{i}");
        let token = app.register(&name).await;
        app.join(&cid, ("alice", &alice), (&name, &token)).await;
        members.push((name, token));
    }

    let handles: Vec<_> = members
        .iter()
        .map(|(name, token)| {
            let router = app.router.clone();
            let req = confirm_request(token, name, &cid);
            tokio::spawn(async move { router.oneshot(req).await.unwrap().status() })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let (_, list) = app.get("/challenges?username=alice", &alice).await;
    let streaks = list[0]["streaks"].as_array().unwrap();
    assert_eq!(streaks.len(), members.len());
    for streak in streaks {
        assert_eq!(streak["days"], 1, "{streak}");
    }
}
