//! End-to-end REST tests against a server bound to an ephemeral port.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{Value, json};

use vote_gateway::api::build_app;
use vote_gateway::app_state::AppState;
use vote_gateway::config::GatewayConfig;
use vote_gateway::domain::IdentityMode;
use vote_gateway::persistence::MemoryStore;

struct TestApp {
    base: String,
    client: reqwest::Client,
}

async fn spawn_app(mode: IdentityMode) -> TestApp {
    let config = GatewayConfig {
        voter_identity_mode: mode,
        ..GatewayConfig::default()
    };
    let state = AppState::new(Arc::new(MemoryStore::new()), &config);
    let app = build_app(state, Duration::from_secs(5));

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestApp {
        base: base_url(addr),
        client: reqwest::Client::new(),
    }
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let Ok(resp) = req.send().await else {
            panic!("request failed");
        };
        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn create_event(&self, admin: &str, start_offset_h: i64, end_offset_h: i64) -> Value {
        let now = Utc::now();
        let body = json!({
            "name": "Championship Final",
            "description": "Who takes the cup?",
            "teams": [{ "name": "A", "color": "#FF0000" }, { "name": "B" }],
            "start_date": now + chrono::Duration::hours(start_offset_h),
            "end_date": now + chrono::Duration::hours(end_offset_h),
        });
        let (status, event) = self
            .send(
                self.client
                    .post(self.url("/api/v1/admin/events"))
                    .header("x-admin-id", admin)
                    .json(&body),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {event}");
        event
    }

    async fn login(&self, name: &str, email: Option<&str>) -> String {
        let (status, body) = self
            .send(
                self.client
                    .post(self.url("/api/v1/voters/login"))
                    .json(&json!({ "name": name, "email": email })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        let Some(id) = body["voter"]["id"].as_str() else {
            panic!("voter id missing: {body}");
        };
        id.to_string()
    }

    async fn vote(&self, voter: &str, event_id: &str, team: &str) -> (StatusCode, Value) {
        self.send(
            self.client
                .post(self.url(&format!("/api/v1/voter/events/{event_id}/vote")))
                .header("x-voter-id", voter)
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .json(&json!({ "team": team })),
        )
        .await
    }
}

fn admin_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn id_of(value: &Value) -> String {
    let Some(id) = value["id"].as_str() else {
        panic!("id missing: {value}");
    };
    id.to_string()
}

#[tokio::test]
async fn vote_flow_from_creation_to_results() {
    let app = spawn_app(IdentityMode::NameOnly).await;
    let admin = admin_id();
    let event = app.create_event(&admin, -1, 1).await;
    let event_id = id_of(&event);

    let v1 = app.login("Voter One", None).await;
    let v2 = app.login("Voter Two", None).await;
    let v3 = app.login("Voter Three", None).await;

    for (voter, team) in [(&v1, "A"), (&v2, "A"), (&v3, "B")] {
        let (status, body) = app.vote(voter, &event_id, team).await;
        assert_eq!(status, StatusCode::CREATED, "vote failed: {body}");
        assert_eq!(body["team"], team);
    }

    let (status, stats) = app
        .send(app.client.get(app.url(&format!("/api/v1/events/{event_id}/results"))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_votes"], 3);
    assert_eq!(stats["teams"][0]["name"], "A");
    assert_eq!(stats["teams"][0]["votes"], 2);
    assert_eq!(stats["teams"][0]["percentage"], 66.67);
    assert_eq!(stats["teams"][0]["color"], "#FF0000");
    assert_eq!(stats["teams"][1]["percentage"], 33.33);

    let (status, status_body) = app
        .send(
            app.client
                .get(app.url(&format!("/api/v1/voter/events/{event_id}/vote-status")))
                .header("x-voter-id", &v3),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_body["has_voted"], true);
    assert_eq!(status_body["voted_for"], "B");

    let (_, detail) = app
        .send(
            app.client
                .get(app.url(&format!("/api/v1/admin/events/{event_id}")))
                .header("x-admin-id", &admin),
        )
        .await;
    assert_eq!(detail["event"]["total_votes"], 3);
    assert_eq!(detail["voters"].as_array().map(Vec::len), Some(3));

    let Some(slug) = event["voting_slug"].as_str() else {
        panic!("slug missing");
    };
    let (status, public) = app
        .send(app.client.get(app.url(&format!("/api/v1/public/events/{slug}/results"))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["event"]["is_open"], true);
    assert_eq!(public["stats"]["total_votes"], 3);
    assert!(public["event"].get("created_by").is_none());
}

#[tokio::test]
async fn second_vote_is_rejected_with_previous_choice() {
    let app = spawn_app(IdentityMode::NameOnly).await;
    let event_id = id_of(&app.create_event(&admin_id(), -1, 1).await);
    let voter = app.login("Voter One", None).await;

    let (status, _) = app.vote(&voter, &event_id, "B").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.vote(&voter, &event_id, "A").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2004);
    assert_eq!(body["error"]["details"]["voted_for"], "B");
    assert_eq!(body["error"]["message"], "you already voted for B");
}

#[tokio::test]
async fn concurrent_votes_admit_exactly_one() {
    let app = Arc::new(spawn_app(IdentityMode::NameOnly).await);
    let event_id = id_of(&app.create_event(&admin_id(), -1, 1).await);
    let voter = app.login("Voter One", None).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let app = Arc::clone(&app);
        let voter = voter.clone();
        let event_id = event_id.clone();
        let team = if i % 2 == 0 { "A" } else { "B" };
        handles.push(tokio::spawn(async move {
            app.vote(&voter, &event_id, team).await.0
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await {
            Ok(StatusCode::CREATED) => created += 1,
            Ok(StatusCode::CONFLICT) => conflicts += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 9);

    let (_, stats) = app
        .send(app.client.get(app.url(&format!("/api/v1/events/{event_id}/results"))))
        .await;
    assert_eq!(stats["total_votes"], 1);
}

#[tokio::test]
async fn closed_events_and_bad_teams_are_rejected() {
    let app = spawn_app(IdentityMode::NameOnly).await;
    let admin = admin_id();
    let ended = id_of(&app.create_event(&admin, -3, -1).await);
    let open = id_of(&app.create_event(&admin, -1, 1).await);
    let voter = app.login("Voter One", None).await;

    let (status, body) = app.vote(&voter, &ended, "A").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2003);

    let (status, body) = app.vote(&voter, &open, "Z").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], 1002);

    let (_, stats) = app
        .send(app.client.get(app.url(&format!("/api/v1/events/{ended}/results"))))
        .await;
    assert_eq!(stats["total_votes"], 0);
}

#[tokio::test]
async fn identity_headers_are_required() {
    let app = spawn_app(IdentityMode::NameOnly).await;
    let (status, body) = app
        .send(app.client.get(app.url("/api/v1/voter/history")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 1401);

    let (status, _) = app
        .send(
            app.client
                .get(app.url("/api/v1/admin/dashboard"))
                .header("x-admin-id", "not-a-uuid"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admins_only_see_their_own_events() {
    let app = spawn_app(IdentityMode::NameOnly).await;
    let owner = admin_id();
    let event_id = id_of(&app.create_event(&owner, -1, 1).await);

    let (status, _) = app
        .send(
            app.client
                .get(app.url(&format!("/api/v1/admin/events/{event_id}")))
                .header("x-admin-id", admin_id()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = app
        .send(
            app.client
                .get(app.url("/api/v1/admin/events?page=1&per_page=10"))
                .header("x-admin-id", &owner),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pagination"]["total"], 1);
}

#[tokio::test]
async fn delete_removes_event_and_votes() {
    let app = spawn_app(IdentityMode::NameOnly).await;
    let admin = admin_id();
    let event_id = id_of(&app.create_event(&admin, -1, 1).await);
    let voter = app.login("Voter One", None).await;
    let _ = app.vote(&voter, &event_id, "A").await;

    let Ok(resp) = app
        .client
        .delete(app.url(&format!("/api/v1/admin/events/{event_id}")))
        .header("x-admin-id", &admin)
        .send()
        .await
    else {
        panic!("delete failed");
    };
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(app.client.get(app.url(&format!("/api/v1/events/{event_id}/results"))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history) = app
        .send(
            app.client
                .get(app.url("/api/v1/voter/history"))
                .header("x-voter-id", &voter),
        )
        .await;
    assert_eq!(history["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn deactivated_event_leaves_public_listing() {
    let app = spawn_app(IdentityMode::NameOnly).await;
    let admin = admin_id();
    let event = app.create_event(&admin, -1, 1).await;
    let event_id = id_of(&event);

    let (_, listed) = app
        .send(app.client.get(app.url("/api/v1/public/events")))
        .await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

    let (status, updated) = app
        .send(
            app.client
                .patch(app.url(&format!("/api/v1/admin/events/{event_id}/active")))
                .header("x-admin-id", &admin)
                .json(&json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);

    let (_, listed) = app
        .send(app.client.get(app.url("/api/v1/public/events")))
        .await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(0));

    let Some(slug) = event["voting_slug"].as_str() else {
        panic!("slug missing");
    };
    let (status, _) = app
        .send(app.client.get(app.url(&format!("/api/v1/public/events/{slug}"))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn email_mode_requires_admin_verification() {
    let app = spawn_app(IdentityMode::VerifiedEmail).await;
    let admin = admin_id();
    let event_id = id_of(&app.create_event(&admin, -1, 1).await);
    let voter = app.login("Jane Doe", Some("jane@example.com")).await;

    let (status, body) = app.vote(&voter, &event_id, "A").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], 1403);

    let (status, verified) = app
        .send(
            app.client
                .patch(app.url(&format!("/api/v1/admin/voters/{voter}/verify")))
                .header("x-admin-id", &admin)
                .json(&json!({ "is_verified": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["is_verified"], true);

    let (status, _) = app.vote(&voter, &event_id, "A").await;
    assert_eq!(status, StatusCode::CREATED);
}
