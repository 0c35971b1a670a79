//! Integration tests for the update lifecycle endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, get_auth, post_json, stored_update, token_for};
use relflow_core::enums::UpdateStatus;
use serde_json::json;

fn submission(builds: &[&str], release: &str) -> serde_json::Value {
    json!({
        "builds": builds,
        "release": release,
        "type": "bugfix",
        "notes": "Fixes a crash",
        "bugs": [1001, 1001, 1002],
    })
}

// ---------------------------------------------------------------------------
// Create / edit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_update_returns_201_with_submitter_from_token() {
    let test = build_test_app();
    let token = token_for("alice", "packager");

    let response = post_json(
        &test.app,
        "/api/v1/updates",
        Some(&token),
        submission(&["bash-5.2-1.fc40"], "F40"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let update = &json["data"]["update"];
    assert_eq!(update["user"], "alice");
    assert_eq!(update["status"], "pending");
    assert_eq!(update["request"], "testing");
    assert_eq!(update["title"], "bash-5.2-1.fc40");
    assert_eq!(update["bugs"].as_array().unwrap().len(), 2);
    assert_eq!(update["comments"].as_array().unwrap().len(), 1);
    assert!(update["alias"].as_str().unwrap().starts_with("FEDORA-"));
    assert!(json["data"]["obsoletion"]["obsoleted"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn create_without_token_is_401() {
    let test = build_test_app();
    let response = post_json(
        &test.app,
        "/api/v1/updates",
        None,
        submission(&["bash-5.2-1.fc40"], "F40"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn create_for_unknown_release_is_404() {
    let test = build_test_app();
    let token = token_for("alice", "packager");
    let response = post_json(
        &test.app,
        "/api/v1/updates",
        Some(&token),
        submission(&["bash-5.2-1.fc40"], "F99"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_with_malformed_build_is_validation_error() {
    let test = build_test_app();
    let token = token_for("alice", "packager");
    let response = post_json(
        &test.app,
        "/api/v1/updates",
        Some(&token),
        submission(&["bash"], "F40"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_with_unknown_type_uses_error_envelope() {
    let test = build_test_app();
    let token = token_for("alice", "packager");
    let mut body = submission(&["bash-5.2-1.fc40"], "F40");
    body["type"] = json!("bogus");

    let response = post_json(&test.app, "/api/v1/updates", Some(&token), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("type"));
}

#[tokio::test]
async fn create_obsoletes_older_update_of_same_package() {
    let test = build_test_app();
    let old = test
        .store
        .seed(stored_update("FEDORA-2024-old0000001", "bash-5.2-1.fc40", "F40", "bob", 3))
        .await;
    let other_release = test
        .store
        .seed(stored_update("FEDORA-2024-old0000002", "bash-5.2-1.fc39", "F39", "bob", 3))
        .await;

    let token = token_for("alice", "packager");
    let response = post_json(
        &test.app,
        "/api/v1/updates",
        Some(&token),
        submission(&["bash-5.2-2.fc40"], "F40"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let obsoleted = json["data"]["obsoletion"]["obsoleted"].as_array().unwrap();
    assert_eq!(obsoleted.len(), 1);
    assert_eq!(obsoleted[0]["alias"], old.alias.as_str());

    let stored = test.store.all().await;
    let old_now = stored.iter().find(|u| u.id == old.id).unwrap();
    assert_eq!(old_now.status, UpdateStatus::Obsolete);
    let untouched = stored.iter().find(|u| u.id == other_release.id).unwrap();
    assert_eq!(untouched.status, UpdateStatus::Pending);
}

#[tokio::test]
async fn owner_can_edit_and_comment_lists_build_changes() {
    let test = build_test_app();
    let seeded = test
        .store
        .seed(stored_update("FEDORA-2024-edit000001", "bash-5.2-1.fc40", "F40", "alice", 1))
        .await;

    let mut body = submission(&["bash-5.2-2.fc40"], "F40");
    body["edited"] = json!(seeded.alias);
    let token = token_for("alice", "packager");
    let response = post_json(&test.app, "/api/v1/updates", Some(&token), body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let update = &json["data"]["update"];
    assert_eq!(update["alias"], seeded.alias.as_str());
    assert_eq!(update["title"], "bash-5.2-2.fc40");
    let comment = update["comments"][0]["text"].as_str().unwrap();
    assert!(comment.contains("Added build(s): bash-5.2-2.fc40"));
    assert!(comment.contains("Removed build(s): bash-5.2-1.fc40"));
}

#[tokio::test]
async fn non_owner_edit_is_403() {
    let test = build_test_app();
    let seeded = test
        .store
        .seed(stored_update("FEDORA-2024-edit000002", "bash-5.2-1.fc40", "F40", "alice", 1))
        .await;

    let mut body = submission(&["bash-5.2-2.fc40"], "F40");
    body["edited"] = json!(seeded.alias);
    let token = token_for("mallory", "packager");
    let response = post_json(&test.app, "/api/v1/updates", Some(&token), body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn editing_locked_update_is_409() {
    let test = build_test_app();
    let mut locked = stored_update("FEDORA-2024-lock000001", "bash-5.2-1.fc40", "F40", "alice", 1);
    locked.locked = true;
    let seeded = test.store.seed(locked).await;

    let mut body = submission(&["bash-5.2-2.fc40"], "F40");
    body["edited"] = json!(seeded.alias);
    let token = token_for("admin", "admin");
    let response = post_json(&test.app, "/api/v1/updates", Some(&token), body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "LOCKED_UPDATE");
}

// ---------------------------------------------------------------------------
// Request changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stable_request_without_karma_is_rejected() {
    let test = build_test_app();
    let seeded = test
        .store
        .seed(stored_update("FEDORA-2024-req0000001", "bash-5.2-1.fc40", "F40", "alice", 1))
        .await;

    let token = token_for("alice", "packager");
    let uri = format!("/api/v1/updates/{}/request", seeded.alias);
    let response = post_json(&test.app, &uri, Some(&token), json!({ "request": "stable" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "REQUIREMENT_NOT_MET");
    assert_eq!(test.store.all().await[0], seeded);
}

#[tokio::test]
async fn revoke_request_is_recorded_with_comment() {
    let test = build_test_app();
    let seeded = test
        .store
        .seed(stored_update("FEDORA-2024-req0000002", "bash-5.2-1.fc40", "F40", "alice", 1))
        .await;

    let token = token_for("alice", "packager");
    let uri = format!("/api/v1/updates/{}/request", seeded.id);
    let response = post_json(&test.app, &uri, Some(&token), json!({ "request": "revoke" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["request"], "revoke");
    assert_eq!(
        json["data"]["comments"][0]["text"],
        "alice revoked the pending request."
    );
}

#[tokio::test]
async fn request_on_locked_update_is_409() {
    let test = build_test_app();
    let mut locked = stored_update("FEDORA-2024-req0000003", "bash-5.2-1.fc40", "F40", "alice", 1);
    locked.locked = true;
    let seeded = test.store.seed(locked).await;

    let token = token_for("alice", "packager");
    let uri = format!("/api/v1/updates/{}/request", seeded.alias);
    let response = post_json(&test.app, &uri, Some(&token), json!({ "request": "stable" })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn request_on_missing_update_is_404() {
    let test = build_test_app();
    let token = token_for("alice", "packager");
    let response = post_json(
        &test.app,
        "/api/v1/updates/FEDORA-2024-missing/request",
        Some(&token),
        json!({ "request": "testing" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_update_reports_edit_permission() {
    let test = build_test_app();
    let seeded = test
        .store
        .seed(stored_update("FEDORA-2024-read000001", "bash-5.2-1.fc40", "F40", "alice", 1))
        .await;
    let uri = format!("/api/v1/updates/{}", seeded.alias);

    let anonymous = body_json(get(&test.app, &uri).await).await;
    assert_eq!(anonymous["data"]["update"]["id"], seeded.id);
    assert_eq!(anonymous["data"]["can_edit"], false);

    let owner = body_json(get_auth(&test.app, &uri, &token_for("alice", "packager")).await).await;
    assert_eq!(owner["data"]["can_edit"], true);

    let admin = body_json(get_auth(&test.app, &uri, &token_for("root", "admin")).await).await;
    assert_eq!(admin["data"]["can_edit"], true);

    let other = body_json(get_auth(&test.app, &uri, &token_for("bob", "packager")).await).await;
    assert_eq!(other["data"]["can_edit"], false);
}

#[tokio::test]
async fn get_update_by_title() {
    let test = build_test_app();
    test.store
        .seed(stored_update("FEDORA-2024-read000002", "zsh-5.9-1.fc40", "F40", "alice", 1))
        .await;
    let response = get(&test.app, "/api/v1/updates/zsh-5.9-1.fc40").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["update"]["alias"],
        "FEDORA-2024-read000002"
    );
}

#[tokio::test]
async fn edit_form_lists_options_in_reverse_registry_order() {
    let test = build_test_app();
    let seeded = test
        .store
        .seed(stored_update("FEDORA-2024-form000001", "bash-5.2-1.fc40", "F40", "alice", 1))
        .await;
    let uri = format!("/api/v1/updates/{}/edit", seeded.alias);

    let response = get_auth(&test.app, &uri, &token_for("alice", "packager")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"]["types"],
        json!(["newpackage", "security", "enhancement", "bugfix"])
    );
    assert_eq!(json["data"]["suggestions"], json!(["logout", "reboot", "unspecified"]));

    let forbidden = get_auth(&test.app, &uri, &token_for("bob", "packager")).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

async fn seed_listing(test: &common::TestApp) {
    let rows = [
        ("FEDORA-2024-list000001", "bash-5.2-1.fc40", "F40", "alice", 5),
        ("FEDORA-2024-list000002", "zsh-5.9-1.fc40", "F40", "bob", 4),
        ("FEDORA-2024-list000003", "bash-5.2-1.fc39", "F39", "alice", 3),
        ("FEDORA-2024-list000004", "vim-9.1-1.el9", "EL9", "carol", 2),
    ];
    for (alias, nvr, release, user, days_ago) in rows {
        test.store
            .seed(stored_update(alias, nvr, release, user, days_ago))
            .await;
    }
}

fn aliases(json: &serde_json::Value) -> Vec<String> {
    json["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["alias"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn list_is_newest_first_with_pagination_metadata() {
    let test = build_test_app();
    seed_listing(&test).await;

    let json = body_json(get(&test.app, "/api/v1/updates?rows_per_page=3").await).await;
    assert_eq!(
        aliases(&json),
        vec![
            "FEDORA-2024-list000004",
            "FEDORA-2024-list000003",
            "FEDORA-2024-list000002",
        ]
    );
    assert_eq!(json["data"]["total"], 4);
    assert_eq!(json["data"]["pages"], 2);

    let second = body_json(get(&test.app, "/api/v1/updates?rows_per_page=3&page=2").await).await;
    assert_eq!(aliases(&second), vec!["FEDORA-2024-list000001"]);
}

#[tokio::test]
async fn list_filters_combine_with_and() {
    let test = build_test_app();
    seed_listing(&test).await;

    let json = body_json(get(&test.app, "/api/v1/updates?packages=bash&user=alice").await).await;
    assert_eq!(
        aliases(&json),
        vec!["FEDORA-2024-list000003", "FEDORA-2024-list000001"]
    );

    let json = body_json(get(&test.app, "/api/v1/updates?releases=F39,F40&release=F40").await).await;
    assert_eq!(
        aliases(&json),
        vec!["FEDORA-2024-list000002", "FEDORA-2024-list000001"]
    );

    let json = body_json(get(&test.app, "/api/v1/updates?like=vim").await).await;
    assert_eq!(aliases(&json), vec!["FEDORA-2024-list000004"]);
}

#[tokio::test]
async fn list_rejects_invalid_parameters() {
    let test = build_test_app();

    let response = get(&test.app, "/api/v1/updates?status=bogus").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = get(&test.app, "/api/v1/updates?rows_per_page=101").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&test.app, "/api/v1/updates?page=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&test.app, "/api/v1/updates?page=abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = get(&test.app, "/api/v1/metrics?prefix=F&prefix=EL").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn list_page_far_past_the_end_is_empty() {
    let test = build_test_app();
    seed_listing(&test).await;

    let uri = format!("/api/v1/updates?page={}", i64::MAX);
    let response = get(&test.app, &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(aliases(&json).is_empty());
    assert_eq!(json["data"]["total"], 4);
    assert_eq!(json["data"]["pages"], 1);
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_count_stable_updates_per_prefixed_release() {
    let test = build_test_app();
    for (alias, nvr, release) in [
        ("FEDORA-2024-met0000001", "bash-5.2-1.fc40", "F40"),
        ("FEDORA-2024-met0000002", "zsh-5.9-1.fc40", "F40"),
        ("FEDORA-2024-met0000003", "vim-9.1-1.el9", "EL9"),
    ] {
        let mut up = stored_update(alias, nvr, release, "alice", 1);
        up.status = UpdateStatus::Stable;
        test.store.seed(up).await;
    }

    let json = body_json(get(&test.app, "/api/v1/metrics").await).await;
    assert_eq!(json["data"]["ticks"], json!([[0, "F39"], [1, "F40"]]));
    assert_eq!(json["data"]["data"][0]["label"], "Bug fixes");
    assert_eq!(json["data"]["data"][0]["data"], json!([[0, 0], [1, 2]]));

    let json = body_json(get(&test.app, "/api/v1/metrics?prefix=EL").await).await;
    assert_eq!(json["data"]["ticks"], json!([[0, "EL9"]]));
}
