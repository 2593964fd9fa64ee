use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn admin_creates_competition_with_uppercase_code() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let body = app.create_competition(&admin, "ptc", 150_000).await;

    assert_eq!(body["code"], "PTC");
    assert_eq!(body["current_phase"], "registration");
    assert_eq!(body["registration_is_open"], true);

    let fetched = app.get_without_token(&routes::competition("ptc")).await;
    assert_eq!(fetched.status, 200, "{}", fetched.text);
    assert_eq!(fetched.body["id"], body["id"]);
}

#[tokio::test]
async fn duplicate_code_is_a_conflict() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_competition(&admin, "PTC", 0).await;

    let res = app
        .post_with_token(
            routes::COMPETITIONS,
            &json!({
                "code": "ptc",
                "name": "Again",
                "registration_fee": 0,
                "min_team_size": 1,
                "max_team_size": 3,
            }),
            &admin,
        )
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
}

#[tokio::test]
async fn participants_cannot_create_competitions() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

    let res = app
        .post_with_token(
            routes::COMPETITIONS,
            &json!({
                "code": "PTC",
                "name": "ProtoTech",
                "registration_fee": 0,
                "min_team_size": 1,
                "max_team_size": 3,
            }),
            &token,
        )
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn schedule_must_be_increasing() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let now = Utc::now();

    let res = app
        .post_with_token(
            routes::COMPETITIONS,
            &json!({
                "code": "PTC",
                "name": "ProtoTech",
                "registration_fee": 0,
                "min_team_size": 1,
                "max_team_size": 3,
                "registration_close": now + Duration::days(7),
                "preliminary_close": now + Duration::days(1),
            }),
            &admin,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn inactive_competitions_are_hidden() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let created = app.create_competition(&admin, "PTC", 0).await;
    app.create_competition(&admin, "BCC", 0).await;
    let id = created["id"].as_i64().unwrap();

    let res = app
        .patch_with_token(&routes::competition(id), &json!({"is_active": false}), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["is_active"], false);

    let list = app.get_without_token(routes::COMPETITIONS).await;
    let codes: Vec<_> = list.body.as_array().unwrap().iter().map(|c| c["code"].clone()).collect();
    assert_eq!(codes, vec![json!("BCC")]);

    let res = app.get_without_token(&routes::competition("PTC")).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn update_can_clear_a_schedule_boundary() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let created = app.create_competition(&admin, "PTC", 0).await;
    let id = created["id"].as_i64().unwrap();

    let res = app
        .patch_with_token(
            &routes::competition(id),
            &json!({"final_close": null, "name": "ProtoTech Contest 2025"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body["final_close"].is_null());
    assert!(!res.body["semifinal_close"].is_null());
    assert_eq!(res.body["name"], "ProtoTech Contest 2025");
}

#[tokio::test]
async fn update_rechecks_team_bounds_against_stored_values() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let created = app.create_competition(&admin, "PTC", 0).await;
    let id = created["id"].as_i64().unwrap();

    // Stored max is 3.
    let res = app
        .patch_with_token(&routes::competition(id), &json!({"min_team_size": 4}), &admin)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}
