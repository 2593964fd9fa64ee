use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{Value, json};
use server::entity::user;

use crate::common::{WEBHOOK_SECRET, TestApp, routes};

fn import_body(code: &str, leader_email: &str) -> Value {
    json!({
        "competition_code": code,
        "team_name": "Case Crackers",
        "leader": {"name": "Citra", "email": leader_email, "institution": "ITB"},
        "members": [{"name": "Dewi", "email": "dewi@itb.ac.id"}],
    })
}

async fn import(app: &TestApp, body: &Value, secret: &str) -> crate::common::TestResponse {
    app.post_with_headers(
        routes::IMPORT_REGISTRATION,
        body,
        &[("X-Webhook-Secret", secret)],
    )
    .await
}

#[tokio::test]
async fn import_creates_an_inactive_leader_account() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_competition(&admin, "BCC", 100_000).await;

    let res = import(&app, &import_body("bcc", "Citra@ITB.ac.id"), WEBHOOK_SECRET).await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["user_created"], true);

    let leader = user::Entity::find()
        .filter(user::Column::Email.eq("citra@itb.ac.id"))
        .one(&app.db)
        .await
        .unwrap()
        .expect("leader account should exist");
    assert!(!leader.is_active);
    assert_eq!(res.body["user_id"], leader.id);

    let id = res.body["registration_id"].as_i64().unwrap();
    let detail = app
        .get_with_token(&routes::admin_registration(id as i32), &admin)
        .await;
    assert_eq!(detail.body["source"], "import");
    assert_eq!(detail.body["amount_due"], 100_000);
    assert_eq!(detail.body["members"].as_array().unwrap().len(), 2);
    assert_eq!(detail.body["members"][0]["is_leader"], true);
}

#[tokio::test]
async fn import_attaches_to_an_existing_account() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_competition(&admin, "BCC", 0).await;
    let token = app
        .create_authenticated_user("citra@itb.ac.id", "Citra")
        .await;

    let res = import(&app, &import_body("BCC", "citra@itb.ac.id"), WEBHOOK_SECRET).await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["user_created"], false);

    let mine = app.get_with_token(routes::REGISTRATIONS, &token).await;
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
    assert_eq!(mine.body[0]["source"], "import");
}

#[tokio::test]
async fn leader_can_only_be_imported_once_per_competition() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_competition(&admin, "BCC", 0).await;
    let body = import_body("BCC", "citra@itb.ac.id");

    let first = import(&app, &body, WEBHOOK_SECRET).await;
    assert_eq!(first.status, 201);

    let second = import(&app, &body, WEBHOOK_SECRET).await;
    assert_eq!(second.status, 409);
}

#[tokio::test]
async fn secret_is_required() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_competition(&admin, "BCC", 0).await;
    let body = import_body("BCC", "citra@itb.ac.id");

    let wrong = import(&app, &body, "not-the-secret").await;
    assert_eq!(wrong.status, 401);
    assert_eq!(wrong.body["code"], "TOKEN_INVALID");

    let missing = app
        .post_without_token(routes::IMPORT_REGISTRATION, &body)
        .await;
    assert_eq!(missing.status, 401);
    assert_eq!(missing.body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn unknown_competition_is_not_found() {
    let app = TestApp::spawn().await;

    let res = import(&app, &import_body("NOPE", "citra@itb.ac.id"), WEBHOOK_SECRET).await;

    assert_eq!(res.status, 404);
}
