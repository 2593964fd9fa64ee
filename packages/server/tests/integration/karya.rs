use chrono::{Duration, Utc};
use serde_json::{Value, json};

use crate::common::{TestApp, routes};

async fn create_karya(app: &TestApp, admin: &str, title: &str) -> i32 {
    let res = app
        .post_with_token(
            routes::KARYA,
            &json!({"title": title, "team_name": "Binary Beasts", "description": "A prototype."}),
            admin,
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["votes"], 0);
    res.id()
}

#[tokio::test]
async fn list_is_public_and_sorted_by_votes() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let first = create_karya(&app, &admin, "Smart Irrigation Node").await;
    let second = create_karya(&app, &admin, "Campus Air Monitor").await;
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

    let res = app
        .post_with_token(&routes::karya_vote(second), &json!({}), &ana)
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["votes"], 1);

    let list = app.get_without_token(routes::KARYA).await;
    assert_eq!(list.status, 200);
    let ids: Vec<Value> = list
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(second), json!(first)]);
    assert_eq!(list.body[0]["votes"], 1);
}

#[tokio::test]
async fn each_account_votes_once_in_total() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let first = create_karya(&app, &admin, "Smart Irrigation Node").await;
    let second = create_karya(&app, &admin, "Campus Air Monitor").await;
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

    let res = app
        .post_with_token(&routes::karya_vote(first), &json!({}), &ana)
        .await;
    assert_eq!(res.status, 201);

    for id in [first, second] {
        let res = app
            .post_with_token(&routes::karya_vote(id), &json!({}), &ana)
            .await;
        assert_eq!(res.status, 409);
    }
}

#[tokio::test]
async fn votes_outside_the_window_are_rejected() {
    let app = TestApp::spawn_with(|c| {
        c.voting.closes_at = Some(Utc::now() - Duration::hours(1));
    })
    .await;
    let admin = app.admin_token().await;
    let id = create_karya(&app, &admin, "Smart Irrigation Node").await;
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

    let res = app
        .post_with_token(&routes::karya_vote(id), &json!({}), &ana)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn voting_requires_an_account_and_an_existing_entry() {
    let app = TestApp::spawn().await;
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

    let anonymous = app
        .post_without_token(&routes::karya_vote(1), &json!({}))
        .await;
    assert_eq!(anonymous.status, 401);

    let missing = app
        .post_with_token(&routes::karya_vote(9999), &json!({}), &ana)
        .await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn only_managers_add_entries() {
    let app = TestApp::spawn().await;
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

    let res = app
        .post_with_token(
            routes::KARYA,
            &json!({"title": "Mine", "team_name": "Solo"}),
            &ana,
        )
        .await;

    assert_eq!(res.status, 403);
}
