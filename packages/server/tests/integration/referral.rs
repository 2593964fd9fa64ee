use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn admin_creates_code_stored_uppercase() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::REFERRAL_CODES,
            &json!({"code": "earlybird", "discount_percent": 20, "max_uses": 50}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["code"], "EARLYBIRD");
    assert_eq!(res.body["used_count"], 0);
    assert_eq!(res.body["is_active"], true);

    let public = app
        .get_without_token(&routes::referral_code("EarlyBird"))
        .await;
    assert_eq!(public.status, 200, "{}", public.text);
    assert_eq!(public.body["discount_percent"], 20);
    assert!(public.body.get("used_count").is_none());
}

#[tokio::test]
async fn duplicate_code_is_a_conflict() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let body = json!({"code": "EARLYBIRD", "discount_percent": 20});

    let first = app.post_with_token(routes::REFERRAL_CODES, &body, &admin).await;
    assert_eq!(first.status, 201);

    let again = app
        .post_with_token(
            routes::REFERRAL_CODES,
            &json!({"code": "earlybird", "discount_percent": 10}),
            &admin,
        )
        .await;
    assert_eq!(again.status, 409);
}

#[tokio::test]
async fn unusable_codes_look_missing() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    for body in [
        json!({"code": "RETIRED", "discount_percent": 10, "is_active": false}),
        json!({"code": "EXPIRED", "discount_percent": 10, "expires_at": Utc::now() - Duration::days(1)}),
    ] {
        let res = app.post_with_token(routes::REFERRAL_CODES, &body, &admin).await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    for code in ["RETIRED", "EXPIRED", "NEVER-MADE"] {
        let res = app.get_without_token(&routes::referral_code(code)).await;
        assert_eq!(res.status, 404, "{code} should not be visible");
    }
}

#[tokio::test]
async fn rejects_bad_discount_and_non_admins() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

    let bad = app
        .post_with_token(
            routes::REFERRAL_CODES,
            &json!({"code": "FREE", "discount_percent": 101}),
            &admin,
        )
        .await;
    assert_eq!(bad.status, 400);

    let denied = app
        .post_with_token(
            routes::REFERRAL_CODES,
            &json!({"code": "MINE", "discount_percent": 50}),
            &ana,
        )
        .await;
    assert_eq!(denied.status, 403);
}
