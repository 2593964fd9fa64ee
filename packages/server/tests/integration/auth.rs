use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use server::entity::activate_token;

use crate::common::{PASSWORD, TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_with_valid_details() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "Ana@ITB.ac.id", "name": "Ana", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["email"], "ana@itb.ac.id");
        assert_eq!(res.body["is_active"], true);
    }

    #[tokio::test]
    async fn cannot_register_the_same_email_twice_in_any_case() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": " ANA@itb.ac.id ", "name": "Ana 2", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn rejects_malformed_email_and_short_password() {
        let app = TestApp::spawn().await;

        let bad_email = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "not-an-email", "name": "Ana", "password": PASSWORD}),
            )
            .await;
        assert_eq!(bad_email.status, 400);
        assert_eq!(bad_email.body["code"], "VALIDATION_ERROR");

        let short = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "ana@itb.ac.id", "name": "Ana", "password": "short"}),
            )
            .await;
        assert_eq!(short.status, 400);
        assert_eq!(short.body["code"], "VALIDATION_ERROR");
    }
}

mod activation {
    use super::*;

    async fn register_inactive(app: &TestApp) -> i32 {
        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "ana@itb.ac.id", "name": "Ana", "password": PASSWORD}),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["is_active"], false);
        res.id()
    }

    async fn token_for(app: &TestApp, user_id: i32) -> String {
        activate_token::Entity::find()
            .filter(activate_token::Column::UserId.eq(user_id))
            .one(&app.db)
            .await
            .unwrap()
            .expect("activation token should exist")
            .token
    }

    #[tokio::test]
    async fn inactive_account_cannot_log_in_until_activated() {
        let app = TestApp::spawn_with(|c| c.auth.require_activation = true).await;
        let user_id = register_inactive(&app).await;

        let login = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ana@itb.ac.id", "password": PASSWORD}),
            )
            .await;
        assert_eq!(login.status, 403);
        assert_eq!(login.body["code"], "ACCOUNT_INACTIVE");

        let token = token_for(&app, user_id).await;
        let res = app
            .post_without_token(routes::ACTIVATE, &json!({"token": token}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_active"], true);

        app.login("ana@itb.ac.id", PASSWORD).await;
    }

    #[tokio::test]
    async fn activation_token_is_single_use() {
        let app = TestApp::spawn_with(|c| c.auth.require_activation = true).await;
        let user_id = register_inactive(&app).await;
        let token = token_for(&app, user_id).await;

        let first = app
            .post_without_token(routes::ACTIVATE, &json!({"token": token}))
            .await;
        assert_eq!(first.status, 200);

        let second = app
            .post_without_token(routes::ACTIVATE, &json!({"token": token}))
            .await;
        assert_eq!(second.status, 400);
        assert_eq!(second.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::ACTIVATE, &json!({"token": "deadbeef"}))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("ana@itb.ac.id", "Ana").await;

        let wrong = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ana@itb.ac.id", "password": "wrong-password"}),
            )
            .await;
        let unknown = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nobody@itb.ac.id", "password": PASSWORD}),
            )
            .await;

        assert_eq!(wrong.status, 401);
        assert_eq!(unknown.status, 401);
        assert_eq!(wrong.body["code"], "INVALID_CREDENTIALS");
        assert_eq!(wrong.body, unknown.body);
    }

    #[tokio::test]
    async fn me_reports_role_and_permissions() {
        let app = TestApp::spawn().await;
        let participant = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let admin = app.admin_token().await;

        let me = app.get_with_token(routes::ME, &participant).await;
        assert_eq!(me.status, 200, "{}", me.text);
        assert_eq!(me.body["role"], "participant");
        assert_eq!(me.body["permissions"], json!([]));

        let me = app.get_with_token(routes::ME, &admin).await;
        assert_eq!(me.body["role"], "admin");
        let permissions = me.body["permissions"].as_array().unwrap();
        assert!(permissions.contains(&json!("registration:verify")));
    }

    #[tokio::test]
    async fn me_requires_a_valid_token() {
        let app = TestApp::spawn().await;

        let missing = app.get_without_token(routes::ME).await;
        assert_eq!(missing.status, 401);
        assert_eq!(missing.body["code"], "TOKEN_MISSING");

        let invalid = app.get_with_token(routes::ME, "not-a-jwt").await;
        assert_eq!(invalid.status, 401);
        assert_eq!(invalid.body["code"], "TOKEN_INVALID");
    }
}

mod rate_limit {
    use super::*;

    #[tokio::test]
    async fn login_attempts_beyond_the_bucket_are_rejected() {
        let app = TestApp::spawn_with(|c| {
            c.rate_limit.capacity = 2;
            c.rate_limit.refill_per_second = 0.001;
        })
        .await;
        let body = json!({"email": "nobody@itb.ac.id", "password": PASSWORD});

        for _ in 0..2 {
            let res = app.post_without_token(routes::LOGIN, &body).await;
            assert_eq!(res.status, 401);
        }

        let res = app.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 429);
        assert_eq!(res.body["code"], "RATE_LIMITED");
        assert!(res.headers.contains_key("retry-after"));
    }

    #[tokio::test]
    async fn health_is_never_rate_limited() {
        let app = TestApp::spawn_with(|c| {
            c.rate_limit.capacity = 1;
            c.rate_limit.refill_per_second = 0.001;
        })
        .await;

        for _ in 0..3 {
            let res = app.get_without_token(routes::HEALTH).await;
            assert_eq!(res.status, 200);
            assert_eq!(res.body["database"], "ok");
        }
    }
}
