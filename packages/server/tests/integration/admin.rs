use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use server::entity::transaction_detail;

use crate::common::{PDF_BYTES, TestApp, routes};

mod verification {
    use super::*;

    #[tokio::test]
    async fn approval_requires_a_payment_proof_when_money_is_due() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 150_000).await;
        let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let id = app.register_team(&token, "PTC", "ana@itb.ac.id").await;

        let res = app
            .post_with_token(&routes::admin_approve(id), &json!({}), &admin)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn free_registrations_can_be_approved_without_proof() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 0).await;
        let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let id = app.register_team(&token, "PTC", "ana@itb.ac.id").await;

        let res = app
            .post_with_token(&routes::admin_approve(id), &json!({}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "approved");
    }

    #[tokio::test]
    async fn approval_records_a_transaction_once() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 150_000).await;
        let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let id = app
            .approved_registration(&admin, &token, "PTC", "ana@itb.ac.id")
            .await;

        let again = app
            .post_with_token(&routes::admin_approve(id), &json!({}), &admin)
            .await;
        assert_eq!(again.status, 409);

        let rows = transaction_detail::Entity::find()
            .filter(transaction_detail::Column::RegistrationId.eq(id))
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 150_000);

        let detail = app
            .get_with_token(&routes::admin_registration(id), &admin)
            .await;
        assert_eq!(detail.status, 200);
        assert_eq!(detail.body["status"], "approved");
        assert!(detail.body["verified_by"].is_number());
        assert!(!detail.body["verified_at"].is_null());
    }

    #[tokio::test]
    async fn rejection_stores_the_reason_and_is_final() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 150_000).await;
        let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let id = app.register_team(&token, "PTC", "ana@itb.ac.id").await;

        let res = app
            .post_with_token(
                &routes::admin_reject(id),
                &json!({"reason": "Payment proof is unreadable"}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "rejected");

        let own = app.get_with_token(&routes::registration(id), &token).await;
        assert_eq!(own.body["rejection_reason"], "Payment proof is unreadable");

        let approve = app
            .post_with_token(&routes::admin_approve(id), &json!({}), &admin)
            .await;
        assert_eq!(approve.status, 409);

        let none = transaction_detail::Entity::find()
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn rejection_needs_a_reason() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 0).await;
        let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let id = app.register_team(&token, "PTC", "ana@itb.ac.id").await;

        let res = app
            .post_with_token(&routes::admin_reject(id), &json!({"reason": "  "}), &admin)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn only_approved_registrations_can_qualify() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 0).await;
        let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let budi = app.create_authenticated_user("budi@itb.ac.id", "Budi").await;
        let pending = app.register_team(&ana, "PTC", "ana@itb.ac.id").await;
        let approved = app
            .approved_registration(&admin, &budi, "PTC", "budi@itb.ac.id")
            .await;

        let res = app
            .post_with_token(&routes::admin_qualify(pending), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 409);

        let res = app
            .post_with_token(&routes::admin_qualify(approved), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["qualified"], true);
    }

    #[tokio::test]
    async fn participants_cannot_verify() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 0).await;
        let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let id = app.register_team(&token, "PTC", "ana@itb.ac.id").await;

        let res = app
            .post_with_token(&routes::admin_approve(id), &json!({}), &token)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let res = app.get_with_token(routes::ADMIN_REGISTRATIONS, &token).await;
        assert_eq!(res.status, 403);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn filters_by_status_competition_and_team_name() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 0).await;
        app.create_competition(&admin, "BCC", 0).await;
        let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let budi = app.create_authenticated_user("budi@itb.ac.id", "Budi").await;
        app.approved_registration(&admin, &ana, "PTC", "ana@itb.ac.id")
            .await;
        app.register_team(&budi, "PTC", "budi@itb.ac.id").await;
        app.register_team(&ana, "BCC", "ana@itb.ac.id").await;

        let all = app.get_with_token(routes::ADMIN_REGISTRATIONS, &admin).await;
        assert_eq!(all.status, 200, "{}", all.text);
        assert_eq!(all.body["pagination"]["total"], 3);

        let ptc = app
            .get_with_token(
                &format!("{}?competition=ptc", routes::ADMIN_REGISTRATIONS),
                &admin,
            )
            .await;
        assert_eq!(ptc.body["pagination"]["total"], 2);
        assert!(
            ptc.body["data"]
                .as_array()
                .unwrap()
                .iter()
                .all(|r| r["competition_code"] == "PTC")
        );

        let pending = app
            .get_with_token(
                &format!("{}?status=pending&competition=PTC", routes::ADMIN_REGISTRATIONS),
                &admin,
            )
            .await;
        assert_eq!(pending.body["pagination"]["total"], 1);
        assert_eq!(pending.body["data"][0]["leader_email"], "budi@itb.ac.id");

        let search = app
            .get_with_token(
                &format!("{}?search=beast", routes::ADMIN_REGISTRATIONS),
                &admin,
            )
            .await;
        assert_eq!(search.body["pagination"]["total"], 3);

        let none = app
            .get_with_token(
                &format!("{}?search=%25", routes::ADMIN_REGISTRATIONS),
                &admin,
            )
            .await;
        assert_eq!(none.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn pagination_is_clamped() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .get_with_token(
                &format!("{}?page=0&per_page=1000", routes::ADMIN_REGISTRATIONS),
                &admin,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["page"], 1);
        assert_eq!(res.body["pagination"]["per_page"], 100);
    }

    #[tokio::test]
    async fn detail_includes_submissions() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 0).await;
        let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let id = app
            .approved_registration(&admin, &token, "PTC", "ana@itb.ac.id")
            .await;
        let res = app
            .upload_with_token(
                &routes::registration_submissions(id),
                "abstract.pdf",
                "application/pdf",
                PDF_BYTES,
                &[("kind", "abstract")],
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let detail = app
            .get_with_token(&routes::admin_registration(id), &admin)
            .await;

        assert_eq!(detail.status, 200);
        assert_eq!(detail.body["leader_email"], "ana@itb.ac.id");
        assert_eq!(detail.body["submissions"][0]["kind"], "abstract");
    }
}

mod finance {
    use super::*;

    #[tokio::test]
    async fn summary_splits_approved_revenue_from_pending_amounts() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 150_000).await;
        let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let budi = app.create_authenticated_user("budi@itb.ac.id", "Budi").await;
        app.approved_registration(&admin, &ana, "PTC", "ana@itb.ac.id")
            .await;
        app.register_team(&budi, "PTC", "budi@itb.ac.id").await;

        let finance = app.create_user_with_role("fin@itb.ac.id", "finance").await;
        let res = app.get_with_token(routes::ADMIN_FINANCE, &finance).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let line = &res.body["competitions"][0];
        assert_eq!(line["label"], "PTC");
        assert_eq!(line["approved"], 1);
        assert_eq!(line["pending"], 1);
        assert_eq!(line["approved_revenue"], 150_000);
        assert_eq!(line["pending_amount"], 150_000);
        assert_eq!(res.body["totals"]["registrations"], 2);
    }

    #[tokio::test]
    async fn finance_role_cannot_approve() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_competition(&admin, "PTC", 0).await;
        let token = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
        let id = app.register_team(&token, "PTC", "ana@itb.ac.id").await;
        let finance = app.create_user_with_role("fin@itb.ac.id", "finance").await;

        let res = app
            .post_with_token(&routes::admin_approve(id), &json!({}), &finance)
            .await;

        assert_eq!(res.status, 403);
    }
}
