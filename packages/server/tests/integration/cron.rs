use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{CRON_SECRET, PDF_BYTES, TestApp, TestResponse, routes};

async fn run_cron(app: &TestApp) -> TestResponse {
    let report = app
        .post_with_token(routes::PHASE_TRANSITION, &json!({}), CRON_SECRET)
        .await;
    assert_eq!(report.status, 200, "{}", report.text);
    report
}

async fn upload_abstract(app: &TestApp, id: i32, token: &str) -> TestResponse {
    app.upload_with_token(
        &routes::registration_submissions(id),
        "abstract.pdf",
        "application/pdf",
        PDF_BYTES,
        &[("kind", "abstract")],
        token,
    )
    .await
}

#[tokio::test]
async fn closing_registration_moves_approved_teams_to_preliminary() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let created = app.create_competition(&admin, "PTC", 0).await;
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
    let budi = app.create_authenticated_user("budi@itb.ac.id", "Budi").await;
    let approved = app
        .approved_registration(&admin, &ana, "PTC", "ana@itb.ac.id")
        .await;
    let pending = app.register_team(&budi, "PTC", "budi@itb.ac.id").await;

    let id = created["id"].as_i64().unwrap();
    let res = app
        .patch_with_token(
            &routes::competition(id),
            &json!({"registration_close": Utc::now() - Duration::hours(1)}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let report = app
        .post_with_token(routes::PHASE_TRANSITION, &json!({}), CRON_SECRET)
        .await;
    assert_eq!(report.status, 200, "{}", report.text);
    assert_eq!(report.body["competitions_checked"], 1);
    assert_eq!(report.body["competitions_advanced"], 1);
    assert_eq!(report.body["registrations_promoted"], 1);

    let competition = app.get_without_token(&routes::competition("PTC")).await;
    assert_eq!(competition.body["current_phase"], "preliminary");

    let moved = app.get_with_token(&routes::registration(approved), &ana).await;
    assert_eq!(moved.body["phase"], "preliminary");
    let stayed = app.get_with_token(&routes::registration(pending), &budi).await;
    assert_eq!(stayed.body["phase"], "registration");
}

#[tokio::test]
async fn later_rounds_take_only_qualified_teams() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let created = app.create_competition(&admin, "PTC", 0).await;
    let id = created["id"].as_i64().unwrap();
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
    let budi = app.create_authenticated_user("budi@itb.ac.id", "Budi").await;
    let qualified = app
        .approved_registration(&admin, &ana, "PTC", "ana@itb.ac.id")
        .await;
    let held = app
        .approved_registration(&admin, &budi, "PTC", "budi@itb.ac.id")
        .await;

    let now = Utc::now();
    let res = app
        .patch_with_token(
            &routes::competition(id),
            &json!({"registration_close": now - Duration::hours(2)}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    let report = run_cron(&app).await;
    assert_eq!(report.body["registrations_promoted"], 2);

    let res = app
        .post_with_token(&routes::admin_qualify(qualified), &json!({}), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app
        .patch_with_token(
            &routes::competition(id),
            &json!({"preliminary_close": now - Duration::hours(1)}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    let report = run_cron(&app).await;
    assert_eq!(report.body["competitions_advanced"], 1);
    assert_eq!(report.body["registrations_promoted"], 1);

    let competition = app.get_without_token(&routes::competition("PTC")).await;
    assert_eq!(competition.body["current_phase"], "semifinal");

    let moved = app.get_with_token(&routes::registration(qualified), &ana).await;
    assert_eq!(moved.body["phase"], "semifinal");
    assert_eq!(moved.body["qualified"], false);
    let stayed = app.get_with_token(&routes::registration(held), &budi).await;
    assert_eq!(stayed.body["phase"], "preliminary");
    assert_eq!(stayed.body["qualified"], false);
}

#[tokio::test]
async fn catching_up_several_phases_moves_teams_one_step() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let created = app.create_competition(&admin, "PTC", 0).await;
    let id = created["id"].as_i64().unwrap();
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
    let budi = app.create_authenticated_user("budi@itb.ac.id", "Budi").await;
    let early = app
        .approved_registration(&admin, &ana, "PTC", "ana@itb.ac.id")
        .await;
    let plain = app
        .approved_registration(&admin, &budi, "PTC", "budi@itb.ac.id")
        .await;

    // Qualifying before the first transition does not skip the preliminary round.
    let res = app
        .post_with_token(&routes::admin_qualify(early), &json!({}), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let now = Utc::now();
    let res = app
        .patch_with_token(
            &routes::competition(id),
            &json!({
                "registration_close": now - Duration::hours(2),
                "preliminary_close": now - Duration::hours(1),
            }),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let report = run_cron(&app).await;
    assert_eq!(report.body["competitions_advanced"], 1);
    assert_eq!(report.body["registrations_promoted"], 2);

    let competition = app.get_without_token(&routes::competition("PTC")).await;
    assert_eq!(competition.body["current_phase"], "semifinal");

    for (reg, token) in [(early, &ana), (plain, &budi)] {
        let res = app.get_with_token(&routes::registration(reg), token).await;
        assert_eq!(res.body["phase"], "preliminary");
        assert_eq!(res.body["qualified"], false);
    }
}

#[tokio::test]
async fn submissions_close_with_the_team_phase() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let created = app.create_competition(&admin, "PTC", 0).await;
    let id = created["id"].as_i64().unwrap();
    let ana = app.create_authenticated_user("ana@itb.ac.id", "Ana").await;
    let budi = app.create_authenticated_user("budi@itb.ac.id", "Budi").await;
    let advancing = app
        .approved_registration(&admin, &ana, "PTC", "ana@itb.ac.id")
        .await;
    let left_behind = app
        .approved_registration(&admin, &budi, "PTC", "budi@itb.ac.id")
        .await;

    let now = Utc::now();
    app.patch_with_token(
        &routes::competition(id),
        &json!({"registration_close": now - Duration::hours(2)}),
        &admin,
    )
    .await;
    run_cron(&app).await;

    let open = upload_abstract(&app, left_behind, &budi).await;
    assert_eq!(open.status, 201, "{}", open.text);
    assert_eq!(open.body["phase"], "preliminary");

    app.post_with_token(&routes::admin_qualify(advancing), &json!({}), &admin)
        .await;
    app.patch_with_token(
        &routes::competition(id),
        &json!({"preliminary_close": now - Duration::hours(1)}),
        &admin,
    )
    .await;
    run_cron(&app).await;

    let closed = upload_abstract(&app, left_behind, &budi).await;
    assert_eq!(closed.status, 400, "{}", closed.text);

    let next_round = upload_abstract(&app, advancing, &ana).await;
    assert_eq!(next_round.status, 201, "{}", next_round.text);
    assert_eq!(next_round.body["phase"], "semifinal");
}

#[tokio::test]
async fn repeated_runs_are_idempotent() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_competition(&admin, "PTC", 0).await;

    for _ in 0..2 {
        let report = app
            .get_with_token(routes::PHASE_TRANSITION, CRON_SECRET)
            .await;
        assert_eq!(report.status, 200, "{}", report.text);
        assert_eq!(report.body["competitions_advanced"], 0);
        assert_eq!(report.body["registrations_promoted"], 0);
    }
}

#[tokio::test]
async fn secret_is_required() {
    let app = TestApp::spawn().await;

    let missing = app
        .post_without_token(routes::PHASE_TRANSITION, &json!({}))
        .await;
    assert_eq!(missing.status, 401);

    let wrong = app
        .post_with_token(routes::PHASE_TRANSITION, &json!({}), "guess")
        .await;
    assert_eq!(wrong.status, 401);
    assert_eq!(wrong.body["code"], "TOKEN_INVALID");
}
