//! Reminder scanner and `/api/milestoneReminders` trigger tests.
//!
//! Scanner behaviour is exercised through `ReminderScanner::run_pass`, which
//! processes candidates sequentially, so assertions can follow immediately.

mod common;

use std::collections::HashMap;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, build_test_app_with, build_test_state, get, post_auth, test_config};
use serde_json::json;
use sqlx::PgPool;
use stepiva_core::notification::{DeliveryStatus, NotificationType};
use stepiva_core::plan::{build_milestones, NewMilestone, NudgeFrequency};
use stepiva_core::usage::StoreOperation;
use stepiva_db::models::plan::{NewPlan, Plan};
use stepiva_db::repositories::{NotificationRepo, PlanRepo, UserRepo};
use stepiva_events::UsageEvent;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Plan with one milestone due today and one that starts next month.
async fn seed_plan(pool: &PgPool, user: &str, frequency: NudgeFrequency) -> Plan {
    let today = Utc::now().date_naive();
    UserRepo::ensure_exists(pool, user).await.unwrap();
    let milestones = build_milestones(vec![
        NewMilestone {
            title: "Due now".into(),
            description: String::new(),
            start_date: today - Duration::days(2),
            due_date: today + Duration::days(2),
            blind_spot_tip: None,
            strength_hook: Some("You thrive on routine.".into()),
        },
        NewMilestone {
            title: "Later".into(),
            description: String::new(),
            start_date: today + Duration::days(30),
            due_date: today + Duration::days(40),
            blind_spot_tip: None,
            strength_hook: None,
        },
    ])
    .unwrap();

    PlanRepo::create(
        pool,
        &NewPlan {
            user_id: user.to_string(),
            goal_type: "health".into(),
            goal: "Walk every day".into(),
            target_date: None,
            nudge_frequency: frequency,
            milestones,
        },
    )
    .await
    .unwrap()
}

async fn backdate_notifications(pool: &PgPool, days: i32) {
    sqlx::query("UPDATE notifications SET created_at = created_at - make_interval(days => $1)")
        .bind(days)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pass_nudges_due_milestone_once_within_lookback(pool: PgPool) {
    let plan = seed_plan(&pool, "alice", NudgeFrequency::Daily).await;
    let scanner = build_test_state(pool.clone(), test_config()).reminder_scanner();
    let now = Utc::now();

    let first = scanner.run_pass(now.date_naive(), now).await.unwrap();
    assert_eq!(first.candidates, 1);
    assert_eq!(first.created, 1);
    assert_eq!(first.failed, 0);

    let second = scanner.run_pass(now.date_naive(), Utc::now()).await.unwrap();
    assert_eq!(second.candidates, 0);

    let due_id = &plan.milestones.0[0].id;
    let notifications = NotificationRepo::list_for_milestone(&pool, plan.id, due_id)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);

    let notification = &notifications[0];
    assert_eq!(notification.kind(), NotificationType::MilestoneReminder);
    assert!(notification.used_fallback);
    assert!(notification.prompt.contains("\"Due now\""));
    assert!(notification.prompt.contains("You thrive on routine."));
    // No email transport configured in tests.
    assert_eq!(
        notification.email_status.0.delivery_status,
        DeliveryStatus::Skipped
    );

    let later_id = &plan.milestones.0[1].id;
    assert!(NotificationRepo::list_for_milestone(&pool, plan.id, later_id)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lookback_window_follows_nudge_frequency(pool: PgPool) {
    seed_plan(&pool, "daily-user", NudgeFrequency::Daily).await;
    seed_plan(&pool, "weekly-user", NudgeFrequency::Weekly).await;
    let scanner = build_test_state(pool.clone(), test_config()).reminder_scanner();
    let now = Utc::now();

    assert_eq!(scanner.run_pass(now.date_naive(), now).await.unwrap().created, 2);

    // Two days later the daily plan is due again, the weekly one is not.
    backdate_notifications(&pool, 2).await;
    let candidates = scanner.find_due(now.date_naive(), Utc::now()).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_matches::assert_matches!(
        &candidates[0],
        stepiva_api::nudge::ReminderCandidate::Milestone { plan, .. } if plan.user_id == "daily-user"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_bypasses_dedup(pool: PgPool) {
    seed_plan(&pool, "qa-account", NudgeFrequency::Daily).await;
    let mut config = test_config();
    config.reminder_test_user_id = Some("qa-account".into());
    let scanner = build_test_state(pool.clone(), config).reminder_scanner();
    let now = Utc::now();

    scanner.run_pass(now.date_naive(), now).await.unwrap();
    let second = scanner.run_pass(now.date_naive(), Utc::now()).await.unwrap();
    assert_eq!(second.created, 1);

    let all = NotificationRepo::list_for_user(&pool, "qa-account", false, 50, 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn paused_plans_are_not_scanned(pool: PgPool) {
    let plan = seed_plan(&pool, "alice", NudgeFrequency::Daily).await;
    PlanRepo::update(&pool, plan.id, Some("paused"), None)
        .await
        .unwrap();
    let scanner = build_test_state(pool.clone(), test_config()).reminder_scanner();
    let now = Utc::now();

    let report = scanner.run_pass(now.date_naive(), now).await.unwrap();
    assert_eq!(report.candidates, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn users_without_plans_get_weekly_onboarding_reminder(pool: PgPool) {
    UserRepo::ensure_exists(&pool, "newcomer").await.unwrap();
    let scanner = build_test_state(pool.clone(), test_config()).reminder_scanner();
    let now = Utc::now();

    let report = scanner.run_pass(now.date_naive(), now).await.unwrap();
    assert_eq!(report.created, 1);

    let notifications = NotificationRepo::list_for_user(&pool, "newcomer", false, 50, 0)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind(), NotificationType::NoPlanReminder);
    assert!(notifications[0].plan_id.is_none());

    // Within the week: nothing. After it: reminded again.
    backdate_notifications(&pool, 3).await;
    assert!(scanner.find_due(now.date_naive(), Utc::now()).await.unwrap().is_empty());
    backdate_notifications(&pool, 5).await;
    assert_eq!(scanner.find_due(now.date_naive(), Utc::now()).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pass_accounts_every_store_operation(pool: PgPool) {
    UserRepo::ensure_exists(&pool, "newcomer").await.unwrap();
    let state = build_test_state(pool.clone(), test_config());
    let mut usage = state.usage_bus.subscribe();
    let now = Utc::now();

    state
        .reminder_scanner()
        .run_pass(now.date_naive(), now)
        .await
        .unwrap();

    let mut counts: HashMap<(StoreOperation, String), i64> = HashMap::new();
    while let Ok(event) = usage.try_recv() {
        if let UsageEvent::Store {
            operation,
            collection,
            count,
            ..
        } = event
        {
            *counts.entry((operation, collection)).or_default() += count;
        }
    }

    // Scan and dispatch each read the user; dedup check reads notifications.
    assert_eq!(counts.get(&(StoreOperation::Read, "users".into())), Some(&2));
    assert_eq!(counts.get(&(StoreOperation::Read, "notifications".into())), Some(&1));
    // The reminder insert plus the recorded email status.
    assert_eq!(counts.get(&(StoreOperation::Write, "notifications".into())), Some(&2));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failing_assistant_still_writes_exactly_one_fallback(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let plan = seed_plan(&pool, "alice", NudgeFrequency::Daily).await;
    let mut state = build_test_state(pool.clone(), test_config());
    state.assistant = Some(common::mock_assistant(&server.uri()));
    let now = Utc::now();

    let report = state
        .reminder_scanner()
        .run_pass(now.date_naive(), now)
        .await
        .unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 0);

    let notifications =
        NotificationRepo::list_for_milestone(&pool, plan.id, &plan.milestones.0[0].id)
            .await
            .unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].used_fallback);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assistant_reply_is_used_when_available(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
        .mount(&server)
        .await;
    let run = json!({
        "id": "run_1",
        "thread_id": "thread_1",
        "status": "completed",
        "model": "gpt-4o-mini",
        "usage": {"prompt_tokens": 100, "completion_tokens": 30, "total_tokens": 130}
    });
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "msg_2", "role": "assistant", "content": [
                {"type": "text", "text": {"value": "Ten minutes outside after lunch. Go!"}}
            ]}]
        })))
        .mount(&server)
        .await;

    let plan = seed_plan(&pool, "alice", NudgeFrequency::Daily).await;
    let mut state = build_test_state(pool.clone(), test_config());
    state.assistant = Some(common::mock_assistant(&server.uri()));
    let mut usage = state.usage_bus.subscribe();
    let now = Utc::now();

    state
        .reminder_scanner()
        .run_pass(now.date_naive(), now)
        .await
        .unwrap();

    let notifications =
        NotificationRepo::list_for_milestone(&pool, plan.id, &plan.milestones.0[0].id)
            .await
            .unwrap();
    assert_eq!(notifications[0].prompt, "Ten minutes outside after lunch. Go!");
    assert!(!notifications[0].used_fallback);

    let mut saw_tokens = false;
    while let Ok(event) = usage.try_recv() {
        if let UsageEvent::Tokens { total_tokens, .. } = event {
            assert_eq!(total_tokens, 130);
            saw_tokens = true;
        }
    }
    assert!(saw_tokens, "token usage should be published");
}

// ---------------------------------------------------------------------------
// HTTP trigger
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn trigger_reports_queued_count(pool: PgPool) {
    seed_plan(&pool, "alice", NudgeFrequency::Daily).await;
    seed_plan(&pool, "bob", NudgeFrequency::Weekly).await;

    let response = get(build_test_app_with(pool, test_config()), "/api/milestoneReminders").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["remindersQueued"], 2);
    assert!(json["message"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn trigger_requires_cron_secret_when_configured(pool: PgPool) {
    let mut config = test_config();
    config.cron_secret = Some("s3cret".into());

    let response = get(
        build_test_app_with(pool.clone(), config.clone()),
        "/api/milestoneReminders",
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_auth(
        build_test_app_with(pool.clone(), config.clone()),
        "/api/milestoneReminders",
        "wrong",
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_auth(
        build_test_app_with(pool, config),
        "/api/milestoneReminders",
        "s3cret",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["remindersQueued"], 0);
}
