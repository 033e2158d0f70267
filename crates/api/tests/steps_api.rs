//! HTTP-level integration tests for `/api/steps`.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{
    body_json, build_test_app, delete_auth, get_auth, patch_json_auth, post_json_auth, token_for,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use stepiva_core::plan::{build_milestones, NewMilestone, NudgeFrequency};
use stepiva_db::models::plan::NewPlan;
use stepiva_db::repositories::{PlanRepo, UserRepo};

/// Seed a one-milestone plan for `user` and return `(plan_id, milestone_id)`.
async fn seed_plan(pool: &PgPool, user: &str) -> (i64, String) {
    let today = Utc::now().date_naive();
    UserRepo::ensure_exists(pool, user).await.unwrap();
    let milestones = build_milestones(vec![NewMilestone {
        title: "Write outline".into(),
        description: String::new(),
        start_date: today,
        due_date: today + Duration::days(7),
        blind_spot_tip: None,
        strength_hook: None,
    }])
    .unwrap();
    let plan = PlanRepo::create(
        pool,
        &NewPlan {
            user_id: user.to_string(),
            goal_type: "creative".into(),
            goal: "Write a novel".into(),
            target_date: None,
            nudge_frequency: NudgeFrequency::Daily,
            milestones,
        },
    )
    .await
    .unwrap();
    let milestone_id = plan.milestones.0[0].id.clone();
    (plan.id, milestone_id)
}

async fn add_step(pool: &PgPool, plan_id: i64, milestone_id: &str, title: &str) -> Value {
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/steps",
        &token_for("alice"),
        json!({"planId": plan_id, "milestoneId": milestone_id, "title": title}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn created_step_is_listed_as_open(pool: PgPool) {
    let (plan_id, milestone_id) = seed_plan(&pool, "alice").await;
    let step = add_step(&pool, plan_id, &milestone_id, "  Sketch the three acts  ").await;
    assert_eq!(step["title"], "Sketch the three acts");
    assert_eq!(step["source"], "user");

    let response = get_auth(
        build_test_app(pool),
        &format!("/api/steps?planId={plan_id}&milestoneId={milestone_id}"),
        &token_for("alice"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let steps = body_json(response).await["data"].clone();
    assert_eq!(steps.as_array().unwrap().len(), 1);
    assert_eq!(steps[0]["id"], step["id"]);
    assert_eq!(steps[0]["completed"], false);
    assert!(steps[0]["completedAt"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completing_and_reopening_step_sets_and_clears_timestamp(pool: PgPool) {
    let (plan_id, milestone_id) = seed_plan(&pool, "alice").await;
    let step = add_step(&pool, plan_id, &milestone_id, "Name the protagonist").await;

    let body = |completed: bool| {
        json!({
            "planId": plan_id,
            "milestoneId": milestone_id,
            "stepId": step["id"],
            "completed": completed,
        })
    };

    let response = patch_json_auth(
        build_test_app(pool.clone()),
        "/api/steps",
        &token_for("alice"),
        body(true),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let completed = body_json(response).await["data"].clone();
    assert_eq!(completed["completed"], true);
    assert!(completed["completedAt"].is_string());

    let response =
        patch_json_auth(build_test_app(pool), "/api/steps", &token_for("alice"), body(false)).await;
    let reopened = body_json(response).await["data"].clone();
    assert_eq!(reopened["completed"], false);
    assert!(reopened["completedAt"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rename_validates_title(pool: PgPool) {
    let (plan_id, milestone_id) = seed_plan(&pool, "alice").await;
    let step = add_step(&pool, plan_id, &milestone_id, "Draft").await;

    let response = patch_json_auth(
        build_test_app(pool.clone()),
        "/api/steps",
        &token_for("alice"),
        json!({"planId": plan_id, "milestoneId": milestone_id, "stepId": step["id"], "title": "   "}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = patch_json_auth(
        build_test_app(pool.clone()),
        "/api/steps",
        &token_for("alice"),
        json!({"planId": plan_id, "milestoneId": milestone_id, "stepId": step["id"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = patch_json_auth(
        build_test_app(pool),
        "/api/steps",
        &token_for("alice"),
        json!({"planId": plan_id, "milestoneId": milestone_id, "stepId": step["id"], "title": "Second draft"}),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["title"], "Second draft");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_step_removes_it(pool: PgPool) {
    let (plan_id, milestone_id) = seed_plan(&pool, "alice").await;
    let keep = add_step(&pool, plan_id, &milestone_id, "Keep").await;
    let removed = add_step(&pool, plan_id, &milestone_id, "Drop").await;

    let response = delete_auth(
        build_test_app(pool.clone()),
        &format!(
            "/api/steps?planId={plan_id}&milestoneId={milestone_id}&stepId={}",
            removed["id"].as_str().unwrap()
        ),
        &token_for("alice"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let plan = PlanRepo::find_by_id(&pool, plan_id).await.unwrap().unwrap();
    let steps = &plan.milestones.0[0].steps;
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].id, keep["id"].as_str().unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_ids_and_foreign_plans_are_rejected(pool: PgPool) {
    let (plan_id, milestone_id) = seed_plan(&pool, "alice").await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/steps",
        &token_for("alice"),
        json!({"planId": plan_id, "milestoneId": "no-such-milestone", "title": "x"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/steps",
        &token_for("bob"),
        json!({"planId": plan_id, "milestoneId": milestone_id, "title": "x"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(
        build_test_app(pool),
        &format!("/api/steps?planId={plan_id}&milestoneId={milestone_id}"),
        &token_for("bob"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_step_creation_keeps_every_step(pool: PgPool) {
    let (plan_id, milestone_id) = seed_plan(&pool, "alice").await;

    let mut handles = Vec::new();
    for i in 0..5 {
        let pool = pool.clone();
        let milestone_id = milestone_id.clone();
        handles.push(tokio::spawn(async move {
            add_step(&pool, plan_id, &milestone_id, &format!("step {i}")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let plan = PlanRepo::find_by_id(&pool, plan_id).await.unwrap().unwrap();
    assert_eq!(plan.milestones.0[0].steps.len(), 5);
}
