//! Usage events flow from the bus into the usage tables.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use stepiva_core::usage::StoreOperation;
use stepiva_db::repositories::UsageRepo;
use stepiva_events::{UsageBus, UsageEvent, UsagePersistence};

#[sqlx::test(migrations = "../../db/migrations")]
async fn persistence_drains_bus_until_closed(pool: PgPool) {
    let bus = UsageBus::default();
    let handle = tokio::spawn(UsagePersistence::run(pool.clone(), bus.subscribe()));

    bus.publish(UsageEvent::tokens(
        Some("user-1".into()),
        "milestone_nudge",
        "gpt-4o",
        1_000,
        500,
        1_500,
    ));
    bus.publish(UsageEvent::store(StoreOperation::Write, "notifications", 2));
    drop(bus);

    handle.await.unwrap();

    let summary = UsageRepo::summarize_since(&pool, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(summary.tokens.len(), 1);
    assert_eq!(summary.tokens[0].model, "gpt-4o");
    assert_eq!(summary.tokens[0].total_tokens, 1_500);
    assert_eq!(summary.store.len(), 1);
    assert_eq!(summary.store[0].operation, "write");
    assert!(summary.total_cost_usd > 0.0);
}
