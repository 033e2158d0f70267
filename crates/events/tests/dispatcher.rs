//! Delivery fan-out against a real database and mock email and push services.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use stepiva_core::notification::{EmailStatus, NotificationMeta, NotificationType};
use stepiva_db::models::notification::{CreateNotification, Notification};
use stepiva_db::models::push_subscription::{CreatePushSubscription, PushKeys};
use stepiva_db::models::user::{UpdateNotificationPreferences, UpsertUser};
use stepiva_db::repositories::{NotificationRepo, PushSubscriptionRepo, UserRepo};
use stepiva_events::delivery::email::{EmailDelivery, ResendTransport};
use stepiva_events::{NotificationDispatcher, PushConfig, PushDelivery, UsageBus};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_notification(pool: &PgPool, email_notifications: bool) -> Notification {
    UserRepo::upsert(
        pool,
        "user-1",
        &UpsertUser {
            email: Some("ada@example.com".into()),
            display_name: Some("Ada".into()),
        },
    )
    .await
    .unwrap();
    UserRepo::update_notification_preferences(
        pool,
        "user-1",
        &UpdateNotificationPreferences {
            email_notifications: Some(email_notifications),
            push_notifications: Some(false),
        },
    )
    .await
    .unwrap();

    NotificationRepo::create(
        pool,
        &CreateNotification {
            user_id: "user-1".into(),
            plan_id: None,
            milestone_id: None,
            notification_type: NotificationType::NoPlanReminder,
            prompt: "Pick one goal today.".into(),
            used_fallback: true,
            notification_meta: NotificationMeta::for_type(NotificationType::NoPlanReminder, Utc::now()),
        },
    )
    .await
    .unwrap()
}

fn dispatcher(pool: PgPool, server: &MockServer) -> NotificationDispatcher {
    let transport = Arc::new(ResendTransport::with_base_url("re_test".into(), server.uri()));
    let email = EmailDelivery::with_transport(transport, "Stepiva <nudges@stepiva.app>").unwrap();
    NotificationDispatcher::new(
        pool,
        Arc::new(UsageBus::default()),
        Some(email),
        None,
        "https://app.stepiva.test/",
    )
        .with_retry_delays(vec![Duration::ZERO, Duration::ZERO])
}

async fn email_status(pool: &PgPool, id: i64) -> EmailStatus {
    NotificationRepo::find_by_id(pool, id)
        .await
        .unwrap()
        .unwrap()
        .email_status
        .0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn email_sent_on_first_attempt(pool: PgPool) {
    let server = MockServer::start().await;
    let notification = seed_notification(&pool, true).await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("Authorization", "Bearer re_test"))
        .and(body_partial_json(json!({
            "to": ["ada@example.com"],
            "from": "Stepiva <nudges@stepiva.app>",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&server)
        .await;

    dispatcher(pool.clone(), &server).dispatch(&notification).await;

    assert_eq!(email_status(&pool, notification.id).await, EmailStatus::sent(1));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn email_retried_then_marked_failed(pool: PgPool) {
    let server = MockServer::start().await;
    let notification = seed_notification(&pool, true).await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(3)
        .mount(&server)
        .await;

    dispatcher(pool.clone(), &server).dispatch(&notification).await;

    assert_eq!(email_status(&pool, notification.id).await, EmailStatus::failed(3));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn email_succeeds_on_retry(pool: PgPool) {
    let server = MockServer::start().await;
    let notification = seed_notification(&pool, true).await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_2"})))
        .mount(&server)
        .await;

    dispatcher(pool.clone(), &server).dispatch(&notification).await;

    assert_eq!(email_status(&pool, notification.id).await, EmailStatus::sent(2));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn opted_out_user_is_skipped(pool: PgPool) {
    let server = MockServer::start().await;
    let notification = seed_notification(&pool, false).await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    dispatcher(pool.clone(), &server).dispatch(&notification).await;

    assert_eq!(email_status(&pool, notification.id).await, EmailStatus::skipped());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn no_email_transport_is_skipped(pool: PgPool) {
    let notification = seed_notification(&pool, true).await;

    NotificationDispatcher::new(
        pool.clone(),
        Arc::new(UsageBus::default()),
        None,
        None,
        "https://app.stepiva.test",
    )
    .dispatch(&notification)
    .await;

    assert_eq!(email_status(&pool, notification.id).await, EmailStatus::skipped());
}

// ---------------------------------------------------------------------------
// Web Push
// ---------------------------------------------------------------------------

/// Raw P-256 scalar, URL-safe base64 without padding.
const TEST_VAPID_PRIVATE_KEY: &str = "BTYOCeCO-7ymfxAdv7xrmtR-prD2o6eZrgSX-GSEe5o";
/// Browser-side subscription keys for a throwaway P-256 key pair.
const TEST_P256DH: &str =
    "BE2KcW6mmiJ1QoJ6jogSAO4Hx9r0NU5Hb-46FW31oMIUTrGD6Tcn2fsiln0TmiIuMcHbIqyO8LYlAYmeZD-pL4Y";
const TEST_AUTH: &str = "ZsXMqazgROGC-86b7p8eQw";

async fn seed_push_subscriber(pool: &PgPool, endpoint: &str) -> Notification {
    let notification = seed_notification(pool, false).await;
    UserRepo::update_notification_preferences(
        pool,
        "user-1",
        &UpdateNotificationPreferences {
            email_notifications: None,
            push_notifications: Some(true),
        },
    )
    .await
    .unwrap();
    PushSubscriptionRepo::upsert(
        pool,
        "user-1",
        &CreatePushSubscription {
            endpoint: endpoint.to_string(),
            keys: PushKeys {
                p256dh: TEST_P256DH.into(),
                auth: TEST_AUTH.into(),
            },
        },
    )
    .await
    .unwrap();
    notification
}

fn push_dispatcher(pool: PgPool) -> NotificationDispatcher {
    let push = PushDelivery::new(PushConfig {
        vapid_private_key: TEST_VAPID_PRIVATE_KEY.into(),
        vapid_subject: "mailto:test@stepiva.app".into(),
    })
    .unwrap();
    NotificationDispatcher::new(
        pool,
        Arc::new(UsageBus::default()),
        None,
        Some(Arc::new(push)),
        "https://app.stepiva.test",
    )
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn gone_push_endpoint_is_removed(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/gone"))
        .and(header("Content-Encoding", "aes128gcm"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/push/gone", server.uri());
    let notification = seed_push_subscriber(&pool, &endpoint).await;

    push_dispatcher(pool.clone()).dispatch(&notification).await;

    assert!(PushSubscriptionRepo::list_for_user(&pool, "user-1")
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn accepted_push_keeps_subscription(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/live"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/push/live", server.uri());
    let notification = seed_push_subscriber(&pool, &endpoint).await;

    push_dispatcher(pool.clone()).dispatch(&notification).await;

    let subscriptions = PushSubscriptionRepo::list_for_user(&pool, "user-1")
        .await
        .unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].endpoint, endpoint);
}
