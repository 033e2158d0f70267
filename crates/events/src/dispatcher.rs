//! Fan-out of a stored notification to email and Web Push.
//!
//! Delivery is best-effort: every failure is logged and swallowed so the
//! reminder pipeline never fails because a channel is down.

use std::sync::Arc;
use std::time::Duration;

use stepiva_core::notification::{EmailStatus, MAX_EMAIL_ATTEMPTS};
use stepiva_core::usage::StoreOperation;
use stepiva_db::models::notification::Notification;
use stepiva_db::models::user::User;
use stepiva_db::repositories::{NotificationRepo, PushSubscriptionRepo, UserRepo};
use stepiva_db::DbPool;

use crate::bus::{UsageBus, UsageEvent};
use crate::delivery::email::{EmailDelivery, EmailMessage};
use crate::delivery::push::{PushDelivery, PushError, PushPayload};

/// Backoff between email attempts (1 s, then 2 s).
const EMAIL_RETRY_DELAYS_SECS: [u64; 2] = [1, 2];

#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: DbPool,
    usage_bus: Arc<UsageBus>,
    email: Option<EmailDelivery>,
    push: Option<Arc<PushDelivery>>,
    app_url: String,
    retry_delays: Vec<Duration>,
}

impl NotificationDispatcher {
    pub fn new(
        pool: DbPool,
        usage_bus: Arc<UsageBus>,
        email: Option<EmailDelivery>,
        push: Option<Arc<PushDelivery>>,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            usage_bus,
            email,
            push,
            app_url: app_url.into().trim_end_matches('/').to_string(),
            retry_delays: EMAIL_RETRY_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        }
    }

    /// Override the email backoff schedule.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    fn track_store(&self, operation: StoreOperation, collection: &str, count: usize) {
        if count > 0 {
            self.usage_bus
                .publish(UsageEvent::store(operation, collection, count as i64));
        }
    }

    /// Deliver `notification` over every channel the user has enabled.
    pub async fn dispatch(&self, notification: &Notification) {
        let found = UserRepo::find_by_id(&self.pool, &notification.user_id).await;
        if found.is_ok() {
            self.track_store(StoreOperation::Read, "users", 1);
        }
        let user = match found {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(
                    user_id = %notification.user_id,
                    notification_id = notification.id,
                    "Notification user not found, skipping delivery"
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    notification_id = notification.id,
                    "Failed to load user for delivery"
                );
                return;
            }
        };

        let status = self.deliver_email(&user, notification).await;
        match NotificationRepo::update_email_status(&self.pool, notification.id, &status).await {
            Ok(()) => self.track_store(StoreOperation::Write, "notifications", 1),
            Err(e) => tracing::error!(
                error = %e,
                notification_id = notification.id,
                "Failed to record email status"
            ),
        }

        if user.push_notifications {
            self.deliver_push(&user, notification).await;
        }
    }

    fn link(&self, notification: &Notification) -> String {
        format!("{}/notifications/{}", self.app_url, notification.id)
    }

    async fn deliver_email(&self, user: &User, notification: &Notification) -> EmailStatus {
        let (Some(email), Some(to)) = (&self.email, user.email.as_deref()) else {
            return EmailStatus::skipped();
        };
        if !user.email_notifications || to.trim().is_empty() {
            return EmailStatus::skipped();
        }

        let message = EmailMessage {
            to: to.to_string(),
            subject: notification.kind().email_subject().to_string(),
            text: format!("{}\n\nOpen Stepiva: {}", notification.prompt, self.link(notification)),
        };

        for attempt in 1..=MAX_EMAIL_ATTEMPTS {
            match email.send(&message).await {
                Ok(()) => return EmailStatus::sent(attempt),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        user_id = %user.id,
                        notification_id = notification.id,
                        error = %e,
                        "Email delivery attempt failed"
                    );
                    if attempt < MAX_EMAIL_ATTEMPTS {
                        if let Some(delay) = self.retry_delays.get(attempt as usize - 1) {
                            tokio::time::sleep(*delay).await;
                        }
                    }
                }
            }
        }

        tracing::error!(
            user_id = %user.id,
            notification_id = notification.id,
            "Email delivery failed after all attempts"
        );
        EmailStatus::failed(MAX_EMAIL_ATTEMPTS)
    }

    async fn deliver_push(&self, user: &User, notification: &Notification) {
        let Some(push) = &self.push else {
            return;
        };

        let subscriptions = match PushSubscriptionRepo::list_for_user(&self.pool, &user.id).await {
            Ok(subs) => {
                self.track_store(StoreOperation::Read, "push_subscriptions", subs.len());
                subs
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %user.id, "Failed to load push subscriptions");
                return;
            }
        };

        let payload = PushPayload {
            title: notification.kind().email_subject().to_string(),
            body: notification.prompt.clone(),
            url: self.link(notification),
            notification_id: notification.id,
        };

        for subscription in &subscriptions {
            match push.send(subscription, &payload).await {
                Ok(()) => {
                    tracing::debug!(user_id = %user.id, notification_id = notification.id, "Push sent");
                }
                Err(PushError::Gone) => {
                    tracing::info!(
                        user_id = %user.id,
                        endpoint = %subscription.endpoint,
                        "Push endpoint gone, removing subscription"
                    );
                    match PushSubscriptionRepo::delete_by_endpoint(&self.pool, &subscription.endpoint)
                        .await
                    {
                        Ok(_) => self.track_store(StoreOperation::Delete, "push_subscriptions", 1),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to remove gone push subscription")
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user.id,
                        notification_id = notification.id,
                        error = %e,
                        "Push delivery failed"
                    );
                }
            }
        }
    }
}
