//! Web Push subscription entity and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stepiva_core::types::{DbId, Timestamp, UserId};

/// A row from the `push_subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub id: DbId,
    pub user_id: UserId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: Timestamp,
}

/// Browser `PushSubscription.toJSON()` keys.
#[derive(Debug, Clone, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Body of `POST /subscribe-push`, as produced by the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}
