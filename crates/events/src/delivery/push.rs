//! Web Push delivery with VAPID authentication.
//!
//! Payloads are encrypted with `aes128gcm`. Endpoints the push service
//! reports as gone (404/410) surface as [`PushError::Gone`] so callers can
//! drop the subscription.

use serde::Serialize;
use stepiva_db::models::push_subscription::PushSubscription;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

/// Seconds a push service keeps an undelivered message.
const PUSH_TTL_SECS: u32 = 24 * 60 * 60;

const DEFAULT_VAPID_SUBJECT: &str = "mailto:support@stepiva.app";

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The subscription no longer exists on the push service.
    #[error("Push endpoint is gone")]
    Gone,

    #[error("Web push error: {0}")]
    WebPush(WebPushError),

    #[error("Push payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<WebPushError> for PushError {
    fn from(err: WebPushError) -> Self {
        match err {
            WebPushError::EndpointNotValid | WebPushError::EndpointNotFound => PushError::Gone,
            other => PushError::WebPush(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    /// URL-safe base64 VAPID private key.
    pub vapid_private_key: String,
    /// `mailto:` or `https:` contact placed in the VAPID `sub` claim.
    pub vapid_subject: String,
}

impl PushConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `VAPID_PRIVATE_KEY` is unset, which disables push.
    ///
    /// | Variable            | Default                      |
    /// |---------------------|------------------------------|
    /// | `VAPID_PRIVATE_KEY` | (required)                   |
    /// | `VAPID_SUBJECT`     | `mailto:support@stepiva.app` |
    pub fn from_env() -> Option<Self> {
        let vapid_private_key = std::env::var("VAPID_PRIVATE_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())?;
        Some(Self {
            vapid_private_key,
            vapid_subject: std::env::var("VAPID_SUBJECT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VAPID_SUBJECT.to_string()),
        })
    }
}

/// JSON body shown by the service worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub url: String,
    pub notification_id: i64,
}

pub struct PushDelivery {
    client: IsahcWebPushClient,
    config: PushConfig,
}

impl PushDelivery {
    pub fn new(config: PushConfig) -> Result<Self, PushError> {
        Ok(Self {
            client: IsahcWebPushClient::new()?,
            config,
        })
    }

    /// Send one payload to one subscription.
    pub async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.p256dh,
            &subscription.auth,
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(&self.config.vapid_private_key, URL_SAFE_NO_PAD, &info)?;
        signature.add_claim("sub", self.config.vapid_subject.as_str());
        let signature = signature.build()?;

        let content = serde_json::to_vec(payload)?;
        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, &content);
        builder.set_vapid_signature(signature);
        builder.set_ttl(PUSH_TTL_SECS);

        self.client.send(builder.build()?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_camel_case() {
        let payload = PushPayload {
            title: "Milestone reminder".into(),
            body: "Keep going".into(),
            url: "http://localhost:5173/notifications".into(),
            notification_id: 7,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["notificationId"], 7);
        assert_eq!(json["title"], "Milestone reminder");
    }

    #[test]
    fn missing_endpoints_are_gone() {
        assert!(matches!(PushError::from(WebPushError::EndpointNotValid), PushError::Gone));
        assert!(matches!(PushError::from(WebPushError::EndpointNotFound), PushError::Gone));
    }

    #[test]
    fn other_web_push_errors_are_kept() {
        assert!(matches!(
            PushError::from(WebPushError::InvalidUri),
            PushError::WebPush(_)
        ));
    }
}
