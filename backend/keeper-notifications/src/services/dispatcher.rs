use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::notifier::{Notifier, ProviderReceipt};
use crate::models::NotificationPayload;

/// What happened to a single message. Informational only; the consumer
/// loop moves on regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered(ProviderReceipt),
    /// Valid payload without a device token
    Skipped,
    DecodeFailed,
    DeliveryFailed,
}

/// Hex SHA-256 of a recipient, the only form in which it may be logged
pub fn recipient_hash(recipient: &str) -> String {
    hex::encode(Sha256::digest(recipient.as_bytes()))
}

/// Decode → notify pipeline for one message at a time
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Handle one raw message body. Never fails; every error is logged
    /// and terminal for this message only.
    pub async fn handle(&self, body: &[u8]) -> DispatchOutcome {
        let payload = match NotificationPayload::decode(body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to decode notification payload");
                return DispatchOutcome::DecodeFailed;
            }
        };

        let hash = recipient_hash(&payload.recipient_identifier);
        tracing::info!(
            recipient_hash = %hash,
            room_id = payload.conversation_id,
            "processing notification"
        );

        let token = match payload.delivery_token() {
            Some(token) => token,
            None => {
                tracing::warn!(
                    recipient_hash = %hash,
                    "fcm token is missing from payload, skipping notification"
                );
                return DispatchOutcome::Skipped;
            }
        };

        match self
            .notifier
            .send(token, &payload.title(), &payload.message_content)
            .await
        {
            Ok(receipt) => {
                tracing::info!(
                    recipient_hash = %hash,
                    response = %receipt.message_id,
                    "successfully sent fcm message"
                );
                DispatchOutcome::Delivered(receipt)
            }
            Err(e) => {
                tracing::error!(
                    recipient_hash = %hash,
                    error = %e,
                    "failed to send fcm message"
                );
                DispatchOutcome::DeliveryFailed
            }
        }
    }
}
