//! Push delivery seam.
//!
//! The dispatcher only knows the `Notifier` trait; `FcmNotifier` adapts the
//! shared FCM client to it. One attempt per call, no retries here.

use async_trait::async_trait;
use fcm_shared::{FCMClient, FCMError, ServiceAccountKey};
use std::path::Path;
use thiserror::Error;

/// Provider acknowledgement for an accepted push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReceipt {
    pub message_id: String,
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("device token rejected by provider: {0}")]
    Unregistered(String),

    #[error("push provider error: {0}")]
    Provider(String),
}

impl From<FCMError> for DeliveryError {
    fn from(err: FCMError) -> Self {
        if err.is_unregistered() {
            DeliveryError::Unregistered(err.to_string())
        } else {
            DeliveryError::Provider(err.to_string())
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
    ) -> Result<ProviderReceipt, DeliveryError>;
}

/// Firebase Cloud Messaging notifier
pub struct FcmNotifier {
    client: FCMClient,
}

impl FcmNotifier {
    pub fn new(client: FCMClient) -> Self {
        Self { client }
    }

    /// Build from a Google service-account key file.
    ///
    /// Fails if the file is missing, is not a service-account key, or holds
    /// a private key that cannot sign.
    pub fn from_credentials_file(path: impl AsRef<Path>) -> Result<Self, FCMError> {
        let key = ServiceAccountKey::from_file(path)?;
        let client = FCMClient::from_service_account(key);
        client.validate_credentials()?;

        tracing::info!(project_id = %client.project_id, "FCM client initialized");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Notifier for FcmNotifier {
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
    ) -> Result<ProviderReceipt, DeliveryError> {
        let result = self.client.send(token, title, body, None).await?;
        Ok(ProviderReceipt {
            message_id: result.message_id,
        })
    }
}
