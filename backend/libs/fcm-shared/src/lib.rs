/// Keeper FCM Shared Library
///
/// Firebase Cloud Messaging (FCM) HTTP v1 client used to push
/// notifications to Android, iOS and Web installations.
///
/// It handles:
/// - Loading Google service-account keys
/// - OAuth2 token generation using the service account
/// - Token caching with automatic refresh
/// - Single-device message delivery

pub mod client;
pub mod errors;
pub mod models;

pub use client::FCMClient;
pub use errors::FCMError;
pub use models::{FCMSendResult, ServiceAccountKey};
