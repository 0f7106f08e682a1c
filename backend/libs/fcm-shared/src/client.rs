use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::{Arc, Mutex};

use crate::errors::FCMError;
use crate::models::*;

const FCM_ENDPOINT: &str = "https://fcm.googleapis.com";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Firebase Cloud Messaging Client
///
/// Handles Firebase Cloud Messaging (FCM) HTTP v1 delivery.
/// Manages OAuth2 token generation, caching, and message delivery.
/// Cheap to share behind an `Arc`; the token cache is internally locked.
pub struct FCMClient {
    pub project_id: String,
    pub credentials: Arc<ServiceAccountKey>,
    endpoint: String,
    token_cache: Arc<Mutex<Option<TokenCache>>>,
    http_client: reqwest::Client,
}

impl FCMClient {
    /// Create new FCM client
    ///
    /// # Arguments
    /// * `project_id` - Firebase project ID
    /// * `credentials` - Service account key with OAuth2 credentials
    pub fn new(project_id: String, credentials: ServiceAccountKey) -> Self {
        Self {
            project_id,
            credentials: Arc::new(credentials),
            endpoint: FCM_ENDPOINT.to_string(),
            token_cache: Arc::new(Mutex::new(None)),
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a client for the project named in the key itself
    pub fn from_service_account(credentials: ServiceAccountKey) -> Self {
        Self::new(credentials.project_id.clone(), credentials)
    }

    /// Override the messaging API base URL (emulators, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Check that the service account private key is usable for signing.
    ///
    /// Does not contact Google; a revoked key still passes.
    pub fn validate_credentials(&self) -> Result<(), FCMError> {
        if self.credentials.client_email.is_empty() {
            return Err(FCMError::CredentialsParse(
                "client_email is empty".to_string(),
            ));
        }
        EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map(|_| ())
            .map_err(|e| FCMError::KeyParseError(e.to_string()))
    }

    /// Send notification via FCM to a single device
    pub async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        data: Option<serde_json::Value>,
    ) -> Result<FCMSendResult, FCMError> {
        if device_token.is_empty() {
            return Err(FCMError::InvalidToken);
        }

        let access_token = self.get_access_token().await?;

        let message = FcmMessage {
            message: FcmMessageContent {
                token: device_token.to_string(),
                notification: FcmNotification {
                    title: title.to_string(),
                    body: body.to_string(),
                },
                data,
            },
        };

        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint, self.project_id
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&access_token)
            .json(&message)
            .send()
            .await
            .map_err(|e| FCMError::SendRequestError(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let fcm_response: FcmApiResponse = response
                    .json()
                    .await
                    .map_err(|e| FCMError::ResponseParseError(e.to_string()))?;

                Ok(FCMSendResult {
                    message_id: fcm_response.name.unwrap_or_default(),
                })
            }
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                Err(FCMError::ApiError(status.to_string(), error_text))
            }
        }
    }

    /// Get access token from service account (with caching)
    pub async fn get_access_token(&self) -> Result<String, FCMError> {
        if let Some(token) = self.cached_token()? {
            return Ok(token);
        }

        let now = Utc::now();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.credentials.client_email.clone(),
            scope: FCM_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| FCMError::KeyParseError(e.to_string()))?;

        let mut header = Header::new(Algorithm::RS256);
        if !self.credentials.private_key_id.is_empty() {
            header.kid = Some(self.credentials.private_key_id.clone());
        }

        let assertion = encode(&header, &claims, &encoding_key)
            .map_err(|e| FCMError::JwtEncodeError(e.to_string()))?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| FCMError::TokenError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FCMError::TokenRequestFailed(response.status().to_string()));
        }

        let token_response: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| FCMError::TokenParseError(e.to_string()))?;

        tracing::debug!(
            expires_in = token_response.expires_in,
            "Obtained FCM access token"
        );

        self.store_token(
            token_response.access_token.clone(),
            Utc::now().timestamp() + token_response.expires_in,
        )?;

        Ok(token_response.access_token)
    }

    /// Cached token, if still valid for at least 60 more seconds
    fn cached_token(&self) -> Result<Option<String>, FCMError> {
        let cache = self
            .token_cache
            .lock()
            .map_err(|_| FCMError::TokenError("token cache lock poisoned".to_string()))?;

        Ok(cache
            .as_ref()
            .filter(|cached| cached.expires_at > Utc::now().timestamp() + 60)
            .map(|cached| cached.access_token.clone()))
    }

    fn store_token(&self, access_token: String, expires_at: i64) -> Result<(), FCMError> {
        let mut cache = self
            .token_cache
            .lock()
            .map_err(|_| FCMError::TokenError("token cache lock poisoned".to_string()))?;
        *cache = Some(TokenCache {
            access_token,
            expires_at,
        });
        Ok(())
    }
}
