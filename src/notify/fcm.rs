//! Firebase Cloud Messaging over the HTTP v1 API.
//!
//! Authentication uses a service account: a short-lived RS256 JWT assertion
//! is exchanged at the account's `token_uri` for an OAuth access token, which
//! is cached until shortly before it expires.

use super::{PushMessage, PushSender};
use crate::error::NotifyError;
use crate::http::client;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_API_BASE: &str = "https://fcm.googleapis.com";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the provider-reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a Google service-account key file that FCM needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self, NotifyError> {
        serde_json::from_str(raw).map_err(|e| NotifyError::Credentials(e.to_string()))
    }

    pub async fn load(path: &str) -> Result<Self, NotifyError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NotifyError::Credentials(format!("{path}: {e}")))?;
        Self::from_json(&raw)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct FcmClient {
    account: ServiceAccount,
    key: EncodingKey,
    topic: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl FcmClient {
    /// Fails if the account's private key is not a valid RSA PEM.
    pub fn new(account: ServiceAccount, topic: impl Into<String>) -> Result<Self, NotifyError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        Ok(Self {
            account,
            key,
            topic: topic.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: Mutex::new(None),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn assertion(&self, issued_at: i64) -> Result<String, NotifyError> {
        let claims = Claims {
            iss: &self.account.client_email,
            scope: MESSAGING_SCOPE,
            aud: &self.account.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.key,
        )?)
    }

    async fn access_token(&self) -> Result<String, NotifyError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        debug!("Requesting FCM access token");
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let response = client()
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn request_body(&self, message: &PushMessage) -> Value {
        let mut notification = json!({
            "title": message.title,
            "body": message.body,
        });
        if let Some(image) = &message.image_url {
            notification["image"] = json!(image);
        }

        json!({
            "message": {
                "topic": self.topic,
                "notification": notification,
                "data": message.data,
            }
        })
    }
}

#[async_trait]
impl PushSender for FcmClient {
    #[instrument(level = "info", skip_all, fields(topic = %self.topic))]
    async fn send(&self, message: &PushMessage) -> Result<String, NotifyError> {
        let token = self.access_token().await?;
        let endpoint = format!(
            "{}/v1/projects/{}/messages:send",
            self.api_base.trim_end_matches('/'),
            self.account.project_id
        );

        let response = client()
            .post(&endpoint)
            .bearer_auth(token)
            .json(&self.request_body(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        let sent: SendResponse = response.json().await?;
        info!(name = %sent.name, "FCM message accepted");
        Ok(sent.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::article_message;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("testdata/service_key.pem");

    fn account(token_uri: String) -> ServiceAccount {
        ServiceAccount {
            project_id: "demo-project".to_string(),
            private_key: TEST_KEY.to_string(),
            client_email: "push@demo-project.iam.gserviceaccount.com".to_string(),
            token_uri,
        }
    }

    #[test]
    fn test_service_account_json_defaults_token_uri() {
        let raw = serde_json::json!({
            "type": "service_account",
            "project_id": "p",
            "private_key": "k",
            "client_email": "e@p",
        })
        .to_string();
        let parsed = ServiceAccount::from_json(&raw).unwrap();
        assert_eq!(parsed.token_uri, DEFAULT_TOKEN_URI);
        assert!(!format!("{parsed:?}").contains("private_key"));
    }

    #[test]
    fn test_invalid_key_is_credentials_error() {
        let mut bad = account(DEFAULT_TOKEN_URI.to_string());
        bad.private_key = "not a pem".to_string();
        assert!(matches!(
            FcmClient::new(bad, "topic"),
            Err(NotifyError::Credentials(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let fcm = FcmClient::new(account(DEFAULT_TOKEN_URI.to_string()), "android_news_app_topic").unwrap();
        let message = article_message("T", Some("B"), Some("https://img/x.png".to_string()), Some(3));
        let body = fcm.request_body(&message);

        assert_eq!(body["message"]["topic"], "android_news_app_topic");
        assert_eq!(body["message"]["notification"]["image"], "https://img/x.png");
        assert_eq!(body["message"]["data"]["post_id"], "3");

        let without_image = article_message("T", None, None, None);
        let body = fcm.request_body(&without_image);
        assert!(body["message"]["notification"].get("image").is_none());
    }

    #[tokio::test]
    async fn test_send_exchanges_and_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3600,
                "token_type": "Bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo-project/messages:send"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_partial_json(serde_json::json!({
                "message": { "topic": "news", "notification": { "title": "T" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/demo-project/messages/123",
            })))
            .expect(2)
            .mount(&server)
            .await;

        let fcm = FcmClient::new(account(format!("{}/token", server.uri())), "news")
            .unwrap()
            .with_api_base(server.uri());
        let message = article_message("T", Some("B"), None, Some(1));

        assert_eq!(
            fcm.send(&message).await.unwrap(),
            "projects/demo-project/messages/123"
        );
        assert!(fcm.send(&message).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_send_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t",
                "expires_in": 3600,
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo-project/messages:send"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let fcm = FcmClient::new(account(format!("{}/token", server.uri())), "news")
            .unwrap()
            .with_api_base(server.uri());
        let err = fcm
            .send(&article_message("T", None, None, None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NotifyError::Rejected { status, ref body } if status.as_u16() == 403 && body == "forbidden"
        ));
    }
}
