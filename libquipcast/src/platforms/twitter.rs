//! Twitter (X) platform implementation
//!
//! Posts through API v2 `POST /2/tweets` with OAuth 1.0a user-context
//! signing. There is no session to establish: every request carries its own
//! HMAC-SHA1 signature over the consumer and access-token secrets.

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use std::time::Duration;

use crate::error::{PlatformError, Result};
use crate::platforms::Platform;

pub const TWITTER_CHARACTER_LIMIT: usize = 280;

const API_BASE: &str = "https://api.twitter.com/2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth 1.0a user-context credentials
#[derive(Debug)]
pub struct TwitterCredentials {
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub access_token: SecretString,
    pub access_token_secret: SecretString,
}

pub struct TwitterClient {
    client: Client,
    credentials: TwitterCredentials,
    base_url: String,
    authenticated: bool,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PlatformError::Posting(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            base_url: API_BASE.to_string(),
            authenticated: false,
        })
    }

    /// Point the client at a different API root (e.g. a local stub)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn authorization_header(&self, method: &str, url: &str) -> Result<String> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let nonce = generate_nonce();

        let mut oauth_params: Vec<(String, String)> = vec![
            (
                "oauth_consumer_key".to_string(),
                self.credentials.api_key.expose_secret().to_string(),
            ),
            ("oauth_nonce".to_string(), nonce),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp),
            (
                "oauth_token".to_string(),
                self.credentials.access_token.expose_secret().to_string(),
            ),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        // JSON bodies are not part of the signature base string
        let signature = oauth_signature(
            method,
            url,
            &oauth_params,
            self.credentials.api_secret.expose_secret(),
            self.credentials.access_token_secret.expose_secret(),
        )?;
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let header_parts: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();

        Ok(format!("OAuth {}", header_parts.join(", ")))
    }
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Compute an OAuth 1.0a HMAC-SHA1 signature
///
/// `params` holds every parameter that takes part in signing: the `oauth_*`
/// protocol parameters plus any query or form parameters.
fn oauth_signature(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> std::result::Result<String, PlatformError> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        urlencoding::encode(url),
        urlencoding::encode(&param_string)
    );

    let signing_key = format!(
        "{}&{}",
        urlencoding::encode(consumer_secret),
        urlencoding::encode(token_secret)
    );

    let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
        .map_err(|e| PlatformError::Authentication(format!("Invalid signing key: {}", e)))?;
    mac.update(base_string.as_bytes());

    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn map_transport_error(error: reqwest::Error) -> PlatformError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        PlatformError::Network(format!("Network error while reaching Twitter: {}", error))
    } else {
        PlatformError::Posting(format!("Twitter request failed: {}", error))
    }
}

/// Classify a non-2xx Twitter API response
fn map_status_error(status: u16, body: &str) -> PlatformError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v["detail"]
                .as_str()
                .or(v["title"].as_str())
                .or(v["errors"][0]["message"].as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        429 => PlatformError::RateLimit(format!("Twitter rate limit exceeded: {}", message)),
        401 | 403 => PlatformError::Authentication(format!(
            "Twitter rejected the credentials ({}): {}. Check the TWITTER_* keys and app permissions.",
            status, message
        )),
        400 | 422 => PlatformError::Validation(format!(
            "Twitter rejected the tweet ({}): {}",
            status, message
        )),
        500..=599 => PlatformError::Network(format!(
            "Twitter service error ({}): {}",
            status, message
        )),
        _ => PlatformError::Posting(format!("Twitter API error ({}): {}", status, message)),
    }
}

#[async_trait]
impl Platform for TwitterClient {
    async fn authenticate(&mut self) -> Result<()> {
        let creds = &self.credentials;
        let missing = [
            creds.api_key.expose_secret(),
            creds.api_secret.expose_secret(),
            creds.access_token.expose_secret(),
            creds.access_token_secret.expose_secret(),
        ]
        .iter()
        .any(|s| s.trim().is_empty());

        if missing {
            return Err(PlatformError::Authentication(
                "Twitter credentials are incomplete".to_string(),
            )
            .into());
        }

        self.authenticated = true;
        Ok(())
    }

    async fn post(&self, content: &str) -> Result<String> {
        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }

        let url = format!("{}/tweets", self.base_url);
        let header = self.authorization_header("POST", &url)?;

        tracing::debug!("Posting to Twitter: {} characters", content.chars().count());

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, header)
            .json(&serde_json::json!({ "text": content }))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status.as_u16(), &body).into());
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Posting(format!("Unreadable Twitter response: {}", e)))?;

        let tweet_id = data["data"]["id"]
            .as_str()
            .ok_or_else(|| PlatformError::Posting("Twitter response had no tweet id".to_string()))?
            .to_string();

        tracing::debug!("Posted to Twitter: {}", tweet_id);
        Ok(tweet_id)
    }

    fn name(&self) -> &str {
        "twitter"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(TWITTER_CHARACTER_LIMIT)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuipcastError;

    fn credentials() -> TwitterCredentials {
        TwitterCredentials {
            api_key: SecretString::from("consumer-key".to_string()),
            api_secret: SecretString::from("consumer-secret".to_string()),
            access_token: SecretString::from("access-token".to_string()),
            access_token_secret: SecretString::from("token-secret".to_string()),
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_oauth_signature_reference_vector() {
        // Worked example from Twitter's "Creating a signature" documentation
        let params = pairs(&[
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
        ]);

        let signature = oauth_signature(
            "post",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
        .unwrap();

        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_authorization_header_contains_oauth_fields() {
        let client = TwitterClient::new(credentials()).unwrap();
        let header = client
            .authorization_header("POST", "https://api.twitter.com/2/tweets")
            .unwrap();

        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"consumer-key\"",
            "oauth_nonce=",
            "oauth_signature=",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=",
            "oauth_token=\"access-token\"",
            "oauth_version=\"1.0\"",
        ] {
            assert!(header.contains(field), "missing {} in {}", field, header);
        }
        assert!(!header.contains("consumer-secret"));
        assert!(!header.contains("token-secret"));
    }

    #[test]
    fn test_nonce_is_alphanumeric_and_unique() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status_error(429, r#"{"title":"Too Many Requests"}"#),
            PlatformError::RateLimit(_)
        ));
        assert!(matches!(
            map_status_error(401, r#"{"title":"Unauthorized"}"#),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            map_status_error(403, "forbidden"),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            map_status_error(503, ""),
            PlatformError::Network(_)
        ));
        assert!(matches!(
            map_status_error(418, "teapot"),
            PlatformError::Posting(_)
        ));
    }

    #[test]
    fn test_status_mapping_extracts_detail() {
        match map_status_error(
            403,
            r#"{"detail":"You are not allowed to create a Tweet with duplicate content.","title":"Forbidden"}"#,
        ) {
            PlatformError::Authentication(msg) => {
                assert!(msg.contains("duplicate content"));
            }
            other => panic!("Expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticate_marks_ready() {
        let mut client = TwitterClient::new(credentials()).unwrap();
        assert!(!client.is_authenticated());

        client.authenticate().await.unwrap();
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_blank_credentials() {
        let mut creds = credentials();
        creds.access_token_secret = SecretString::from(" ".to_string());
        let mut client = TwitterClient::new(creds).unwrap();

        let result = client.authenticate().await;
        assert!(matches!(
            result,
            Err(QuipcastError::Platform(PlatformError::Authentication(_)))
        ));
    }

    #[tokio::test]
    async fn test_post_requires_authentication() {
        let client = TwitterClient::new(credentials()).unwrap();
        let result = client.post("Giddy up!").await;
        assert!(matches!(
            result,
            Err(QuipcastError::Platform(PlatformError::Authentication(_)))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_retryable_network_error() {
        let mut client = TwitterClient::new(credentials())
            .unwrap()
            .with_base_url("http://127.0.0.1:1/2");
        client.authenticate().await.unwrap();

        match client.post("Giddy up!").await {
            Err(QuipcastError::Platform(error)) => {
                assert!(matches!(error, PlatformError::Network(_)), "{:?}", error);
                assert!(error.is_retryable());
            }
            other => panic!("Expected network error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_content_limit() {
        let client = TwitterClient::new(credentials()).unwrap();
        assert!(client.validate_content(&"a".repeat(280)).is_ok());
        assert!(client.validate_content(&"a".repeat(281)).is_err());
    }
}
