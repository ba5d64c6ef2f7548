//! OAuth2 / JWT authentication for Google Cloud APIs.
//!
//! Implements the service-account JWT → access-token exchange flow:
//! <https://developers.google.com/identity/protocols/oauth2/service-account>
//!
//! 1. Build a JWT signed with the service account's RSA private key
//! 2. POST it to the token endpoint
//! 3. Receive an access token with an expiry
//! 4. Cache the token and refresh before expiry

use crate::config::{Credentials, ServiceAccountKey};
use crate::error::{GcpError, GcpResult};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    /// Issuer: the service account email.
    iss: String,
    /// Requested scopes (space-separated).
    scope: String,
    /// Audience: the token endpoint.
    aud: String,
    exp: i64,
    iat: i64,
}

/// An OAuth2 access token with metadata.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// Unix timestamp (seconds) after which the token is invalid.
    pub expires_at: i64,
}

impl AccessToken {
    /// Check if the token is expired (with 60 s buffer).
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at - 60
    }
}

/// Cached token source.
#[derive(Clone)]
pub struct TokenManager {
    credentials: Credentials,
    scopes: Vec<String>,
    cached_token: Option<AccessToken>,
    http_client: Client,
}

impl TokenManager {
    pub fn new(credentials: Credentials, scopes: Vec<String>, http_client: Client) -> Self {
        Self {
            credentials,
            scopes,
            cached_token: None,
            http_client,
        }
    }

    /// Get a valid access token, refreshing if needed.
    pub async fn get_token(&mut self) -> GcpResult<String> {
        let key = match self.credentials {
            Credentials::AccessToken(ref token) => return Ok(token.clone()),
            Credentials::ServiceAccount(ref key) => key,
        };
        if let Some(ref token) = self.cached_token {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }
        log::debug!("fetching access token for {}", key.client_email);
        let token = fetch_new_token(&self.http_client, key, &self.scopes).await?;
        let result = token.token.clone();
        self.cached_token = Some(token);
        Ok(result)
    }
}

/// Sign the JWT assertion for `key`.
fn build_assertion(key: &ServiceAccountKey, scopes: &[String], now: i64) -> GcpResult<String> {
    let claims = JwtClaims {
        iss: key.client_email.clone(),
        scope: scopes.join(" "),
        aud: key.token_uri.clone(),
        exp: now + 3600,
        iat: now,
    };

    let header = Header {
        alg: Algorithm::RS256,
        kid: Some(key.private_key_id.clone()),
        ..Default::default()
    };

    // Key files sometimes carry escaped line breaks.
    let pem = key.private_key.replace("\\n", "\n");
    let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| GcpError::auth_error(&format!("Failed to load private key: {}", e)))?;

    encode(&header, &claims, &encoding_key)
        .map_err(|e| GcpError::auth_error(&format!("Failed to encode JWT: {}", e)))
}

/// Exchange a JWT assertion for an access token.
async fn fetch_new_token(
    http: &Client,
    key: &ServiceAccountKey,
    scopes: &[String],
) -> GcpResult<AccessToken> {
    let now = Utc::now().timestamp();
    let jwt = build_assertion(key, scopes, now)?;

    let form = [
        ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
        ("assertion", jwt.as_str()),
    ];

    let response = http
        .post(&key.token_uri)
        .form(&form)
        .send()
        .await
        .map_err(|e| GcpError::auth_error(&format!("Token exchange request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GcpError::auth_error(&format!(
            "Token exchange failed (HTTP {}): {}",
            status, body
        )));
    }

    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
        expires_in: Option<i64>,
    }

    let token_resp: TokenResponse = response
        .json()
        .await
        .map_err(|e| GcpError::auth_error(&format!("Failed to parse token response: {}", e)))?;

    Ok(AccessToken {
        token: token_resp.access_token,
        expires_at: now + token_resp.expires_in.unwrap_or(3600),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_expiry_has_buffer() {
        let now = Utc::now().timestamp();
        let fresh = AccessToken {
            token: "a".into(),
            expires_at: now + 3600,
        };
        let nearly = AccessToken {
            token: "b".into(),
            expires_at: now + 30,
        };
        assert!(!fresh.is_expired());
        assert!(nearly.is_expired());
    }

    #[tokio::test]
    async fn static_token_is_returned_as_is() {
        let mut manager = TokenManager::new(
            Credentials::AccessToken("ya29.static".into()),
            vec![],
            Client::new(),
        );
        assert_eq!(manager.get_token().await.unwrap(), "ya29.static");
    }

    #[test]
    fn malformed_private_key_is_an_auth_error() {
        let key = ServiceAccountKey {
            r#type: "service_account".into(),
            project_id: "p".into(),
            private_key_id: "k".into(),
            private_key: "not a pem".into(),
            client_email: "sa@p.iam.gserviceaccount.com".into(),
            client_id: String::new(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        };
        let err = build_assertion(&key, &["scope".to_string()], 0).unwrap_err();
        assert_eq!(err.status, "UNAUTHENTICATED");
        assert!(err.message.contains("private key"));
    }
}
