//! API-key authentication for the REST API and the realtime feed.
//!
//! Every private request carries three headers: `api-key`, `api-expires`
//! (a unix timestamp after which the request is refused) and
//! `api-signature`, the hex HMAC-SHA256 of
//! `VERB + path_and_query + expires + body` keyed with the API secret.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::error::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// Path signed when authenticating the realtime feed.
pub const REALTIME_AUTH_PATH: &str = "/realtime";

/// API key pair.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials from a key id and secret.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// The public key id.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign a request.
    pub fn sign(
        &self,
        verb: &str,
        path_and_query: &str,
        expires: i64,
        body: &str,
    ) -> Result<String, ExchangeError> {
        let message = format!("{}{}{}{}", verb, path_and_query, expires, body);

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Signing(format!("Failed to create HMAC: {}", e)))?;
        mac.update(message.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build the authentication headers for a REST request.
    pub fn auth_headers(
        &self,
        verb: &str,
        path_and_query: &str,
        expires: i64,
        body: &str,
    ) -> Result<Vec<(&'static str, String)>, ExchangeError> {
        let signature = self.sign(verb, path_and_query, expires, body)?;

        debug!(verb, path = path_and_query, expires, "Signed request");

        Ok(vec![
            ("api-expires", expires.to_string()),
            ("api-key", self.api_key.clone()),
            ("api-signature", signature),
        ])
    }

    /// Arguments for the feed's `authKeyExpires` operation.
    pub fn feed_auth_args(&self, expires: i64) -> Result<serde_json::Value, ExchangeError> {
        let signature = self.sign("GET", REALTIME_AUTH_PATH, expires, "")?;
        Ok(serde_json::json!([self.api_key, expires, signature]))
    }
}

/// Unix timestamp `ttl_secs` from now.
pub fn expires_in(ttl_secs: i64) -> i64 {
    chrono::Utc::now().timestamp() + ttl_secs
}

/// Generate a client order id: prefix plus an unpadded url-safe base64 UUID.
pub fn client_order_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4();
    format!("{}{}", prefix, URL_SAFE_NO_PAD.encode(id.as_bytes()))
}
