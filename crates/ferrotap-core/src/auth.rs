//! Bitso request signing.
//!
//! Every request carries `Authorization: Bitso {key}:{nonce}:{signature}` where
//! the signature is the lowercase hex HMAC-SHA256 of
//! `nonce + method + path [+ body] [+ "?" + query]` keyed by the API secret.
//! The nonce is the current Unix time in milliseconds and is read again for
//! every request; nothing is cached between calls.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::error::ConfigError;
use crate::http_client::{HttpAuth, HttpMethod, HttpRequest};
use crate::request::RequestDescriptor;

type HmacSha256 = Hmac<Sha256>;

/// API key pair. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        let secret = secret.into();
        if key.trim().is_empty() {
            return Err(ConfigError::MissingCredential { field: "key" });
        }
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingCredential { field: "secret" });
        }
        Ok(Self { key, secret })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.key.len() > 8 && self.key.is_ascii() {
            format!("{}...{}", &self.key[..4], &self.key[self.key.len() - 4..])
        } else {
            String::from("***REDACTED***")
        };

        f.debug_struct("Credentials")
            .field("key", &masked_key)
            .field("secret", &"***REDACTED***")
            .finish()
    }
}

/// Computes Bitso authorization headers.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
}

impl RequestSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn key(&self) -> &str {
        self.credentials.key()
    }

    /// Sign `descriptor` with a fresh nonce and produce the transport request.
    pub fn sign(&self, descriptor: RequestDescriptor, timeout_ms: u64) -> HttpRequest {
        let auth = self.authorization(&descriptor);
        descriptor.into_http_request(&auth, timeout_ms)
    }

    /// Authorization header for `descriptor` using the current time as nonce.
    pub fn authorization(&self, descriptor: &RequestDescriptor) -> HttpAuth {
        self.authorization_with_nonce(descriptor, &current_nonce())
    }

    pub fn authorization_with_nonce(&self, descriptor: &RequestDescriptor, nonce: &str) -> HttpAuth {
        let message = signing_message(descriptor, nonce);
        let signature = signature(&self.credentials.secret, &message);
        HttpAuth::Header {
            name: String::from("Authorization"),
            value: format!("Bitso {}:{}:{}", self.credentials.key, nonce, signature),
        }
    }
}

/// The exact message the exchange expects to be signed.
pub fn signing_message(descriptor: &RequestDescriptor, nonce: &str) -> String {
    let mut message = format!(
        "{nonce}{}{}",
        descriptor.method.as_str(),
        descriptor.relative_path()
    );

    if descriptor.method == HttpMethod::Post {
        if let Some(body) = &descriptor.body {
            message.push_str(body);
        }
    }

    if !descriptor.query.is_empty() {
        message.push('?');
        message.push_str(&descriptor.query_string());
    }

    message
}

/// Lowercase hex HMAC-SHA256 of `message` keyed by `secret`.
pub fn signature(secret: &str, message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Current Unix time in milliseconds, as a decimal string.
pub fn current_nonce() -> String {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.bitso.com";

    fn signer() -> RequestSigner {
        RequestSigner::new(Credentials::new("k", "s").expect("valid credentials"))
    }

    #[test]
    fn ticker_fixture_matches_reference_digest() {
        let descriptor = RequestDescriptor::get(BASE, "/v3/ticker");

        assert_eq!(signing_message(&descriptor, "1000"), "1000GET/v3/ticker");
        assert_eq!(
            signature("s", "1000GET/v3/ticker"),
            "76e1eed5b93f9803dfe4bba8568bf33d9b12dd8141553e67b1b8233df0b4084b"
        );

        let auth = signer().authorization_with_nonce(&descriptor, "1000");
        assert_eq!(
            auth,
            HttpAuth::Header {
                name: String::from("Authorization"),
                value: String::from(
                    "Bitso k:1000:76e1eed5b93f9803dfe4bba8568bf33d9b12dd8141553e67b1b8233df0b4084b"
                ),
            }
        );
    }

    #[test]
    fn query_string_is_appended_after_path() {
        let descriptor = RequestDescriptor::get(BASE, "/v3/trades/")
            .with_query("marker", "55845")
            .with_query("limit", "100")
            .with_query("sort", "asc")
            .with_query("book", "btc_mxn");

        let message = signing_message(&descriptor, "1000");
        assert_eq!(message, "1000GET/v3/trades?marker=55845&limit=100&sort=asc&book=btc_mxn");
        assert_eq!(
            signature("s", &message),
            "f5fe1eebf78bae03a5523bf29ecc2761da7fb9985fb4330035d20db1d6fbf51c"
        );
    }

    #[test]
    fn post_body_bytes_are_signed() {
        let descriptor = RequestDescriptor::new(HttpMethod::Post, BASE, "/v3/orders")
            .with_json_body(&serde_json::json!({ "book": "btc_mxn" }))
            .expect("serializable body");

        let message = signing_message(&descriptor, "1000");
        assert_eq!(message, "1000POST/v3/orders{\"book\":\"btc_mxn\"}");
        assert_eq!(
            signature("s", &message),
            "d12f1a2a499b78cd8b870d2cfec2e8fe5a32c1a6383ec8e5ce81db9988ed3c28"
        );
    }

    #[test]
    fn get_body_is_not_part_of_the_message() {
        let mut descriptor = RequestDescriptor::get(BASE, "/v3/ticker");
        descriptor.body = Some(String::from("{\"ignored\":true}"));
        assert_eq!(signing_message(&descriptor, "1000"), "1000GET/v3/ticker");
    }

    #[test]
    fn every_message_component_changes_the_signature() {
        let base = RequestDescriptor::get(BASE, "/v3/trades").with_query("book", "btc_mxn");
        let reference = signature("s", &signing_message(&base, "1000"));

        let variants = [
            signing_message(&base, "1001"),
            signing_message(
                &RequestDescriptor {
                    method: HttpMethod::Post,
                    ..base.clone()
                },
                "1000",
            ),
            signing_message(
                &RequestDescriptor {
                    path: String::from("/v3/user_trades"),
                    ..base.clone()
                },
                "1000",
            ),
            signing_message(&base.clone().with_query("limit", "100"), "1000"),
            signing_message(
                &RequestDescriptor {
                    method: HttpMethod::Post,
                    body: Some(String::from("{}")),
                    ..base.clone()
                },
                "1000",
            ),
        ];

        for message in variants {
            assert_ne!(signature("s", &message), reference, "message {message}");
        }
    }

    #[test]
    fn fresh_nonce_is_drawn_per_signature() {
        let signer = signer();
        let descriptor = RequestDescriptor::get(BASE, "/v3/ticker");

        let first = signer.authorization(&descriptor);
        std::thread::sleep(std::time::Duration::from_millis(3));
        let second = signer.authorization(&descriptor);

        assert_ne!(first, second);
    }

    #[test]
    fn signed_request_carries_header_and_exact_url() {
        let descriptor = RequestDescriptor::get(BASE, "/v3/trades").with_query("book", "eth_mxn");
        let request = signer().sign(descriptor, 5_000);

        assert_eq!(request.url, "https://api.bitso.com/v3/trades?book=eth_mxn");
        let header = request.header("authorization").expect("authorization header");
        let parts: Vec<&str> = header.trim_start_matches("Bitso ").split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "k");
        assert!(parts[1].parse::<u64>().is_ok(), "nonce is numeric: {}", parts[1]);
        assert_eq!(parts[2].len(), 64);
    }

    #[test]
    fn missing_credentials_are_configuration_errors() {
        assert_eq!(
            Credentials::new("", "s").expect_err("empty key"),
            ConfigError::MissingCredential { field: "key" }
        );
        assert_eq!(
            Credentials::new("k", "  ").expect_err("blank secret"),
            ConfigError::MissingCredential { field: "secret" }
        );
    }

    #[test]
    fn debug_output_redacts_secret() {
        let credentials = Credentials::new("abcdefghijkl", "super-secret").expect("valid");
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("abcd...ijkl"));
    }
}
