// src/sign.rs
use anyhow::anyhow;
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::types::BalanceRequest;

type HmacSha512 = Hmac<Sha512>;

pub struct Credentials {
    api_key: String,
    api_secret: String,
    last_nonce: i64,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

pub struct SignedRequest {
    pub body: String,
    pub nonce: i64,
    pub payload: String,
    pub signature: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            last_nonce: 0,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let key = std::env::var("P2B_API_KEY")
            .map_err(|_| anyhow!("P2B_API_KEY not set"))?;
        let secret = std::env::var("P2B_API_SECRET")
            .map_err(|_| anyhow!("P2B_API_SECRET not set"))?;
        Ok(Self::new(key, secret))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    // Strictly increasing, so a signed request is never replayed even when
    // two cycles land in the same second.
    pub fn next_nonce(&mut self) -> i64 {
        let now = Utc::now().timestamp();
        self.last_nonce = now.max(self.last_nonce + 1);
        self.last_nonce
    }

    pub fn sign(&mut self, request_path: &str) -> anyhow::Result<SignedRequest> {
        let nonce = self.next_nonce();
        let body = serde_json::to_string(&BalanceRequest {
            request: request_path.to_string(),
            nonce,
        })?;

        let payload = B64.encode(body.as_bytes());
        let mut mac = HmacSha512::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| anyhow!("bad hmac key: {e}"))?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(SignedRequest {
            body,
            nonce,
            payload,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_base64_of_body() {
        let mut creds = Credentials::new("key", "secret");
        let signed = creds.sign("/api/v1/account/balances").unwrap();
        let decoded = B64.decode(&signed.payload).unwrap();
        assert_eq!(decoded, signed.body.as_bytes());
        assert_eq!(
            signed.body,
            format!(
                "{{\"request\":\"/api/v1/account/balances\",\"nonce\":{}}}",
                signed.nonce
            )
        );
    }

    #[test]
    fn signature_is_hex_sha512_sized() {
        let mut creds = Credentials::new("key", "secret");
        let signed = creds.sign("/api/v1/account/balances").unwrap();
        assert_eq!(signed.signature.len(), 128);
        assert!(signed.signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!signed.signature.chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn same_payload_same_secret_same_signature() {
        let mut a = Credentials::new("key", "secret");
        let mut b = Credentials::new("key", "secret");
        let mut c = Credentials::new("key", "other-secret");
        // Pin last_nonce far in the future so next_nonce takes the bump path
        // and all three sign identical bodies.
        a.last_nonce = i64::MAX - 1;
        b.last_nonce = i64::MAX - 1;
        c.last_nonce = i64::MAX - 1;
        let sa = a.sign("/api/v1/account/balances").unwrap();
        let sb = b.sign("/api/v1/account/balances").unwrap();
        let sc = c.sign("/api/v1/account/balances").unwrap();
        assert_eq!(sa.body, sb.body);
        assert_eq!(sa.signature, sb.signature);
        assert_ne!(sa.signature, sc.signature);
    }

    #[test]
    fn nonces_strictly_increase() {
        let mut creds = Credentials::new("key", "secret");
        let first = creds.next_nonce();
        let second = creds.next_nonce();
        let third = creds.next_nonce();
        assert!(second > first);
        assert!(third > second);
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("key", "super-secret");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
