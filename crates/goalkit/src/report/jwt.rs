//! RS256 assertions for the OAuth JWT bearer grant.

use crate::error::ResolveError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use rustls_pemfile::Item;
use serde::Serialize;
use std::io::BufReader;
use std::path::Path;

/// Lifetime of an assertion, in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 120;

const HEADER: &str = r#"{"alg":"RS256"}"#;

/// Claims of a bearer-grant assertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    /// OAuth client id.
    pub iss: String,
    /// Username the token is issued for.
    pub sub: String,
    /// Login service base URL.
    pub aud: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    pub fn new(client_id: &str, username: &str, audience: &str, now: DateTime<Utc>) -> Self {
        Self {
            iss: client_id.to_string(),
            sub: username.to_string(),
            aud: audience.to_string(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }
}

/// An RSA private key used to sign assertions.
pub struct SigningKey {
    key_pair: RsaKeyPair,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("modulus_len", &self.key_pair.public().modulus_len())
            .finish()
    }
}

impl SigningKey {
    /// Read a PEM file holding a PKCS#1 or PKCS#8 RSA private key.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let pem = std::fs::read(path)
            .map_err(|e| ResolveError::Credential(format!("cannot read {}: {e}", path.display())))?;
        Self::from_pem(&pem)
            .map_err(|e| ResolveError::Credential(format!("{}: {e}", path.display())))
    }

    /// Parse the first RSA private key in a PEM document.
    pub fn from_pem(pem: &[u8]) -> Result<Self, String> {
        let mut reader = BufReader::new(pem);
        loop {
            let item = rustls_pemfile::read_one(&mut reader).map_err(|e| format!("invalid PEM: {e}"))?;
            let key_pair = match item {
                Some(Item::Pkcs1Key(key)) => RsaKeyPair::from_der(key.secret_pkcs1_der()),
                Some(Item::Pkcs8Key(key)) => RsaKeyPair::from_pkcs8(key.secret_pkcs8_der()),
                Some(_) => continue,
                None => return Err("no RSA private key found".to_string()),
            };
            return key_pair
                .map(|key_pair| Self { key_pair })
                .map_err(|e| format!("rejected RSA key: {e}"));
        }
    }

    /// Sign `message` with RSASSA-PKCS1-v1_5 over SHA-256.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ResolveError> {
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &SystemRandom::new(), message, &mut signature)
            .map_err(|_| ResolveError::Credential("signing the assertion failed".to_string()))?;
        Ok(signature)
    }
}

/// `base64url(header) "." base64url(claims)`.
pub fn signing_input(claims: &Claims) -> Result<String, ResolveError> {
    let body = serde_json::to_vec(claims)
        .map_err(|e| ResolveError::Credential(format!("cannot encode claims: {e}")))?;
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(body)
    ))
}

/// A compact signed assertion: `signing_input "." base64url(signature)`.
pub fn signed_assertion(key: &SigningKey, claims: &Claims) -> Result<String, ResolveError> {
    let input = signing_input(claims)?;
    let signature = key.sign(input.as_bytes())?;
    Ok(format!("{input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}
