//! Bearer token verification.
//!
//! The identity provider issues signed JWTs; this module turns one into the
//! user id every ledger operation is scoped by. Tokens are accepted either
//! with an HS256 shared secret or with RS256 keys published as a JWKS
//! document by the provider.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header,
    jwk::{Jwk, JwkSet},
};
use serde::Deserialize;
use tokio::{sync::RwLock, time::Instant};

/// Minimum time between two fetches of the key set.
const JWKS_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on one key set fetch.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity of the caller, attached to every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// `sub` claim of the verified token
    pub user_id: String,

    /// `email` claim, when the provider includes one
    pub email: Option<String>,
}

/// Why a token was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token has no key id")]
    MissingKeyId,

    #[error("no signing key '{0}' in the key set")]
    UnknownKey(String),

    #[error("unsupported token algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),

    #[error("failed to fetch key set: {0}")]
    KeyFetch(#[from] reqwest::Error),

    #[error("token subject is empty")]
    EmptySubject,
}

/// Verifies bearer tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthContext, AuthError>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Cached key set and when it was last requested.
struct KeyCache {
    keys: JwkSet,
    fetched_at: Option<Instant>,
}

enum KeySource {
    Secret(DecodingKey),
    Jwks {
        url: String,
        http: reqwest::Client,
        cache: RwLock<KeyCache>,
    },
}

/// JWT verifier for HS256 secrets and RS256 key sets.
///
/// `exp` is always enforced. `iss` and `aud` are checked only when
/// configured.
pub struct JwtVerifier {
    keys: KeySource,
    issuer: Option<String>,
    audience: Option<String>,
}

impl JwtVerifier {
    /// Verify HS256 tokens signed with `secret`.
    pub fn with_secret(secret: &str) -> Self {
        Self {
            keys: KeySource::Secret(DecodingKey::from_secret(secret.as_bytes())),
            issuer: None,
            audience: None,
        }
    }

    /// Verify RS256 tokens against the key set served at `url`.
    ///
    /// The set is fetched lazily on the first token and again when a token
    /// names a key id that is not cached (key rotation). Refetches are at
    /// least `JWKS_REFETCH_INTERVAL` apart, whether or not the previous
    /// fetch succeeded; an unknown key id inside that window is rejected
    /// without a request.
    pub fn with_jwks(url: impl Into<String>) -> Self {
        Self {
            keys: KeySource::Jwks {
                url: url.into(),
                http: reqwest::Client::new(),
                cache: RwLock::new(KeyCache {
                    keys: JwkSet { keys: Vec::new() },
                    fetched_at: None,
                }),
            },
            issuer: None,
            audience: None,
        }
    }

    pub fn issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }

    async fn jwks_key(
        url: &str,
        http: &reqwest::Client,
        cache: &RwLock<KeyCache>,
        kid: &str,
    ) -> Result<DecodingKey, AuthError> {
        if let Some(jwk) = cache.read().await.keys.find(kid) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }

        // Holding the write lock makes concurrent misses share one fetch
        let mut cache = cache.write().await;
        if let Some(jwk) = cache.keys.find(kid) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }
        if cache
            .fetched_at
            .is_some_and(|at| at.elapsed() < JWKS_REFETCH_INTERVAL)
        {
            tracing::debug!(kid, "unknown key id, key set refreshed recently");
            return Err(AuthError::UnknownKey(kid.to_string()));
        }

        cache.fetched_at = Some(Instant::now());
        let fetched: JwkSet = http
            .get(url)
            .timeout(JWKS_FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::info!(keys = fetched.keys.len(), "refreshed identity provider key set");
        cache.keys = fetched;

        cache
            .keys
            .find(kid)
            .map(|jwk: &Jwk| DecodingKey::from_jwk(jwk))
            .transpose()?
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = match &self.keys {
            KeySource::Secret(key) => decode::<Claims>(token, key, &self.validation(Algorithm::HS256))?,
            KeySource::Jwks { url, http, cache } => {
                let header = decode_header(token)?;
                if header.alg != Algorithm::RS256 {
                    return Err(AuthError::UnsupportedAlgorithm(header.alg));
                }
                let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
                let key = Self::jwks_key(url, http, cache, &kid).await?;
                decode::<Claims>(token, &key, &self.validation(Algorithm::RS256))?
            }
        }
        .claims;

        if claims.sub.is_empty() {
            return Err(AuthError::EmptySubject);
        }

        Ok(AuthContext {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}
