//! Token signing and verification.

use std::str::FromStr;

use anyhow::{Context, bail};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use super::claims::Claims;
use super::keys::{KeyLookup, SimpleKeyLookup};
use super::AuthError;

/// Signs tokens with a private key and verifies them with public keys
/// resolved through a [`KeyLookup`].
pub struct Authenticator {
    kid: String,
    algorithm: Algorithm,
    private_key: EncodingKey,
    lookup: Box<dyn KeyLookup>,
    validation: Validation,
}

impl Authenticator {
    /// Creates an authenticator that signs with `private_key` under `kid`.
    ///
    /// `algorithm` is a JWS algorithm name (e.g. `"RS256"`) and must belong to
    /// an asymmetric RSA family; shared-secret algorithms are rejected.
    pub fn new(
        private_key: EncodingKey,
        kid: impl Into<String>,
        algorithm: &str,
        lookup: impl KeyLookup,
    ) -> anyhow::Result<Self> {
        let algorithm = Algorithm::from_str(algorithm)
            .with_context(|| format!("unknown algorithm {algorithm}"))?;
        if !matches!(
            algorithm,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ) {
            bail!("algorithm {algorithm:?} is not an RSA signing algorithm");
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            kid: kid.into(),
            algorithm,
            private_key,
            lookup: Box::new(lookup),
            validation,
        })
    }

    /// Builds an authenticator from PEM-encoded RSA keys, with a single-key
    /// lookup for `kid`.
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        kid: &str,
        algorithm: &str,
    ) -> anyhow::Result<Self> {
        let private_key =
            EncodingKey::from_rsa_pem(private_pem).context("parsing auth private key")?;
        let public_key =
            DecodingKey::from_rsa_pem(public_pem).context("parsing auth public key")?;
        Self::new(private_key, kid, algorithm, SimpleKeyLookup::new(kid, public_key))
    }

    /// Signs `claims` into a compact token whose header carries `kid` and `alg`.
    pub fn generate_token(&self, claims: &Claims) -> anyhow::Result<String> {
        let mut header = Header::new(self.algorithm);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &self.private_key).context("signing token")
    }

    /// Verifies `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSignature`] if the token is malformed, names no or
    ///   an unknown `kid`, or fails signature verification
    /// - [`AuthError::Expired`] if `exp` is in the past
    pub fn parse_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            debug!(error = %e, "malformed token header");
            AuthError::InvalidSignature
        })?;

        let kid = header.kid.as_deref().ok_or(AuthError::InvalidSignature)?;
        let key = self.lookup.public_key(kid).ok_or_else(|| {
            debug!(kid, "no public key for kid");
            AuthError::InvalidSignature
        })?;

        jsonwebtoken::decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    debug!(error = %e, "token rejected");
                    AuthError::InvalidSignature
                }
            })
    }
}
