//! Bearer-token authentication.
//!
//! Tokens are JWS compact strings (`header.payload.signature`) signed with an
//! RSA private key. The header names the signing key through `kid`; the
//! [`Authenticator`] resolves the matching public key with a [`KeyLookup`] and
//! checks signature and expiry before handing back [`Claims`].

mod authenticator;
mod claims;
mod keys;

pub use authenticator::Authenticator;
pub use claims::{Claims, ROLE_ADMIN, ROLE_USER};
pub use keys::{KeyLookup, SimpleKeyLookup};

/// Why a request could not be authenticated or authorized.
///
/// Every variant except [`AuthError::ClaimsMissing`] is caller-facing and
/// answered with `401`. `ClaimsMissing` means a route was wired with
/// `has_roles` but without `authenticate`, which is a server bug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("expected authorization header format: Bearer <token>")]
    MalformedHeader,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is expired")]
    Expired,
    #[error("authentication failed")]
    InvalidCredentials,
    #[error("claims missing from request context: has_roles ran without or before authenticate")]
    ClaimsMissing,
}
