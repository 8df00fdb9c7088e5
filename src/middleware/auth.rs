//! Authentication and role checks.

use std::sync::Arc;

use crate::auth::{AuthError, Authenticator};
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

use super::{Layer, Middleware};

/// Requires a valid `Authorization: Bearer <token>` header and stores the
/// token's claims in the request context.
pub fn authenticate(authenticator: Arc<Authenticator>) -> Layer {
    Arc::new(Authenticate { authenticator })
}

/// Requires the authenticated caller to hold at least one of `roles`.
///
/// Must be layered inside [`authenticate`]; without claims in the context
/// the request fails with an internal error.
pub fn has_roles(roles: &[&str]) -> Layer {
    Arc::new(HasRoles { roles: roles.iter().map(|r| r.to_string()).collect() })
}

// ── authenticate ──────────────────────────────────────────────────────────────

struct Authenticate {
    authenticator: Arc<Authenticator>,
}

struct RequireToken {
    authenticator: Arc<Authenticator>,
    next: BoxedHandler,
}

impl Middleware for Authenticate {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RequireToken { authenticator: Arc::clone(&self.authenticator), next })
    }
}

impl ErasedHandler for RequireToken {
    fn call(&self, mut req: Request) -> BoxFuture {
        let authenticator = Arc::clone(&self.authenticator);
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let claims = {
                let token = bearer_token(req.header("authorization"))?;
                authenticator.parse_claims(token)?
            };
            req.set_claims(claims);
            next.call(req).await
        })
    }
}

/// Extracts the token from a `Bearer <token>` header value. The scheme is
/// matched case-insensitively; anything but exactly two parts is rejected.
fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MalformedHeader)?;
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

// ── has_roles ─────────────────────────────────────────────────────────────────

struct HasRoles {
    roles: Arc<[String]>,
}

struct RequireRoles {
    roles: Arc<[String]>,
    next: BoxedHandler,
}

impl Middleware for HasRoles {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RequireRoles { roles: Arc::clone(&self.roles), next })
    }
}

impl ErasedHandler for RequireRoles {
    fn call(&self, req: Request) -> BoxFuture {
        let roles = Arc::clone(&self.roles);
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let claims = req.claims().ok_or(AuthError::ClaimsMissing)?;
            let wanted: Vec<&str> = roles.iter().map(String::as_str).collect();
            if !claims.has_role(&wanted) {
                return Err(Error::Forbidden);
            }
            next.call(req).await
        })
    }
}
