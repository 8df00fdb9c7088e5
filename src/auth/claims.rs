//! The verified identity carried by a bearer token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Role granted to operators allowed to delete products and record sales.
pub const ROLE_ADMIN: &str = "ADMIN";
/// Role granted to every registered user.
pub const ROLE_USER: &str = "USER";

/// JWT claims for access tokens.
///
/// Immutable once parsed. The authenticate middleware stores one of these in
/// the request context; it is dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Issued-at, unix seconds.
    pub iat: i64,
}

impl Claims {
    /// Builds claims for `subject` valid from `now` for `expires_in`.
    pub fn new(
        subject: impl Into<String>,
        roles: Vec<String>,
        now: DateTime<Utc>,
        expires_in: Duration,
    ) -> Self {
        Self {
            sub: subject.into(),
            roles,
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Returns true if the claims hold at least one of `roles`.
    pub fn has_role(&self, roles: &[&str]) -> bool {
        roles
            .iter()
            .any(|want| self.roles.iter().any(|have| have == want))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_roles(roles: &[&str]) -> Claims {
        Claims {
            sub: "5cf37266-3473-4006-984f-9325122678b7".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: 9999999999,
            iat: 1234567890,
        }
    }

    #[test]
    fn has_role_is_any_of() {
        let claims = with_roles(&[ROLE_USER]);
        assert!(claims.has_role(&[ROLE_ADMIN, ROLE_USER]));
        assert!(claims.has_role(&[ROLE_USER]));
        assert!(!claims.has_role(&[ROLE_ADMIN]));
    }

    #[test]
    fn no_roles_never_matches() {
        let claims = with_roles(&[]);
        assert!(!claims.has_role(&[ROLE_ADMIN, ROLE_USER]));
        assert!(!claims.has_role(&[]));
    }

    #[test]
    fn new_sets_expiry_from_now() {
        let now = Utc::now();
        let claims = Claims::new("user-1", vec![ROLE_USER.into()], now, Duration::hours(1));
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, now.timestamp() + 3600);
    }

    #[test]
    fn missing_roles_deserialize_as_empty() {
        let json = r#"{"sub":"user-2","exp":9999999999,"iat":9999999900}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert!(claims.roles.is_empty());
    }
}
