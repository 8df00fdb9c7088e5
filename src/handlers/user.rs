//! Credential exchange.

use std::sync::Arc;

use chrono::Utc;
use data_encoding::BASE64;
use serde::Serialize;

use crate::auth::Authenticator;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::store::Store;
use crate::user;

const BASIC_AUTH_REQUIRED: &str = "must provide email and password in Basic auth";

/// State for the user routes.
pub struct Users {
    store: Arc<dyn Store>,
    authenticator: Arc<Authenticator>,
}

impl Users {
    pub fn new(store: Arc<dyn Store>, authenticator: Arc<Authenticator>) -> Self {
        Self { store, authenticator }
    }
}

#[derive(Serialize)]
struct Token {
    token: String,
}

/// Exchanges HTTP Basic credentials for a signed bearer token.
pub(super) async fn token(users: Arc<Users>, req: Request) -> Result<Response, Error> {
    let (email, password) = basic_credentials(req.header("authorization"))
        .ok_or_else(|| Error::request(Status::Unauthorized, BASIC_AUTH_REQUIRED))?;

    let claims = user::authenticate(users.store.as_ref(), &email, &password, Utc::now()).await?;
    let token = users.authenticator.generate_token(&claims)?;

    Response::respond(&Token { token }, Status::Ok)
}

/// Splits `Basic base64(email:password)` into its parts. The scheme is
/// matched case-insensitively; the password may contain `:`.
fn basic_credentials(header: Option<&str>) -> Option<(String, String)> {
    let (scheme, encoded) = header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64.decode(encoded.trim().as_bytes()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_owned(), password.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(raw: &str) -> String {
        format!("Basic {}", BASE64.encode(raw.as_bytes()))
    }

    #[test]
    fn parses_basic_credentials() {
        let header = encode("admin@example.com:go:phers");
        assert_eq!(
            basic_credentials(Some(&header)),
            Some(("admin@example.com".into(), "go:phers".into()))
        );
        let lower = header.replacen("Basic", "basic", 1);
        assert!(basic_credentials(Some(&lower)).is_some());
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(basic_credentials(None), None);
        assert_eq!(basic_credentials(Some("Bearer abc")), None);
        assert_eq!(basic_credentials(Some("Basic !!!")), None);
        assert_eq!(basic_credentials(Some(&encode("no-colon"))), None);
    }
}
