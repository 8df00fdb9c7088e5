//! Incoming HTTP request type.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::auth::Claims;
use crate::context::{Context, Values};
use crate::error::Error;
use crate::method::Method;

/// An incoming HTTP request, with its body fully read and its route
/// parameters extracted.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) ctx: Context,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        headers: HeaderMap,
        body: Bytes,
        params: HashMap<String, String>,
        values: Arc<Values>,
    ) -> Self {
        Self { method, path, headers, body, params, ctx: Context::new(values) }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn context(&self) -> &Context { &self.ctx }
    pub fn values(&self) -> &Arc<Values> { self.context().values() }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/v1/products/{id}`, `req.param("id")` on
    /// `/v1/products/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Claims stored by the authenticate middleware.
    pub fn claims(&self) -> Option<&Claims> {
        self.context().claims()
    }

    pub(crate) fn set_claims(&mut self, claims: Claims) {
        self.ctx.claims = Some(claims);
    }

    /// Decodes the JSON body into `T`.
    ///
    /// A body that is not valid JSON for `T` is the caller's fault and comes
    /// back as a `400`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::bad_request(format!("decoding request body: {e}")))
    }
}

#[cfg(test)]
impl Request {
    pub(crate) fn for_test(method: Method, path: &str) -> Self {
        Self::new(
            method,
            path.to_owned(),
            HeaderMap::new(),
            Bytes::new(),
            HashMap::new(),
            Arc::new(Values::new("test")),
        )
    }

    pub(crate) fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.insert(name, value.parse().expect("header value"));
        self
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn request(body: &'static [u8]) -> Request {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc".parse().unwrap());
        let params = HashMap::from([("id".to_string(), "42".to_string())]);
        Request::new(
            Method::Post,
            "/v1/products/42".into(),
            headers,
            Bytes::from_static(body),
            params,
            Arc::new(Values::new("t")),
        )
    }

    #[derive(Debug, Deserialize)]
    struct Sale {
        quantity: i32,
    }

    #[test]
    fn headers_and_params() {
        let req = request(b"");
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
        assert_eq!(req.param("id"), Some("42"));
        assert_eq!(req.param("name"), None);
        assert!(req.claims().is_none());
    }

    #[test]
    fn context_carries_values_and_claims() {
        let mut req = request(b"");
        assert_eq!(req.values().trace_id(), "t");
        assert!(Arc::ptr_eq(req.values(), req.context().values()));

        let claims = Claims::new("user-1", vec!["USER".into()], chrono::Utc::now(), chrono::Duration::hours(1));
        req.set_claims(claims.clone());
        assert_eq!(req.claims(), Some(&claims));
        assert_eq!(req.context().claims(), Some(&claims));
    }

    #[test]
    fn decode_reads_json_body() {
        let sale: Sale = request(br#"{"quantity":3}"#).decode().unwrap();
        assert_eq!(sale.quantity, 3);
    }

    #[test]
    fn bad_json_is_a_client_error() {
        let err = request(b"{not json").decode::<Sale>().unwrap_err();
        assert_eq!(err.status(), crate::Status::BadRequest);
    }
}
