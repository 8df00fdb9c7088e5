//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] is a plain value. Handlers build one and return it; nothing
//! touches the socket until the dispatcher hands the single final value to
//! hyper, so a request can never be answered twice.

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;

use crate::error::Error;
use crate::status::Status;

const JSON: &str = "application/json; charset=utf-8";

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use garagesale::{Response, Status};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::status(Status::NoContent);
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/v1/products/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: u16,
}

impl Response {
    /// `200 OK` with an already-encoded JSON body.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code.into() }
    }

    /// Encodes `value` as JSON and answers with `status`.
    ///
    /// Encoding failures are internal errors: they reach the errors
    /// middleware like any other handler failure.
    pub fn respond<T: Serialize + ?Sized>(value: &T, status: Status) -> Result<Self, Error> {
        if status == Status::NoContent {
            return Ok(Self::status(status));
        }
        let body = serde_json::to_vec(value)
            .map_err(|e| anyhow::Error::new(e).context("marshalling value to json"))?;
        Ok(Self::builder().status(status).json(body))
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: Status::Ok.into() }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the hyper response written to the wire.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Full::new(Bytes::from(self.body))).unwrap_or_else(|_| {
            // Only reachable through a header a handler built from bad bytes.
            let mut fallback = http::Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `Status::Ok` (200).
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: u16,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.status = code.into();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body.
    pub fn json(self, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), JSON.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Handlers return `Result<impl IntoResponse, Error>`.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

/// Return a [`Status`] directly from a handler: `Ok(Status::NoContent)`
impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Health {
        status: &'static str,
    }

    #[test]
    fn respond_encodes_json_with_status() {
        let res = Response::respond(&Health { status: "ok" }, Status::Created).unwrap();
        assert_eq!(res.status_code(), 201);
        assert_eq!(res.header("Content-Type"), Some(JSON));
        assert_eq!(res.body(), br#"{"status":"ok"}"#);
    }

    #[test]
    fn no_content_has_no_body() {
        let res = Response::respond(&Health { status: "ignored" }, Status::NoContent).unwrap();
        assert_eq!(res.status_code(), 204);
        assert!(res.body().is_empty());
        assert!(res.header("content-type").is_none());
    }

    #[test]
    fn into_inner_carries_status_and_headers() {
        let res = Response::builder()
            .status(Status::Created)
            .header("location", "/v1/products/1")
            .json(b"{}".to_vec())
            .into_inner();
        assert_eq!(res.status(), http::StatusCode::CREATED);
        assert_eq!(res.headers()["location"], "/v1/products/1");
        assert_eq!(res.headers()["content-type"], JSON);
    }
}
