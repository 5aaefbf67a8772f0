//! Buffered response staging.
//!
//! # Responsibilities
//! - Accumulate status, headers, and body in memory while a handler runs
//! - Commit the whole response to the transport exactly once, or never
//! - Build the small unbuffered responses the dispatcher writes directly
//!   (gate rejection, fault substitution, business errors)
//!
//! # Design Decisions
//! - Nothing reaches the network until the handler has provably returned;
//!   a handler that dies mid-write leaves only an unreachable buffer behind
//! - `std::io::Write` is implemented so handlers can use `write!` to build
//!   bodies incrementally

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

/// In-memory staging area for one complete response.
#[derive(Debug)]
pub struct ResponseBuffer {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseBuffer {
    /// A fresh buffer: 200 OK, no headers, empty body.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Insert a header, replacing any previous values for the name.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Append a header, preserving previous values (ordered multi-value).
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Insert a header from a runtime string value.
    pub fn try_header(
        &mut self,
        name: HeaderName,
        value: &str,
    ) -> Result<(), axum::http::header::InvalidHeaderValue> {
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn content_type(&mut self, value: &'static str) {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(value));
    }

    /// Append bytes to the body.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        self.body.extend_from_slice(bytes.as_ref());
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for ResponseBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl IntoResponse for ResponseBuffer {
    /// The single commit point: the staged status, headers, and body become
    /// one wire response.
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// A small unbuffered plain-text response, written directly to the
/// transport by the dispatcher. Mirrors the shape of classic `http.Error`
/// output: `text/plain`, nosniff, newline-terminated body.
pub fn plain_text(status: StatusCode, body: impl Into<String>) -> Response {
    let mut body = body.into();
    if !body.ends_with('\n') {
        body.push('\n');
    }

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response.headers_mut().insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    response
}
