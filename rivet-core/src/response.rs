//! Response value object.
//!
//! The dispatcher never serializes responses; it only needs a value that is
//! recognizably "response-shaped" so that hooks can short-circuit with it.

/// An application-level response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl Response {
    /// A `200 OK` response with the given body.
    pub fn new(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    /// A response with an explicit status code.
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `404 Not Found`.
    pub fn not_found() -> Self {
        Self::with_status(404, "Not Found")
    }

    /// `500 Internal Server Error`.
    pub fn internal_error() -> Self {
        Self::with_status(500, "Internal Server Error")
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Body text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// All headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
