//! Request value object.
//!
//! A minimal, already-parsed request. The resolver binds it to any parameter
//! declared as `Arc<Request>`; handlers read whatever they need from it.

use std::collections::BTreeMap;

/// An incoming request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Request {
    method: String,
    path: String,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: String,
}

impl Request {
    /// Build a request from a method and a `path?query` URI.
    ///
    /// The query string is form-urlencoded decoded; repeated keys keep the
    /// last value.
    pub fn new(method: impl Into<String>, uri: &str) -> Self {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
        let path = if path.is_empty() { "/" } else { path };

        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    /// A `GET` request.
    pub fn get(uri: &str) -> Self {
        Self::new("GET", uri)
    }

    /// A `POST` request.
    pub fn post(uri: &str) -> Self {
        Self::new("POST", uri)
    }

    /// Add a header. Header names are case-insensitive.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Upper-cased method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A decoded query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// All decoded query parameters.
    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// A header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body text.
    pub fn body(&self) -> &str {
        &self.body
    }
}
