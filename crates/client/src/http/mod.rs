//! Request/response values and the transport that sends them.
//!
//! Requests are plain data so the auth gateway can re-send one after a
//! credential refresh. The bearer token is not part of the request: the
//! gateway passes the current token to the transport on every send, which
//! is what makes a refreshed token the new default for all later calls.

mod transport;

pub use reqwest::{Method, StatusCode};
pub use transport::{HttpTransport, Transport};

use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// A request to the backend, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    request_id: Uuid,
    retried: bool,
    anonymous: bool,
}

/// Body of an [`ApiRequest`].
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A JSON document.
    Json(serde_json::Value),
    /// A `multipart/form-data` form.
    Multipart(Vec<FormPart>),
}

/// One field of a multipart form.
#[derive(Debug, Clone)]
pub struct FormPart {
    /// Field name.
    pub name: String,
    /// Field content.
    pub value: FormValue,
}

/// Content of a multipart field.
#[derive(Clone)]
pub enum FormValue {
    /// Plain text value.
    Text(String),
    /// Uploaded file.
    File {
        /// File name reported to the backend.
        file_name: String,
        /// MIME type, e.g. `image/png`.
        mime: String,
        /// Raw file content.
        bytes: Vec<u8>,
    },
}

impl std::fmt::Debug for FormValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::File {
                file_name,
                mime,
                bytes,
            } => f
                .debug_struct("File")
                .field("file_name", file_name)
                .field("mime", mime)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl FormPart {
    /// Text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    /// File field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                mime: mime.into(),
                bytes,
            },
        }
    }
}

impl ApiRequest {
    /// Create a request with no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            request_id: Uuid::new_v4(),
            retried: false,
            anonymous: false,
        }
    }

    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT path`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart form body.
    #[must_use]
    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send without credentials and never refresh on 401.
    ///
    /// For sign-in style endpoints, where a 401 means the submitted
    /// credentials are wrong, not that the held token expired.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Correlation id sent as `X-Request-Id`.
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Whether this request already used its one authorization retry.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// Whether this request is sent without credentials.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    /// Create a response from a status and raw body.
    #[must_use]
    pub const fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Create a response with a JSON body.
    #[must_use]
    pub fn with_json(status: StatusCode, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string().into_bytes())
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Raw response body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::post("/api/orders/create/")
            .json(&json!({"items": []}))
            .unwrap()
            .query("page", "2");

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/api/orders/create/");
        assert_eq!(request.query_pairs(), [("page".to_string(), "2".to_string())]);
        assert!(matches!(request.body(), RequestBody::Json(v) if v["items"].is_array()));
        assert!(!request.is_retried());
        assert!(!request.is_anonymous());
        assert!(ApiRequest::post("/sign_in").anonymous().is_anonymous());
    }

    #[test]
    fn test_clone_keeps_request_id_and_retry_flag() {
        let mut request = ApiRequest::get("/dishes");
        request.mark_retried();
        let copy = request.clone();
        assert_eq!(copy.request_id(), request.request_id());
        assert!(copy.is_retried());
    }

    #[test]
    fn test_form_value_debug_hides_bytes() {
        let part = FormPart::file("image", "soup.png", "image/png", vec![0; 2048]);
        let debug = format!("{part:?}");
        assert!(debug.contains("soup.png"));
        assert!(debug.contains("len: 2048"));
    }

    #[test]
    fn test_response_json() {
        let response = ApiResponse::with_json(StatusCode::OK, &json!({"access": "abc"}));
        assert!(response.is_success());
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["access"], "abc");
    }
}
