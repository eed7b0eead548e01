//! Transport seam between the auth gateway and the network.

use std::future::Future;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use url::Url;

use super::{ApiRequest, ApiResponse, FormValue, REQUEST_ID_HEADER, RequestBody};
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Sends a request and buffers the response.
///
/// Implementations must not interpret status codes: a 401 is a normal
/// response here, and deciding what to do with it is the gateway's job.
pub trait Transport: Send + Sync + 'static {
    /// Send `request`, attaching `bearer` as `Authorization: Bearer <token>`
    /// when present.
    fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send {
        (**self).send(request, bearer)
    }
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Resolve a request path against the base URL, including query pairs.
    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(request.path().trim_start_matches('/'))?;
        if !request.query_pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_pairs());
        }
        Ok(url)
    }
}

impl Transport for HttpTransport {
    #[instrument(
        skip(self, request, bearer),
        fields(method = %request.method(), path = %request.path(), request_id = %request.request_id())
    )]
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(request)?;

        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .header(REQUEST_ID_HEADER, request.request_id().to_string());

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }

        builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => {
                let mut form = Form::new();
                for part in parts {
                    form = match &part.value {
                        FormValue::Text(text) => form.text(part.name.clone(), text.clone()),
                        FormValue::File {
                            file_name,
                            mime,
                            bytes,
                        } => form.part(
                            part.name.clone(),
                            Part::bytes(bytes.clone())
                                .file_name(file_name.clone())
                                .mime_str(mime)?,
                        ),
                    };
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        debug!(status = status.as_u16(), bytes = body.len(), "response received");

        Ok(ApiResponse::new(status, body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_keeps_base_prefix_and_query() {
        let config = ClientConfig::for_base_url("https://api.example.com/v1").unwrap();
        let transport = HttpTransport::new(&config).unwrap();

        let request = ApiRequest::get("/api/orders/my-orders/").query("status", "pending");
        let url = transport.url_for(&request).unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/api/orders/my-orders/?status=pending"
        );
    }

    #[test]
    fn test_url_for_without_leading_slash() {
        let config = ClientConfig::for_base_url("http://127.0.0.1:8000").unwrap();
        let transport = HttpTransport::new(&config).unwrap();

        let url = transport.url_for(&ApiRequest::get("dishes")).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/dishes");
    }
}
