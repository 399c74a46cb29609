//! Folderward handler trait and route dispatch.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::body::FolderwardResponseBody;
use crate::error::ApiError;
use crate::router::Route;

/// A routed request, with the body already collected.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// The resolved route.
    pub route: Route,
    /// Raw query string.
    pub query: Option<String>,
    /// `content-type` request header.
    pub content_type: Option<String>,
    /// Request body.
    pub body: Bytes,
    /// Id echoed in the `x-request-id` header.
    pub request_id: String,
}

/// Response future returned by a [`FolderwardHandler`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<FolderwardResponseBody>, ApiError>> + Send>>;

/// Trait the service layer implements to serve routed requests.
///
/// This is the boundary between the HTTP transport and the service facade.
pub trait FolderwardHandler: Send + Sync + 'static {
    /// Handle a routed request and produce an HTTP response.
    fn handle(&self, request: ApiRequest) -> HandlerFuture;
}

/// Dispatch a routed request to the handler.
pub async fn dispatch_request<H: FolderwardHandler>(
    handler: &H,
    request: ApiRequest,
) -> Result<http::Response<FolderwardResponseBody>, ApiError> {
    tracing::debug!(route = %request.route, request_id = %request.request_id, "dispatching request");
    handler.handle(request).await
}
