//! JSON response formatting.

use http::StatusCode;
use serde::Serialize;

use crate::body::FolderwardResponseBody;
use crate::error::ApiError;

/// Content type of every Folderward response.
pub const CONTENT_TYPE: &str = "application/json";

/// Serialize an error into the JSON error envelope.
///
/// ```json
/// {
///   "success": false,
///   "code": "PermissionDenied",
///   "message": "permission denied: ..."
/// }
/// ```
#[must_use]
pub fn error_to_json(error: &ApiError) -> Vec<u8> {
    serde_json::json!({
        "success": false,
        "code": error.code,
        "message": error.message,
    })
    .to_string()
    .into_bytes()
}

/// Convert an [`ApiError`] into a complete HTTP error response.
#[must_use]
pub fn error_to_response(error: &ApiError, request_id: &str) -> http::Response<FolderwardResponseBody> {
    let body = FolderwardResponseBody::from_bytes(error_to_json(error));
    with_headers(http::Response::new(body), error.status, request_id)
}

/// Build a JSON response from a serializable value.
///
/// # Errors
///
/// `InternalError` if `value` cannot be serialized.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
    request_id: &str,
) -> Result<http::Response<FolderwardResponseBody>, ApiError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| ApiError::internal(format!("failed to serialize response: {e}")))?;
    let body = FolderwardResponseBody::from_bytes(json);
    Ok(with_headers(http::Response::new(body), status, request_id))
}

fn with_headers(
    mut response: http::Response<FolderwardResponseBody>,
    status: StatusCode,
    request_id: &str,
) -> http::Response<FolderwardResponseBody> {
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(CONTENT_TYPE),
    );
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", hv);
    }
    response
}
