//! Handler bridging the HTTP layer to the Folderward service facade.
//!
//! Success bodies carry `"success": true` next to the payload; failures are
//! rendered by the service layer from the returned [`ApiError`].

use bytes::Bytes;
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use folderward_core::Folderward;
use folderward_core::files::UploadRequest;

use crate::body::FolderwardResponseBody;
use crate::dispatch::{ApiRequest, FolderwardHandler, HandlerFuture};
use crate::error::ApiError;
use crate::response::json_response;
use crate::router::{Route, query_param};

/// Version reported by the health route.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Body of `POST /api/identities`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterInput {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
}

/// Body of `DELETE /api/files`.
#[derive(Debug, Deserialize)]
struct DeleteInput {
    #[serde(default)]
    path: String,
    #[serde(default)]
    email: String,
}

/// Handler serving every route from a [`Folderward`] instance.
#[derive(Debug, Clone)]
pub struct FolderwardApiHandler {
    service: Folderward,
}

impl FolderwardApiHandler {
    /// Create a new handler wrapping a service.
    #[must_use]
    pub fn new(service: Folderward) -> Self {
        Self { service }
    }
}

impl FolderwardHandler for FolderwardApiHandler {
    fn handle(&self, request: ApiRequest) -> HandlerFuture {
        let service = self.service.clone();
        Box::pin(async move { dispatch(&service, request).await })
    }
}

/// Run the service operation behind a route.
async fn dispatch(
    service: &Folderward,
    request: ApiRequest,
) -> Result<http::Response<FolderwardResponseBody>, ApiError> {
    let id = request.request_id.as_str();

    match request.route {
        Route::Health => json_response(
            StatusCode::OK,
            &json!({
                "status": "ok",
                "version": VERSION,
                "policyEnforcement": service.config().policy_enforcement,
            }),
            id,
        ),
        Route::RegisterIdentity => {
            let input: RegisterInput = deserialize(&request.body)?;
            let identity = service
                .register_identity(&input.first_name, &input.last_name, &input.email)
                .await?;
            json_response(
                StatusCode::CREATED,
                &json!({ "success": true, "identity": identity }),
                id,
            )
        }
        Route::ListIdentities => {
            let identities = service.list_identities().await?;
            json_response(
                StatusCode::OK,
                &json!({
                    "success": true,
                    "policyEnforcement": service.config().policy_enforcement,
                    "identities": identities,
                }),
                id,
            )
        }
        Route::ListIdentityFiles { email } => {
            let files = service.list_for_identity(&email).await?;
            json_response(StatusCode::OK, &json!({ "success": true, "files": files }), id)
        }
        Route::GetNamedFile { email, filename } => {
            let files = service.get_named(&filename, &email).await?;
            json_response(StatusCode::OK, &json!({ "success": true, "files": files }), id)
        }
        Route::UploadFile => {
            let query = request.query.as_deref();
            let email = required(query_param(query, "email"), "email")?;
            let filename = required(query_param(query, "filename"), "filename")?;
            let upload = UploadRequest {
                filename,
                content_type: request.content_type,
                data: request.body,
            };
            let receipt = service.upload_file(upload, &email).await?;
            json_response(
                StatusCode::CREATED,
                &json!({ "success": true, "file": receipt }),
                id,
            )
        }
        Route::DeleteFile => {
            let input: DeleteInput = deserialize(&request.body)?;
            if input.email.trim().is_empty() {
                return Err(ApiError::bad_request("email is required"));
            }
            let receipt = service.delete_file(&input.path, &input.email).await?;
            json_response(
                StatusCode::OK,
                &json!({ "success": true, "deletedPath": receipt.deleted_path }),
                id,
            )
        }
        Route::ListFiles => {
            let files = service.list_all().await?;
            json_response(StatusCode::OK, &json!({ "success": true, "files": files }), id)
        }
    }
}

fn deserialize<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("query parameter {name} is required")))
}
