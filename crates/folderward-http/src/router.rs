//! Folderward request router.
//!
//! Routes are matched on the decoded path segments:
//!
//! ```text
//! GET    /health
//! POST   /api/identities
//! GET    /api/identities
//! GET    /api/identities/{email}/files
//! GET    /api/identities/{email}/files/{filename}
//! POST   /api/files?email=..&filename=..
//! DELETE /api/files
//! GET    /api/files
//! ```

use std::borrow::Cow;

use http::Method;
use percent_encoding::percent_decode_str;

use crate::error::ApiError;

/// A resolved API route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Liveness probe.
    Health,
    /// Register a new identity.
    RegisterIdentity,
    /// List registered identities.
    ListIdentities,
    /// List the files of one identity.
    ListIdentityFiles {
        /// Decoded email segment.
        email: String,
    },
    /// Files of one identity matching a name.
    GetNamedFile {
        /// Decoded email segment.
        email: String,
        /// Decoded file name segment.
        filename: String,
    },
    /// Upload a raw body into the caller's folder.
    UploadFile,
    /// Delete a file.
    DeleteFile,
    /// List every file.
    ListFiles,
}

impl Route {
    /// Stable name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::RegisterIdentity => "RegisterIdentity",
            Self::ListIdentities => "ListIdentities",
            Self::ListIdentityFiles { .. } => "ListIdentityFiles",
            Self::GetNamedFile { .. } => "GetNamedFile",
            Self::UploadFile => "UploadFile",
            Self::DeleteFile => "DeleteFile",
            Self::ListFiles => "ListFiles",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve the route for `method` and `path`.
///
/// # Errors
///
/// - `RouteNotFound` for unknown paths.
/// - `MethodNotAllowed` for known paths with an unsupported method.
/// - `InvalidArgument` for segments that do not decode to UTF-8.
pub fn resolve_route(method: &Method, path: &str) -> Result<Route, ApiError> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let route = match segments.as_slice() {
        ["health"] => match *method {
            Method::GET | Method::HEAD => Some(Route::Health),
            _ => None,
        },
        ["api", "identities"] => match *method {
            Method::GET => Some(Route::ListIdentities),
            Method::POST => Some(Route::RegisterIdentity),
            _ => None,
        },
        ["api", "identities", email, "files"] => match *method {
            Method::GET => Some(Route::ListIdentityFiles {
                email: decode_segment(email)?,
            }),
            _ => None,
        },
        ["api", "identities", email, "files", filename] => match *method {
            Method::GET => Some(Route::GetNamedFile {
                email: decode_segment(email)?,
                filename: decode_segment(filename)?,
            }),
            _ => None,
        },
        ["api", "files"] => match *method {
            Method::GET => Some(Route::ListFiles),
            Method::POST => Some(Route::UploadFile),
            Method::DELETE => Some(Route::DeleteFile),
            _ => None,
        },
        _ => return Err(ApiError::route_not_found(path)),
    };

    route.ok_or_else(|| ApiError::method_not_allowed(method, path))
}

/// Percent-decode one path segment or query value.
///
/// # Errors
///
/// `InvalidArgument` if the decoded bytes are not UTF-8.
pub fn decode_segment(raw: &str) -> Result<String, ApiError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| ApiError::bad_request(format!("invalid percent-encoding in {raw:?}")))
}

/// The form-decoded value of query parameter `name`, if present.
///
/// A literal `+` decodes to a space, so emails containing `+` must be sent
/// as `%2B`.
#[must_use]
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
