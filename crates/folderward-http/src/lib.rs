//! Folderward HTTP service layer.
//!
//! This crate exposes the Folderward operations as a small JSON API:
//!
//! - **Router**: maps method and path to a [`router::Route`]
//! - **Handler trait**: the boundary between HTTP and the service facade
//! - **Handler**: [`FolderwardApiHandler`], serving every route from a
//!   `Folderward` instance
//! - **Service**: hyper `Service` implementation with body limits and
//!   request ids
//! - **Response helpers**: JSON success and error formatting

pub mod body;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod response;
pub mod router;
pub mod service;

pub use body::FolderwardResponseBody;
pub use dispatch::{ApiRequest, FolderwardHandler};
pub use error::ApiError;
pub use handler::FolderwardApiHandler;
pub use router::Route;
pub use service::{FolderwardHttpConfig, FolderwardHttpService};
