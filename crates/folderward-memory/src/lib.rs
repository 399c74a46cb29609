//! In-memory collaborators for Folderward.
//!
//! These back the local server and the test suites. Each implementation
//! honors the contract of its trait in `folderward_core::backend` and adds a
//! few call counters and fault switches so tests can observe idempotence and
//! drive partial failures.

pub mod blob;
pub mod identity;
pub mod policy;

pub use blob::InMemoryBlobStore;
pub use identity::InMemoryIdentityStore;
pub use policy::InMemoryPolicyService;
