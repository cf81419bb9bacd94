//! # Reconciler
//!
//! One generic reconciler drives the three DevOps controllers.
//!
//! - `DevOpsProject`: provisions its admin namespace, mirrors it as a Jenkins folder
//! - `Pipeline`: mirrors `spec.pipeline` as a Jenkins job in the project folder
//! - credential `Secret`: mirrors the secret into the folder's credential store
//!
//! Each kind only differs in its [`DevOpsResource`] adapter; the finalizer
//! lifecycle in [`reconcile`] is shared.

mod credential;
mod pipeline;
mod project;
pub mod reconcile;
pub mod resource;
pub mod store;
pub mod types;

// Re-export public API
pub use reconcile::{is_admin_namespace_of, is_devops_namespace, object_key, reconcile, split_key};
pub use resource::DevOpsResource;
pub use store::{KubeNamespaceStore, KubeObjectStore, NamespaceStore, ObjectStore};
pub use types::{Reconciler, ReconcilerError};
