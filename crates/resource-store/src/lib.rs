//! Resource Store
//!
//! The WebApp controller's only view of the cluster. Every read and write the
//! reconciler performs goes through [`ResourceStore`], which keeps the
//! reconciliation logic independent of a live API server.
//!
//! # Example
//!
//! ```no_run
//! use resource_store::{ApplyParams, KubeResourceStore, ObjectKey, ResourceStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeResourceStore::new(client);
//!
//! let key = ObjectKey::new("prod", "blog");
//! if let Some(web_app) = store.get_web_app(&key).await? {
//!     println!("{} wants host {}", key, web_app.spec.host);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Server-side apply**: every write is an apply with a fixed field manager
//!   and forced ownership, so repeated writes are idempotent
//! - **Status subresource**: WebApp status is written without touching spec
//! - **Mocking**: `MockResourceStore` (feature `test-util`) for unit tests

pub mod client;
pub mod error;
pub mod key;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeResourceStore;
pub use error::StoreError;
pub use key::{ApplyParams, ObjectKey};
pub use store_trait::ResourceStore;
#[cfg(feature = "test-util")]
pub use mock::{MockResourceStore, StoreOperation};
