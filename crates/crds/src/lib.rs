//! WebApp CRD Definitions
//!
//! Kubernetes Custom Resource Definitions used by the WebApp controller:
//! the `WebApp` resource it owns and the subset of cert-manager's
//! `Certificate` resource it writes and reads back.

pub mod certificate;
pub mod web_app;

pub use certificate::*;
pub use web_app::*;
