//! Client bootstrap for the Tiller release controller used by the deploy
//! agent.
//!
//! The controller's address is taken from explicit configuration when
//! present, and discovered through the Kubernetes API otherwise. A client
//! handle is then rebuilt on a fixed cadence until construction succeeds;
//! the handle itself stays connectionless until its first RPC. The only
//! operation issued through it here is the version probe used for
//! diagnostics.

/// Client handle and the bootstrap retry loop.
pub mod client;
/// Shared constants and errors.
pub(crate) mod common;
/// Connection options for the release controller.
pub mod config;
/// Service discovery against the cluster API.
pub mod discovery;
/// TLS material loading.
pub mod tls;

pub use client::{client_setup, client_setup_with_shutdown, HelmClient, Timeouts};
pub use common::error::{Error, Result};
pub use config::{TillerOptions, TillerOptionsBuilder};
pub use discovery::{tiller_address, KubeDiscovery, ServiceDiscovery, ServiceRecord};
pub use tls::TlsSettings;
