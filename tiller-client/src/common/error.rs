use snafu::Snafu;
use std::path::PathBuf;

/// Result alias for operations which may fail while resolving, building or
/// using a controller client.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced while bootstrapping or querying the release controller.
/// Resolution and TLS variants are caught by the bootstrap loop and turned
/// into another attempt; only the version query propagates its variant to the
/// caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub enum Error {
    /// Error for when Kubernetes API client generation fails.
    #[snafu(display("Failed to generate kubernetes client: {}", source))]
    K8sClientGeneration { source: kube::Error },

    /// Error for when the Kubernetes API GET request for the controller
    /// Service fails.
    #[snafu(display(
        "Failed to GET Kubernetes Service {}/{}: {}",
        namespace,
        name,
        source
    ))]
    ServiceLookup {
        source: kube::Error,
        namespace: String,
        name: String,
    },

    /// Error for when the discovered Service advertises no ports.
    #[snafu(display("Kubernetes Service {}/{} has no ports", namespace, name))]
    ServiceWithoutPorts { namespace: String, name: String },

    /// Error for when TLS was requested without the full set of key,
    /// certificate and CA paths.
    #[snafu(display("TLS requested without a {} path", material))]
    TlsMaterialMissing { material: String },

    /// Error for when TLS material could not be read from disk.
    #[snafu(display("Failed to read TLS material at {}: {}", path.display(), source))]
    TlsMaterialRead {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Error for when the transport rejects the TLS client configuration.
    #[snafu(display(
        "Failed to apply TLS configuration for endpoint {}: {}",
        endpoint,
        source
    ))]
    TlsConfiguration {
        source: tonic::transport::Error,
        endpoint: String,
    },

    /// Error for when a resolved address does not form a valid endpoint URI.
    #[snafu(display("Invalid controller endpoint {}: {}", endpoint, source))]
    EndpointParse {
        source: tonic::transport::Error,
        endpoint: String,
    },

    /// Error for when the version query to the controller fails.
    #[snafu(display("Failed to get version from the release controller: {}", source))]
    VersionQuery { source: tonic::Status },
}
