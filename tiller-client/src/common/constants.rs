use std::time::Duration;

/// This is the name of the Kubernetes Service the release controller is
/// advertised under.
pub(crate) const TILLER_SERVICE: &str = "tiller-deploy";

/// This is the namespace the controller Service is looked up in when none is
/// configured.
pub(crate) const DEFAULT_NAMESPACE: &str = "kube-system";

/// This is the delay between client bootstrap attempts when none is
/// configured.
pub(crate) const DEFAULT_RETRY_INTERVAL: &str = "20s";

/// Timeout to establish a connection to the controller.
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a single request to the controller.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
