use crate::common::constants::{DEFAULT_NAMESPACE, DEFAULT_RETRY_INTERVAL};
use clap::Args;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// These are the connection options for the Tiller release controller.
/// Flatten into the agent's cli args with `#[command(flatten)]`, or use
/// [`TillerOptions::builder`] for programmatic construction.
#[derive(Args, Clone, Debug)]
pub struct TillerOptions {
    /// IP address or hostname of the Tiller service. Setting this together
    /// with --tiller-port skips service discovery.
    #[arg(long = "tiller-ip", env = "TILLER_IP", default_value = "")]
    host: String,

    /// Port of the Tiller service.
    #[arg(long = "tiller-port", env = "TILLER_PORT", default_value = "")]
    port: String,

    /// Kubernetes Namespace the Tiller service is looked up in.
    #[arg(long = "tiller-namespace", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Verify the Tiller server certificate against the CA bundle.
    #[arg(long = "tiller-tls-verify", default_value_t = false)]
    tls_verify: bool,

    /// Speak TLS to Tiller without verifying the server certificate.
    #[arg(long = "tiller-tls-enable", default_value_t = false)]
    tls_enable: bool,

    /// Client private key used for mutual TLS.
    #[arg(long = "tiller-tls-key-path", value_name = "FILE_PATH")]
    tls_key: Option<PathBuf>,

    /// Client certificate used for mutual TLS.
    #[arg(long = "tiller-tls-cert-path", value_name = "FILE_PATH")]
    tls_cert: Option<PathBuf>,

    /// CA bundle the Tiller server certificate is verified against.
    #[arg(long = "tiller-tls-ca-cert-path", value_name = "FILE_PATH")]
    tls_ca_cert: Option<PathBuf>,

    /// Delay between client bootstrap attempts.
    #[arg(long = "tiller-retry-interval", default_value = DEFAULT_RETRY_INTERVAL)]
    retry_interval: humantime::Duration,
}

impl TillerOptions {
    /// This creates an empty builder.
    pub fn builder() -> TillerOptionsBuilder {
        TillerOptionsBuilder::default()
    }

    /// This returns the explicitly configured controller host, empty when
    /// unset.
    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    /// This returns the explicitly configured controller port, empty when
    /// unset.
    pub fn port(&self) -> &str {
        self.port.as_str()
    }

    /// This returns the Kubernetes Namespace for service discovery.
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// This decides if the controller certificate is verified.
    pub fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// This decides if TLS is spoken at all.
    pub fn tls_enable(&self) -> bool {
        self.tls_enable
    }

    /// This returns the client private key filepath.
    pub fn tls_key(&self) -> Option<&Path> {
        self.tls_key.as_deref()
    }

    /// This returns the client certificate filepath.
    pub fn tls_cert(&self) -> Option<&Path> {
        self.tls_cert.as_deref()
    }

    /// This returns the CA bundle filepath.
    pub fn tls_ca_cert(&self) -> Option<&Path> {
        self.tls_ca_cert.as_deref()
    }

    /// This returns the delay between client bootstrap attempts.
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval.into()
    }
}

/// This is a builder for [`TillerOptions`].
#[derive(Default)]
pub struct TillerOptionsBuilder {
    host: Option<String>,
    port: Option<String>,
    namespace: Option<String>,
    tls_verify: bool,
    tls_enable: bool,
    tls_key: Option<PathBuf>,
    tls_cert: Option<PathBuf>,
    tls_ca_cert: Option<PathBuf>,
    retry_interval: Option<Duration>,
}

impl TillerOptionsBuilder {
    /// This is a builder option to set an explicit controller host.
    #[must_use]
    pub fn with_host<H>(mut self, host: H) -> Self
    where
        H: ToString,
    {
        self.host = Some(host.to_string());
        self
    }

    /// This is a builder option to set an explicit controller port.
    #[must_use]
    pub fn with_port<P>(mut self, port: P) -> Self
    where
        P: ToString,
    {
        self.port = Some(port.to_string());
        self
    }

    /// This is a builder option to set the Namespace for service discovery.
    #[must_use]
    pub fn with_namespace<N>(mut self, namespace: N) -> Self
    where
        N: ToString,
    {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// This is a builder option to verify the controller certificate.
    #[must_use]
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// This is a builder option to speak TLS without certificate
    /// verification.
    #[must_use]
    pub fn with_tls_enable(mut self, enable: bool) -> Self {
        self.tls_enable = enable;
        self
    }

    /// This is a builder option to set the client private key filepath.
    #[must_use]
    pub fn with_tls_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_key = Some(path.into());
        self
    }

    /// This is a builder option to set the client certificate filepath.
    #[must_use]
    pub fn with_tls_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_cert = Some(path.into());
        self
    }

    /// This is a builder option to set the CA bundle filepath.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_ca_cert = Some(path.into());
        self
    }

    /// This is a builder option to set the delay between bootstrap attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    /// Build the TillerOptions.
    pub fn build(self) -> TillerOptions {
        TillerOptions {
            host: self.host.unwrap_or_default(),
            port: self.port.unwrap_or_default(),
            namespace: self
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            tls_verify: self.tls_verify,
            tls_enable: self.tls_enable,
            tls_key: self.tls_key,
            tls_cert: self.tls_cert,
            tls_ca_cert: self.tls_ca_cert,
            retry_interval: self.retry_interval.map(humantime::Duration::from).unwrap_or_else(
                || {
                    DEFAULT_RETRY_INTERVAL
                        .parse()
                        .expect("default retry interval is well-formed")
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TillerOptions;
    use std::time::Duration;

    #[test]
    fn builder_defaults_match_the_flag_defaults() {
        let opts = TillerOptions::builder().build();

        assert_eq!(opts.host(), "");
        assert_eq!(opts.port(), "");
        assert_eq!(opts.namespace(), "kube-system");
        assert!(!opts.tls_verify());
        assert!(!opts.tls_enable());
        assert_eq!(opts.tls_key(), None);
        assert_eq!(opts.retry_interval(), Duration::from_secs(20));
    }

    #[test]
    fn builder_options_are_applied() {
        let opts = TillerOptions::builder()
            .with_host("10.0.0.5")
            .with_port(44134)
            .with_namespace("flux")
            .with_tls_enable(true)
            .with_retry_interval(Duration::from_secs(1))
            .build();

        assert_eq!(opts.host(), "10.0.0.5");
        assert_eq!(opts.port(), "44134");
        assert_eq!(opts.namespace(), "flux");
        assert!(opts.tls_enable());
        assert_eq!(opts.retry_interval(), Duration::from_secs(1));
    }
}
