use crate::{
    common::error::{Result, TlsMaterialMissing, TlsMaterialRead},
    config::TillerOptions,
};
use snafu::{OptionExt, ResultExt};
use std::{fs, path::Path};
use tonic::transport::{Certificate, ClientTlsConfig, Identity};

/// TLS material for mutually authenticated connections to the release
/// controller, loaded once per client construction.
#[derive(Clone)]
pub struct TlsSettings {
    identity: Identity,
    ca_certificate: Certificate,
    insecure_skip_verify: bool,
}

impl TlsSettings {
    /// Load the client key, client certificate and CA bundle from the
    /// configured paths. The server certificate is taken at face value unless
    /// verification was explicitly requested.
    pub fn from_options(opts: &TillerOptions) -> Result<Self> {
        let key = read_material(opts.tls_key(), "client key")?;
        let cert = read_material(opts.tls_cert(), "client certificate")?;
        let ca = read_material(opts.tls_ca_cert(), "CA bundle")?;

        Ok(Self {
            identity: Identity::from_pem(cert, key),
            ca_certificate: Certificate::from_pem(ca),
            insecure_skip_verify: !opts.tls_verify(),
        })
    }

    /// Whether the controller's certificate is accepted without verification
    /// against the CA bundle.
    pub fn insecure_skip_verify(&self) -> bool {
        self.insecure_skip_verify
    }

    /// Transport-level client TLS configuration. The CA bundle is only pinned
    /// when the server certificate is to be verified against it; without
    /// verification the transport falls back to the system roots, as rustls
    /// offers no switch to disable verification outright.
    pub(crate) fn client_config(&self) -> ClientTlsConfig {
        let config = ClientTlsConfig::new().identity(self.identity.clone());
        if self.insecure_skip_verify {
            config
        } else {
            config.ca_certificate(self.ca_certificate.clone())
        }
    }
}

fn read_material(path: Option<&Path>, material: &str) -> Result<Vec<u8>> {
    let path = path.context(TlsMaterialMissing { material })?;
    fs::read(path).context(TlsMaterialRead { path })
}
