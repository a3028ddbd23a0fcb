use crate::{
    common::{
        constants::{CONNECT_TIMEOUT, REQUEST_TIMEOUT},
        error::{EndpointParse, Result, TlsConfiguration, VersionQuery},
    },
    config::TillerOptions,
    discovery::{tiller_address, ServiceDiscovery},
    tls::TlsSettings,
};
use rpc::tiller::{release_service_client::ReleaseServiceClient, GetVersionRequest};
use snafu::ResultExt;
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tonic::transport::{Channel, Endpoint};
use tracing::{error, info};

/// Timeouts for gRPC connections to the controller.
#[derive(Debug, Clone)]
pub struct Timeouts {
    connect: Duration,
    request: Duration,
}

impl Timeouts {
    /// Return a new `Self` with the connect and request timeouts.
    pub fn new(connect: Duration, request: Duration) -> Self {
        Self { connect, request }
    }
    /// Timeout to establish connection to the controller.
    pub fn connect(&self) -> Duration {
        self.connect
    }
    /// Timeout for the request itself.
    pub fn request(&self) -> Duration {
        self.request
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::new(CONNECT_TIMEOUT, REQUEST_TIMEOUT)
    }
}

/// Handle to the Tiller release controller, bound to one resolved endpoint.
///
/// Construction performs no I/O: the underlying channel connects on first
/// use. Clones share the channel and are safe to use concurrently.
#[derive(Clone)]
pub struct HelmClient {
    host: String,
    tls: Option<TlsSettings>,
    timeouts: Timeouts,
    channel: Channel,
}

impl HelmClient {
    /// Resolve the controller address and bind a client handle to it. TLS
    /// material is loaded when either TLS option asks for it.
    pub async fn new<D>(discovery: &D, opts: &TillerOptions) -> Result<Self>
    where
        D: ServiceDiscovery,
    {
        let host = tiller_address(discovery, opts).await?;

        let tls = if opts.tls_verify() || opts.tls_enable() {
            Some(TlsSettings::from_options(opts)?)
        } else {
            None
        };

        let timeouts = Timeouts::default();
        let channel = channel(&host, tls.as_ref(), &timeouts)?;

        Ok(Self {
            host,
            tls,
            timeouts,
            channel,
        })
    }

    /// Address this handle is bound to.
    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    /// TLS settings the handle was built with, if any.
    pub fn tls(&self) -> Option<&TlsSettings> {
        self.tls.as_ref()
    }

    /// Query the controller's build version.
    pub async fn version(&self) -> Result<String> {
        get_version(self.channel.clone()).await
    }

    /// Query the build version of the controller at `host` instead of the
    /// bound endpoint, with the same TLS settings. Used to probe an
    /// alternative controller without rebuilding the handle.
    pub async fn version_at(&self, host: &str) -> Result<String> {
        let channel = channel(host, self.tls.as_ref(), &self.timeouts)?;
        get_version(channel).await
    }
}

/// Build the lazily connecting channel for a resolved address.
fn channel(host: &str, tls: Option<&TlsSettings>, timeouts: &Timeouts) -> Result<Channel> {
    let scheme = if tls.is_some() { "https" } else { "http" };
    let uri = format!("{scheme}://{host}");

    let mut endpoint = Endpoint::from_shared(uri.clone())
        .context(EndpointParse {
            endpoint: uri.clone(),
        })?
        .connect_timeout(timeouts.connect())
        .timeout(timeouts.request());

    if let Some(tls) = tls {
        endpoint = endpoint
            .tls_config(tls.client_config())
            .context(TlsConfiguration { endpoint: uri })?;
    }

    Ok(endpoint.connect_lazy())
}

async fn get_version(channel: Channel) -> Result<String> {
    let mut client = ReleaseServiceClient::new(channel);
    let response = client
        .get_version(GetVersionRequest::default())
        .await
        .context(VersionQuery)?;

    Ok(response.into_inner().version.unwrap_or_default().to_string())
}

/// Build a controller client, retrying every `retry_interval` until it
/// succeeds.
///
/// This blocks the calling task for as long as the controller stays
/// unresolvable: resolution and TLS failures are logged and turned into
/// another attempt, never returned. Use [`client_setup_with_shutdown`] when
/// the caller needs a way to abort the wait.
pub async fn client_setup<D>(discovery: &D, opts: &TillerOptions) -> HelmClient
where
    D: ServiceDiscovery,
{
    loop {
        match HelmClient::new(discovery, opts).await {
            Ok(client) => {
                info!(host = client.host(), "Helm client set up");
                return client;
            }
            Err(error) => {
                error!(%error, "Error creating helm client");
                sleep(opts.retry_interval()).await;
            }
        }
    }
}

/// [`client_setup`], abandoned when `shutdown` resolves first.
///
/// The retry loop itself is unchanged; this only bounds how long a caller has
/// to wait for it. Returns `None` when shutdown won the race.
pub async fn client_setup_with_shutdown<D, F>(
    discovery: &D,
    opts: &TillerOptions,
    shutdown: F,
) -> Option<HelmClient>
where
    D: ServiceDiscovery,
    F: Future<Output = ()>,
{
    tokio::select! {
        client = client_setup(discovery, opts) => Some(client),
        _ = shutdown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{client_setup, client_setup_with_shutdown};
    use crate::{
        common::error::{Error, Result, ServiceLookup},
        config::TillerOptions,
        discovery::{ServiceDiscovery, ServiceRecord},
    };
    use async_trait::async_trait;
    use kube::core::ErrorResponse;
    use rpc::tiller::{
        release_service_server::{ReleaseService, ReleaseServiceServer},
        GetVersionRequest, GetVersionResponse, Version,
    };
    use snafu::IntoError;
    use std::{
        fs,
        net::SocketAddr,
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::{transport::Server, Request, Response, Status};

    /// Discovery that fails a fixed number of lookups before reporting the
    /// controller Service.
    struct FlakyDiscovery {
        failures: usize,
        calls: AtomicUsize,
        record: ServiceRecord,
    }

    impl FlakyDiscovery {
        fn new(failures: usize, record: ServiceRecord) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
                record,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ServiceDiscovery for FlakyDiscovery {
        async fn get_service(&self, namespace: &str, name: &str) -> Result<ServiceRecord> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ServiceLookup { namespace, name }.into_error(kube::Error::Api(
                    ErrorResponse {
                        status: "Failure".to_string(),
                        message: format!("services \"{name}\" not found"),
                        reason: "NotFound".to_string(),
                        code: 404,
                    },
                )));
            }
            Ok(self.record.clone())
        }
    }

    /// Discovery that must not be reached.
    struct UnreachableDiscovery;

    #[async_trait]
    impl ServiceDiscovery for UnreachableDiscovery {
        async fn get_service(&self, _namespace: &str, _name: &str) -> Result<ServiceRecord> {
            unreachable!("an explicit host and port must not trigger discovery");
        }
    }

    fn tiller_record() -> ServiceRecord {
        ServiceRecord::new("tiller-deploy", "flux", vec![44134])
    }

    fn write_material(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "-----BEGIN PLACEHOLDER-----\n").unwrap();
        path
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_retries_until_discovery_succeeds() {
        let discovery = FlakyDiscovery::new(3, tiller_record());
        let opts = TillerOptions::builder().with_namespace("flux").build();

        let started = tokio::time::Instant::now();
        let client = client_setup(&discovery, &opts).await;

        assert_eq!(client.host(), "tiller-deploy.flux:44134");
        assert_eq!(discovery.calls(), 4);
        // Three failed attempts, one fixed-interval sleep after each.
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_with_unreadable_key_keeps_retrying_until_shut_down() {
        let dir = tempfile::tempdir().unwrap();
        let discovery = FlakyDiscovery::new(0, tiller_record());
        let opts = TillerOptions::builder()
            .with_namespace("flux")
            .with_tls_enable(true)
            .with_tls_key(dir.path().join("absent.key"))
            .with_tls_cert(write_material(&dir, "tls.crt"))
            .with_tls_ca_cert(write_material(&dir, "ca.crt"))
            .build();

        let shutdown = tokio::time::sleep(Duration::from_secs(90));
        let client = client_setup_with_shutdown(&discovery, &opts, shutdown).await;

        assert!(client.is_none());
        // Attempts at 0s, 20s, 40s, 60s and 80s, each one a fresh resolution.
        assert_eq!(discovery.calls(), 5);
    }

    /// In-process stand-in for the release controller.
    struct StubController;

    #[tonic::async_trait]
    impl ReleaseService for StubController {
        async fn get_version(
            &self,
            _request: Request<GetVersionRequest>,
        ) -> std::result::Result<Response<GetVersionResponse>, Status> {
            Ok(Response::new(GetVersionResponse {
                version: Some(Version {
                    sem_ver: "v2.16.1".to_string(),
                    git_commit: "3d1bc72827e4edef273fb5d8d8ca9c3fbed7d200".to_string(),
                    git_tree_state: "clean".to_string(),
                }),
            }))
        }
    }

    async fn serve_stub_controller() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            Server::builder()
                .add_service(ReleaseServiceServer::new(StubController))
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
        });
        address
    }

    #[tokio::test]
    async fn version_query_returns_the_controller_version() {
        let address = serve_stub_controller().await;
        let opts = TillerOptions::builder()
            .with_host(address.ip())
            .with_port(address.port())
            .build();

        let client = client_setup(&UnreachableDiscovery, &opts).await;
        let version = client.version().await.unwrap();

        assert_eq!(version, "v2.16.1+g3d1bc72");
    }

    #[tokio::test]
    async fn version_query_can_override_the_bound_endpoint() {
        let address = serve_stub_controller().await;
        // Bound to a dead endpoint on purpose; only the override is live.
        let opts = TillerOptions::builder()
            .with_host("127.0.0.1")
            .with_port(1)
            .build();

        let client = client_setup(&UnreachableDiscovery, &opts).await;
        let version = client
            .version_at(&format!("{}:{}", address.ip(), address.port()))
            .await
            .unwrap();

        assert_eq!(version, "v2.16.1+g3d1bc72");
    }

    #[tokio::test]
    async fn version_query_against_unreachable_controller_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let opts = TillerOptions::builder()
            .with_host(address.ip())
            .with_port(address.port())
            .build();

        let client = client_setup(&UnreachableDiscovery, &opts).await;
        let error = client.version().await.unwrap_err();

        assert!(matches!(error, Error::VersionQuery { .. }));
    }
}
