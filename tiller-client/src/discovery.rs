use crate::{
    common::{
        constants::TILLER_SERVICE,
        error::{K8sClientGeneration, Result, ServiceLookup, ServiceWithoutPorts},
    },
    config::TillerOptions,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::{api::Api, Client};
use snafu::{ensure, ResultExt};

/// Address of a Kubernetes Service as reported by the cluster API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRecord {
    name: String,
    namespace: String,
    ports: Vec<i32>,
}

impl ServiceRecord {
    /// Assemble a record from its parts.
    pub fn new<N, S>(name: N, namespace: S, ports: Vec<i32>) -> Self
    where
        N: ToString,
        S: ToString,
    {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ports,
        }
    }

    /// Name of the Service.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Namespace the Service lives in.
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Ports the Service advertises, in the order the cluster API reports
    /// them.
    pub fn ports(&self) -> &[i32] {
        self.ports.as_slice()
    }
}

/// Read-only Service lookup against the cluster API. The trait seam exists so
/// the bootstrap loop can be driven without a live cluster.
#[async_trait]
pub trait ServiceDiscovery {
    /// GET a Service by namespace and name.
    async fn get_service(&self, namespace: &str, name: &str) -> Result<ServiceRecord>;
}

/// ServiceDiscovery over a live Kubernetes cluster.
#[derive(Clone)]
pub struct KubeDiscovery {
    client: Client,
}

impl KubeDiscovery {
    /// Wrap an existing kube client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Generate a new kube client from the default configuration and wrap it.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await.context(K8sClientGeneration)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ServiceDiscovery for KubeDiscovery {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<ServiceRecord> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let service = services
            .get(name)
            .await
            .context(ServiceLookup { namespace, name })?;

        let ports = service
            .spec
            .and_then(|spec| spec.ports)
            .unwrap_or_default()
            .into_iter()
            .map(|port| port.port)
            .collect();

        Ok(ServiceRecord {
            name: service.metadata.name.unwrap_or_else(|| name.to_string()),
            namespace: service
                .metadata
                .namespace
                .unwrap_or_else(|| namespace.to_string()),
            ports,
        })
    }
}

/// Resolve the controller's connection address.
///
/// An explicitly configured host and port short-circuit discovery; otherwise
/// the well-known Service is looked up in the configured Namespace and the
/// first advertised port wins. Lookups are never cached, so a controller
/// redeployed between bootstrap attempts is picked up.
pub async fn tiller_address<D>(discovery: &D, opts: &TillerOptions) -> Result<String>
where
    D: ServiceDiscovery,
{
    if !opts.host().is_empty() && !opts.port().is_empty() {
        return Ok(format!("{}:{}", opts.host(), opts.port()));
    }

    let service = discovery
        .get_service(opts.namespace(), TILLER_SERVICE)
        .await?;
    ensure!(
        !service.ports().is_empty(),
        ServiceWithoutPorts {
            namespace: service.namespace(),
            name: service.name(),
        }
    );

    Ok(format!(
        "{}.{}:{}",
        service.name(),
        service.namespace(),
        service.ports()[0]
    ))
}
