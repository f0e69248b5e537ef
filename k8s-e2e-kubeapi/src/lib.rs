//! Typed operations against a running cluster's API for end-to-end
//! verification: node listings, a raw cluster-info fetch, a minimal pod
//! workload lifecycle, and deadline-bound readiness polling.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::net::IpAddr;
use std::time::Duration;

use k8s_e2e_ext as k8s;
use kube::api;
use time::ext::NumericalStdDuration as _;

use k8s::corev1;
use k8s::NodeExt as _;
use k8s::PodExt as _;

pub use k8s_e2e_ext::PodPhase;

use wait::Probe;

mod wait;

/// Namespace used for workload objects, matching where the lifecycle tool
/// provisions the default service account.
const WORKLOAD_NAMESPACE: &str = "default";

fn poll_interval() -> Duration {
    1.std_seconds()
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API rejected or could not serve a request. Carries the
    /// operation and target so a failing scenario step is diagnosable.
    #[error("failed to {op} {target}: {source}")]
    Api {
        op: &'static str,
        target: String,
        #[source]
        source: kube::Error,
    },

    /// A readiness wait ran out of budget before its condition held.
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },
}

impl Error {
    fn api(op: &'static str, target: impl ToString, source: kube::Error) -> Self {
        Self::Api {
            op,
            target: target.to_string(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The API reported 404 for the target object.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// The API reported 409, e.g. creating a pod whose name already
    /// exists. Surfaced verbatim; never auto-resolved here.
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }

    fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api {
                source: kube::Error::Api(response),
                ..
            } => Some(response.code),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Read-only projection of a cluster node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeView {
    pub name: String,
    pub internal_ips: Vec<IpAddr>,
}

impl From<&corev1::Node> for NodeView {
    fn from(node: &corev1::Node) -> Self {
        Self {
            name: node.node_name().to_string(),
            internal_ips: node.internal_ips(),
        }
    }
}

/// Snapshot of a pod's identity and phase at fetch time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodHandle {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
}

impl From<&corev1::Pod> for PodHandle {
    fn from(pod: &corev1::Pod) -> Self {
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            phase: pod.phase(),
        }
    }
}

pub struct ClusterApi {
    get_params: api::GetParams,
    post_params: api::PostParams,
    client: kube::Client,
}

impl ClusterApi {
    /// Create a ClusterApi configured with a default Kubernetes client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let api = k8s_e2e_kubeapi::ClusterApi::new().await?;
    /// let nodes = api.list_nodes().await?;
    /// println!("cluster has {} nodes", nodes.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new() -> kube::Result<Self> {
        kube::Client::try_default().await.map(Self::with_client)
    }

    /// Create a ClusterApi backed by the provided Kubernetes client.
    pub fn with_client(client: kube::Client) -> Self {
        Self {
            get_params: api::GetParams::default(),
            post_params: api::PostParams::default(),
            client,
        }
    }

    /// Every node currently known to the control plane, in API order.
    /// Callers must not assume any sort order.
    pub async fn list_nodes(&self) -> Result<Vec<NodeView>> {
        self.list_nodes_with(api::ListParams::default(), "all nodes")
            .await
    }

    /// Nodes matching a label selector. An empty result is success.
    pub async fn list_nodes_by_label(&self, selector: &str) -> Result<Vec<NodeView>> {
        self.list_nodes_with(api::ListParams::default().labels(selector), selector)
            .await
    }

    async fn list_nodes_with(&self, lp: api::ListParams, target: &str) -> Result<Vec<NodeView>> {
        let nodes = self
            .nodes()
            .list(&lp)
            .await
            .map_err(|source| Error::api("list nodes", target, source))?;
        Ok(nodes.items.iter().map(NodeView::from).collect())
    }

    /// Every internal IP of every node matching a label selector. A
    /// selector matching zero nodes, or nodes without addresses, yields an
    /// empty set rather than an error.
    pub async fn list_node_ip_by_label(&self, selector: &str) -> Result<BTreeSet<IpAddr>> {
        let nodes = self.list_nodes_by_label(selector).await?;
        Ok(nodes
            .into_iter()
            .flat_map(|node| node.internal_ips)
            .collect())
    }

    /// Fetch the root discovery document as opaque text.
    pub async fn cluster_info(&self) -> Result<String> {
        self.raw_get("/api/v1")
            .await
            .map_err(|source| Error::api("get cluster info", "/api/v1", source))
    }

    /// Fetch the raw response body for an API request path.
    async fn raw_get(&self, path: impl AsRef<str>) -> kube::Result<String> {
        let gp = self.get_params();
        let request = api::Request::new("")
            .get(path.as_ref(), gp)
            .map_err(kube::Error::BuildRequest)?;
        self.client.request_text(request).await
    }

    /// Submit a minimal single-container pod in the workload namespace.
    ///
    /// The pod never restarts and pulls its image only when absent, so a
    /// finished or crashed container stays observable. A name collision
    /// surfaces the API's conflict verbatim ([`Error::is_conflict`]).
    pub async fn create_custom_pod(
        &self,
        name: &str,
        container_name: &str,
        image: &str,
        command: &[&str],
    ) -> Result<PodHandle> {
        let pod =
            corev1::Pod::single_container(name, WORKLOAD_NAMESPACE, container_name, image, command);
        let created = self
            .pods()
            .create(self.post_params(), &pod)
            .await
            .map_err(|source| Error::api("create pod", name, source))?;
        Ok(PodHandle::from(&created))
    }

    /// Fetch a pod's current state. An absent pod is an error
    /// ([`Error::is_not_found`]).
    pub async fn get_pod(&self, name: &str) -> Result<PodHandle> {
        let pod = self
            .pods()
            .get(name)
            .await
            .map_err(|source| Error::api("get pod", name, source))?;
        Ok(PodHandle::from(&pod))
    }

    /// Delete a pod with foreground propagation and zero grace period, so
    /// dependents are gone before the control plane reports completion.
    pub async fn delete_pod(&self, name: &str) -> Result<()> {
        let dp = api::DeleteParams::foreground().grace_period(0);
        self.pods()
            .delete(name, &dp)
            .await
            .map(|_| ())
            .map_err(|source| Error::api("delete pod", name, source))
    }

    /// Block until the pod reaches `target` or `timeout` elapses.
    ///
    /// A fetch error aborts the wait immediately: the caller must have
    /// confirmed creation before invoking this, so a pod that cannot be
    /// fetched means something is broken, not that it is still coming up.
    /// Conflating the two would mask real faults behind a timeout.
    pub async fn wait_for_pod_phase(
        &self,
        name: &str,
        target: PodPhase,
        timeout: Duration,
    ) -> Result<()> {
        let what = format!("pod {name} to reach phase {target}");
        wait::poll_until(&what, timeout, poll_interval(), || async move {
            match self.get_pod(name).await {
                Ok(pod) if pod.phase == target => Probe::Ready(()),
                Ok(pod) => {
                    tracing::debug!(name, phase = %pod.phase, "pod not yet in target phase");
                    Probe::Pending
                }
                Err(err) => Probe::Fault(err),
            }
        })
        .await
    }

    /// Block until the `default` service account exists in `namespace` or
    /// `timeout` elapses.
    ///
    /// Unlike [`wait_for_pod_phase`](Self::wait_for_pod_phase), fetch
    /// errors here fold into the retry path: right after cluster or
    /// namespace creation the account legitimately does not exist yet, and
    /// its appearance is itself the awaited condition.
    #[allow(tail_expr_drop_order)]
    pub async fn wait_for_service_account_ready(
        &self,
        namespace: &str,
        timeout: Duration,
    ) -> Result<()> {
        let what = format!("service account default in {namespace}");
        let accounts: api::Api<corev1::ServiceAccount> =
            api::Api::namespaced(self.client.clone(), namespace);
        wait::poll_until(&what, timeout, poll_interval(), || {
            let accounts = accounts.clone();
            async move {
                match accounts.get("default").await {
                    Ok(_) => Probe::Ready(()),
                    Err(err) => {
                        tracing::debug!(namespace, error = %err, "service account not ready");
                        Probe::Pending
                    }
                }
            }
        })
        .await
    }

    fn nodes(&self) -> api::Api<corev1::Node> {
        api::Api::all(self.client.clone())
    }

    fn pods(&self) -> api::Api<corev1::Pod> {
        api::Api::namespaced(self.client.clone(), WORKLOAD_NAMESPACE)
    }

    fn get_params(&self) -> &api::GetParams {
        &self.get_params
    }

    fn post_params(&self) -> &api::PostParams {
        &self.post_params
    }
}

impl Debug for ClusterApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterApi")
            .field("get_params", &self.get_params)
            .field("post_params", &self.post_params)
            .field("client", &"<kube::Client>")
            .finish()
    }
}
