pub use k8s_openapi as openapi;
pub use k8s_openapi::api::core::v1 as corev1;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;

pub use phase::PodPhase;

use std::net::IpAddr;

mod phase;

/// Node address type carrying a cluster-internal IP.
pub const NODE_INTERNAL_IP: &str = "InternalIP";

pub trait ObjectMetaExt {
    fn new(name: impl ToString) -> Self;
    fn with_namespace(name: impl ToString, namespace: impl ToString) -> Self;
}

impl ObjectMetaExt for metav1::ObjectMeta {
    fn new(name: impl ToString) -> Self {
        let name = Some(name.to_string());
        Self { name, ..default() }
    }

    fn with_namespace(name: impl ToString, namespace: impl ToString) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            ..Self::new(name)
        }
    }
}

pub trait NodeExt {
    fn node_name(&self) -> &str;
    fn internal_ips(&self) -> Vec<IpAddr>;
}

impl NodeExt for corev1::Node {
    fn node_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Every `InternalIP` status address that parses as an IP.
    /// Addresses the API reports in any other form are skipped.
    fn internal_ips(&self) -> Vec<IpAddr> {
        self.status
            .as_ref()
            .and_then(|status| status.addresses.as_ref())
            .into_iter()
            .flatten()
            .filter(|addr| addr.type_ == NODE_INTERNAL_IP)
            .filter_map(|addr| addr.address.parse().ok())
            .collect()
    }
}

pub trait PodExt {
    fn single_container(
        name: impl ToString,
        namespace: impl ToString,
        container_name: impl ToString,
        image: impl ToString,
        command: &[&str],
    ) -> Self;
    fn phase(&self) -> PodPhase;
}

impl PodExt for corev1::Pod {
    /// Build a minimal one-container pod.
    ///
    /// `restartPolicy: Never` keeps a finished or crashed container
    /// observable instead of restarted, and `imagePullPolicy: IfNotPresent`
    /// avoids re-fetching an image the node already holds.
    fn single_container(
        name: impl ToString,
        namespace: impl ToString,
        container_name: impl ToString,
        image: impl ToString,
        command: &[&str],
    ) -> Self {
        let metadata = metav1::ObjectMeta::with_namespace(name, namespace);
        let container = corev1::Container {
            name: container_name.to_string(),
            image: Some(image.to_string()),
            command: Some(command.iter().map(ToString::to_string).collect()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            ..default()
        };
        let spec = corev1::PodSpec {
            containers: vec![container],
            restart_policy: Some("Never".to_string()),
            service_account_name: Some("default".to_string()),
            ..default()
        };
        Self {
            metadata,
            spec: Some(spec),
            ..default()
        }
    }

    fn phase(&self) -> PodPhase {
        self.status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            .map_or(PodPhase::Unknown, PodPhase::parse)
    }
}

pub fn default<T: Default>() -> T {
    T::default()
}
