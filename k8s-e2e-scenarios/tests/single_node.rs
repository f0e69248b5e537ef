//! Single-node cluster scenarios: reset, bring up a cluster from a
//! Clusterfile (written by hand or generated by the tool), inspect its
//! images, then exercise the API surface and a pod workload against it.
//!
//! These need a host with the lifecycle tool installed and root via sudo,
//! so they are ignored by default and additionally gated on
//! `E2E_CLUSTER_TESTS=1`.
//!
//! Run: E2E_CLUSTER_TESTS=1 cargo test -p k8s-e2e-scenarios -- --ignored

use std::time::Duration;

use k8s_e2e_exec::run_and_check;
use k8s_e2e_kubeapi::{ClusterApi, PodPhase};
use k8s_e2e_scenarios as scenarios;
use tracing::info;

const CLUSTER_IMAGES: [&str; 3] = [
    "hub.sealos.cn/labring/kubernetes:v1.25.6",
    "hub.sealos.cn/labring/helm:v3.11.0",
    "hub.sealos.cn/labring/flannel:v0.21.4",
];

const POD_IMAGE: &str = "docker.io/library/busybox:latest";

const SERVICE_ACCOUNT_TIMEOUT: Duration = Duration::from_secs(60);
const POD_RUNNING_TIMEOUT: Duration = Duration::from_secs(120);

fn should_run() -> bool {
    std::env::var("E2E_CLUSTER_TESTS").unwrap_or_default() == "1"
}

async fn reset_cluster() {
    info!("resetting any existing cluster");
    let output = run_and_check(&scenarios::reset_cmd(), 0).await.unwrap();
    assert!(
        output.stdout_lossy().contains(scenarios::RESET_SUCCESS_MARKER),
        "reset output missing success marker: {}",
        output.stdout_lossy()
    );
}

async fn apply_clusterfile(manifest: &std::path::Path) {
    info!(manifest = %manifest.display(), "applying Clusterfile");
    let output = run_and_check(&scenarios::apply_cmd(manifest), 0)
        .await
        .unwrap();
    assert!(
        output.stdout_lossy().contains(scenarios::APPLY_SUCCESS_MARKER),
        "apply output missing success marker: {}",
        output.stdout_lossy()
    );
}

async fn check_images_listed() {
    let output = run_and_check(&scenarios::images_cmd(), 0).await.unwrap();
    let listing = output.stdout_lossy();
    for image in CLUSTER_IMAGES {
        let reference = image.rsplit_once(':').map(|(name, _)| name).unwrap();
        assert!(listing.contains(reference), "image {image} not listed");
    }
}

#[tokio::test]
#[ignore = "requires a host with the cluster lifecycle tool installed"]
async fn apply_single_node_clusterfile() {
    if !should_run() {
        return;
    }
    scenarios::init_tracing();

    reset_cluster().await;

    let manifest =
        scenarios::TempManifest::new(scenarios::clusterfile_yaml("default", &CLUSTER_IMAGES).as_bytes())
            .unwrap();
    apply_clusterfile(manifest.path()).await;
    check_images_listed().await;

    verify_cluster_state().await;
}

#[tokio::test]
#[ignore = "requires a host with the cluster lifecycle tool installed"]
async fn gen_single_node_clusterfile() {
    if !should_run() {
        return;
    }
    scenarios::init_tracing();

    reset_cluster().await;

    let generated = scenarios::GeneratedPath::new("e2e-clusterfile");
    let output = run_and_check(&scenarios::gen_cmd(&CLUSTER_IMAGES, generated.path()), 0)
        .await
        .unwrap();
    assert!(
        generated.exists(),
        "{} should have been generated; stdout: {}",
        generated.path().display(),
        output.stdout_lossy()
    );

    apply_clusterfile(generated.path()).await;
    check_images_listed().await;
}

/// The cluster observation half of the scenario: one node whose internal
/// address is this host, a fetchable discovery document, a ready default
/// service account, and a full pod lifecycle.
async fn verify_cluster_state() {
    let api = ClusterApi::new().await.unwrap();

    let nodes = api.list_nodes().await.unwrap();
    assert_eq!(nodes.len(), 1, "expected a single-node cluster: {nodes:?}");
    let local = scenarios::local_ipv4().unwrap();
    assert!(
        nodes[0].internal_ips.contains(&local),
        "node {nodes:?} does not report the local address {local}"
    );

    let info = api.cluster_info().await.unwrap();
    assert!(!info.is_empty(), "discovery document should not be empty");

    let unmatched = api
        .list_node_ip_by_label("k8s-e2e.invalid/no-such-label=true")
        .await
        .unwrap();
    assert!(unmatched.is_empty());

    api.wait_for_service_account_ready("default", SERVICE_ACCOUNT_TIMEOUT)
        .await
        .unwrap();

    exercise_pod_lifecycle(&api).await;
}

#[allow(tail_expr_drop_order)]
async fn exercise_pod_lifecycle(api: &ClusterApi) {
    let name = format!("e2e-pod-{}", scenarios::rand_suffix(5));
    info!(%name, "creating workload pod");

    let created = api
        .create_custom_pod(&name, "e2e", POD_IMAGE, &["sleep", "3600"])
        .await
        .unwrap();
    assert_eq!(created.name, name);

    api.wait_for_pod_phase(&name, PodPhase::Running, POD_RUNNING_TIMEOUT)
        .await
        .unwrap();

    let fetched = api.get_pod(&name).await.unwrap();
    assert_eq!(fetched.name, name);
    assert_eq!(fetched.phase, PodPhase::Running);

    // A second pod under the same name must surface the API's conflict.
    let conflict = api
        .create_custom_pod(&name, "e2e", POD_IMAGE, &["sleep", "3600"])
        .await
        .unwrap_err();
    assert!(conflict.is_conflict(), "expected 409, got: {conflict}");

    api.delete_pod(&name).await.unwrap();

    // Foreground delete with zero grace period; the pod may need a moment
    // to disappear from the API before the not-found is observable.
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    loop {
        match api.get_pod(&name).await {
            Err(err) if err.is_not_found() => break,
            Ok(_) | Err(_) if std::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(pod) => panic!("pod {name} still present after delete: {pod:?}"),
            Err(err) => panic!("unexpected error fetching deleted pod {name}: {err}"),
        }
    }
}
