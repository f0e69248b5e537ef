//! Scenario glue for driving the cluster-lifecycle tool: fixture files,
//! unique names, local-IP discovery, and the command lines each scenario
//! step hands to the executor.

pub use fixture::{clusterfile_yaml, GeneratedPath, TempManifest};
pub use naming::rand_suffix;
pub use net::local_ipv4;

use std::path::Path;

mod fixture;
mod naming;
mod net;

/// Env var overriding the lifecycle tool binary driven by the scenarios.
pub const CLUSTER_TOOL_ENV: &str = "E2E_CLUSTER_TOOL";

const DEFAULT_CLUSTER_TOOL: &str = "sealos";

/// Marker the tool prints after tearing down a cluster.
pub const RESET_SUCCESS_MARKER: &str = "succeeded in deleting current cluster";

/// Marker the tool prints after bringing up a cluster.
pub const APPLY_SUCCESS_MARKER: &str = "succeeded in creating a new cluster";

fn tool_cmd(args: &str) -> String {
    let tool =
        std::env::var(CLUSTER_TOOL_ENV).unwrap_or_else(|_| DEFAULT_CLUSTER_TOOL.to_string());
    format!("sudo {tool} {args}")
}

/// Command line tearing down whatever cluster currently exists.
pub fn reset_cmd() -> String {
    tool_cmd("reset --force")
}

/// Command line applying a Clusterfile manifest.
pub fn apply_cmd(manifest: &Path) -> String {
    tool_cmd(&format!("apply -f {}", manifest.display()))
}

/// Command line generating a Clusterfile for an image list into `out`.
pub fn gen_cmd(images: &[&str], out: &Path) -> String {
    tool_cmd(&format!("gen {} -o {}", images.join(" "), out.display()))
}

/// Command line listing the images the tool has available.
pub fn images_cmd() -> String {
    tool_cmd("images")
}

/// Install the fmt subscriber with the env filter. Safe to call from every
/// test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
