//! Clusterfile fixtures and scoped temp-file bookkeeping.
//!
//! Manifest files are staged as input to the lifecycle tool and removed on
//! every exit path, success or failure, by tying them to guard values.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::rand_suffix;

/// Render a declarative cluster spec for an image list.
pub fn clusterfile_yaml(name: &str, images: &[&str]) -> String {
    let mut out = String::from("apiVersion: apps.sealos.io/v1beta1\nkind: Cluster\n");
    out.push_str(&format!("metadata:\n  name: {name}\n"));
    out.push_str("spec:\n  image:\n");
    for image in images {
        out.push_str("  - ");
        out.push_str(image);
        out.push('\n');
    }
    out
}

/// A manifest staged on disk for the lifecycle tool, deleted on drop.
#[derive(Debug)]
pub struct TempManifest {
    file: NamedTempFile,
}

impl TempManifest {
    pub fn new(content: &[u8]) -> io::Result<Self> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content)?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// A path handed to the tool for a file *it* creates (e.g. `gen -o`),
/// removed on drop if the tool produced it.
#[derive(Debug)]
pub struct GeneratedPath {
    path: PathBuf,
}

impl GeneratedPath {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!("{prefix}-{}", rand_suffix(5)));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl Drop for GeneratedPath {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
