//! Temporary manifest files handed to `kubectl apply -f`

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// A manifest written to a fresh `e2e-test-*.yaml` file in the system temp dir.
///
/// The file is removed by [`TempManifest::close`], which reports removal
/// errors, or silently on drop when an assertion returns early.
#[derive(Debug)]
pub struct TempManifest {
    file: NamedTempFile,
}

impl TempManifest {
    pub fn write(content: &str) -> E2eResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("e2e-test-")
            .suffix(".yaml")
            .tempfile()
            .map_err(E2eError::TempFile)?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(E2eError::TempFile)?;

        debug!("Wrote manifest to {}", file.path().display());
        Ok(Self { file })
    }

    /// Serialize `value` as YAML and write it out.
    pub fn from_value<T: Serialize>(value: &T) -> E2eResult<Self> {
        let content = serde_yaml::to_string(value)?;
        Self::write(&content)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Remove the file now.
    pub fn close(self) -> E2eResult<()> {
        self.file.close().map_err(E2eError::TempFile)
    }
}
