// LogScope - app/artifacts.rs
//
// On-disk export artifacts: creation under unique names, lookup by name,
// lossy preview, and delayed removal.

use crate::core::model::Artifact;
use crate::platform::fs;
use crate::util::constants::{ARTIFACT_EXTENSION, ARTIFACT_PREFIX};
use crate::util::error::{LogScopeError, NotFoundError, ResourceError, ValidationError};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Directory of export artifacts. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a new empty artifact file with a unique name.
    ///
    /// The directory is created on first use.
    pub async fn create(&self) -> Result<(Artifact, tokio::fs::File), ResourceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ResourceError::Io {
                path: self.dir.clone(),
                operation: "create directory",
                source,
            })?;

        let name = format!(
            "{ARTIFACT_PREFIX}{}.{ARTIFACT_EXTENSION}",
            Uuid::new_v4().simple()
        );
        let path = self.dir.join(&name);
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| ResourceError::Io {
                path: path.clone(),
                operation: "create",
                source,
            })?;

        tracing::debug!(path = %path.display(), "Artifact created");
        Ok((Artifact { name, path }, file))
    }

    /// Location of the artifact called `name`.
    ///
    /// Names are plain file names: ASCII letters, digits, `_`, `-` and `.`,
    /// not starting with a dot. Anything else is rejected so a name can never
    /// escape the artifact directory.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, ValidationError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(ValidationError::InvalidArtifactName {
                name: name.to_string(),
            });
        }
        Ok(self.dir.join(name))
    }

    /// First `max_bytes` of an artifact as text.
    pub async fn preview(&self, name: &str, max_bytes: usize) -> Result<String, LogScopeError> {
        let path = self.path_for(name)?;
        match fs::read_prefix_lossy(&path, max_bytes).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(NotFoundError::Artifact {
                name: name.to_string(),
            }
            .into()),
            Err(source) => Err(ResourceError::Io {
                path,
                operation: "preview",
                source,
            }
            .into()),
        }
    }

    /// Delete an artifact now. Returns `false` if it did not exist.
    pub async fn remove(&self, name: &str) -> Result<bool, LogScopeError> {
        let path = self.path_for(name)?;
        fs::remove_if_exists(&path)
            .await
            .map_err(|source| ResourceError::Io {
                path,
                operation: "remove",
                source,
            })
            .map_err(Into::into)
    }

    /// Delete an artifact after `delay` on a background task.
    ///
    /// Must be called from within a tokio runtime. A file that is already
    /// gone when the timer fires is not an error.
    pub fn schedule_removal(
        &self,
        name: &str,
        delay: Duration,
    ) -> Result<JoinHandle<()>, ValidationError> {
        let path = self.path_for(name)?;
        tracing::debug!(
            path = %path.display(),
            delay_secs = delay.as_secs(),
            "Artifact removal scheduled"
        );
        Ok(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match fs::remove_if_exists(&path).await {
                Ok(true) => tracing::info!(path = %path.display(), "Artifact removed"),
                Ok(false) => tracing::debug!(path = %path.display(), "Artifact already gone"),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove artifact"
                ),
            }
        }))
    }
}
