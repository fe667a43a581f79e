use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{QueueError, QueueResult};

/// Source of the persistent id that tells apart worker instances sharing a name.
///
/// Implementations resolve the id once and hand out the same value for the
/// rest of the process lifetime.
pub trait IdentityProvider: Send + Sync {
    fn internal_id(&self) -> QueueResult<Uuid>;
}

/// Identity stored in a local file, created with a random UUID on first use.
pub struct FileIdentityProvider {
    path: PathBuf,
    resolved: OnceLock<Uuid>,
}

impl FileIdentityProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), resolved: OnceLock::new() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_or_create(&self) -> QueueResult<Uuid> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path).map_err(|e| {
                QueueError::Identity(format!("Failed to read identity file {}: {}", self.path.display(), e))
            })?;
            let first_line = content.lines().next().unwrap_or_default().trim();
            let id = Uuid::parse_str(first_line).map_err(|e| {
                QueueError::Identity(format!("Invalid worker id in {}: {}", self.path.display(), e))
            })?;
            debug!(path = %self.path.display(), internal_id = %id, "Loaded worker identity");
            return Ok(id);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                QueueError::Identity(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        let id = Uuid::new_v4();
        std::fs::write(&self.path, format!("{}\n", id)).map_err(|e| {
            QueueError::Identity(format!("Failed to write identity file {}: {}", self.path.display(), e))
        })?;
        info!(path = %self.path.display(), internal_id = %id, "Created new worker identity");
        Ok(id)
    }
}

impl IdentityProvider for FileIdentityProvider {
    fn internal_id(&self) -> QueueResult<Uuid> {
        if let Some(id) = self.resolved.get() {
            return Ok(*id);
        }
        let id = self.load_or_create()?;
        Ok(*self.resolved.get_or_init(|| id))
    }
}

/// Fixed identity, for embedding and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticIdentityProvider(pub Uuid);

impl IdentityProvider for StaticIdentityProvider {
    fn internal_id(&self) -> QueueResult<Uuid> {
        Ok(self.0)
    }
}
