//! Locally remembered student identity.
//!
//! The chat client keeps exactly one piece of state across runs: the user id,
//! stored as plain text in `{data_dir}/user_id`. Everything else is reloaded
//! from the server on each bootstrap.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stored user id in {path} is not a valid UUID")]
    Corrupt { path: PathBuf },
}

/// File-backed store for the current user id.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    path: PathBuf,
}

impl LocalIdentity {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("user_id"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored user id, or `None` if nobody is signed in.
    pub async fn load(&self) -> Result<Option<Uuid>, IdentityError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(IdentityError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Uuid::parse_str(content.trim())
            .map(Some)
            .map_err(|_| IdentityError::Corrupt {
                path: self.path.clone(),
            })
    }

    pub async fn save(&self, user_id: &Uuid) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| IdentityError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, format!("{user_id}\n"))
            .await
            .map_err(|source| IdentityError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Forget the stored id. Succeeds if there was nothing to forget.
    pub async fn clear(&self) -> Result<(), IdentityError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(IdentityError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
