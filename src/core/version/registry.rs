use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::model::{ServerVersion, SERVER_EXECUTABLE};
use crate::core::error::{PanelError, PanelResult};

/// List one `ServerVersion` per immediate subdirectory of `install_root`,
/// in directory-listing order. A missing root is an empty list.
pub async fn list_versions(install_root: &Path) -> PanelResult<Vec<ServerVersion>> {
    let mut versions = Vec::new();

    if !install_root.exists() {
        debug!("Install root {:?} does not exist yet", install_root);
        return Ok(versions);
    }

    let mut entries = tokio::fs::read_dir(install_root)
        .await
        .map_err(|e| PanelError::io(install_root, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PanelError::io(install_root, e))?
    {
        let is_dir = match entry.file_type().await {
            Ok(file_type) => file_type.is_dir(),
            Err(e) => {
                warn!("Cannot stat {:?}: {}", entry.path(), e);
                continue;
            }
        };
        if !is_dir {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(id) => versions.push(ServerVersion::new(install_root, &id)),
            Err(name) => warn!("Skipping non UTF-8 directory {:?}", name),
        }
    }

    Ok(versions)
}

/// Installed versions under one root plus the currently selected one.
///
/// Only the registry mutates its selection; everyone else reads it through
/// `selected()`.
pub struct VersionRegistry {
    install_root: PathBuf,
    versions: Vec<ServerVersion>,
    selected: Option<usize>,
}

impl VersionRegistry {
    /// Scan `install_root` and select the first version found, if any.
    pub async fn new(install_root: PathBuf) -> PanelResult<Self> {
        let mut registry = Self {
            install_root,
            versions: Vec::new(),
            selected: None,
        };
        registry.refresh().await?;
        Ok(registry)
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn versions(&self) -> &[ServerVersion] {
        &self.versions
    }

    pub fn selected(&self) -> Option<&ServerVersion> {
        self.selected.map(|index| &self.versions[index])
    }

    /// Re-scan the install root. The current selection survives when its
    /// directory still exists; otherwise the first entry is selected.
    pub async fn refresh(&mut self) -> PanelResult<&[ServerVersion]> {
        let previous = self.selected().map(|v| v.id.clone());
        self.versions = list_versions(&self.install_root).await?;

        self.selected = previous
            .and_then(|id| self.versions.iter().position(|v| v.id == id))
            .or(if self.versions.is_empty() { None } else { Some(0) });

        info!(
            "Found {} server version(s) in {:?}, selected {:?}",
            self.versions.len(),
            self.install_root,
            self.selected().map(|v| v.id.as_str())
        );
        Ok(&self.versions)
    }

    /// Make `id` the active version.
    pub fn select_version(&mut self, id: &str) -> PanelResult<&ServerVersion> {
        let index = self
            .versions
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| PanelError::VersionNotFound(id.to_string()))?;

        self.selected = Some(index);
        debug!("Selected server version {}", id);
        Ok(&self.versions[index])
    }

    /// `<install_root>/<id>/server.properties`
    pub fn config_path(&self, id: &str) -> PathBuf {
        ServerVersion::new(&self.install_root, id).config_path
    }

    /// `<install_root>/<id>/bedrock_server.exe`, whether or not it exists.
    pub fn executable_path(&self, id: &str) -> PathBuf {
        self.install_root.join(id).join(SERVER_EXECUTABLE)
    }
}
