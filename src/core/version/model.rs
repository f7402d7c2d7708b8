use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::error::{PanelError, PanelResult};

pub const SERVER_EXECUTABLE: &str = "bedrock_server.exe";
pub const PROPERTIES_FILE: &str = "server.properties";

/// An installed server build: `<install_root>/<id>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerVersion {
    pub id: String,
    pub install_dir: PathBuf,
    pub config_path: PathBuf,
}

impl ServerVersion {
    pub fn new(install_root: &Path, id: &str) -> Self {
        let install_dir = install_root.join(id);
        let config_path = install_dir.join(PROPERTIES_FILE);
        Self {
            id: id.to_string(),
            install_dir,
            config_path,
        }
    }

    pub fn executable_path(&self) -> PathBuf {
        self.install_dir.join(SERVER_EXECUTABLE)
    }
}

/// Check that `version` is four dot-separated non-negative integers,
/// e.g. `1.26.0.25`.
pub fn validate_version_id(version: &str) -> PanelResult<()> {
    let parts: Vec<&str> = version.split('.').collect();
    let valid = parts.len() == 4
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));

    if valid {
        Ok(())
    } else {
        Err(PanelError::InvalidVersion(version.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_four_numeric_components() {
        assert!(validate_version_id("1.26.0.25").is_ok());
        assert!(validate_version_id("0.0.0.0").is_ok());
    }

    #[test]
    fn rejects_malformed_versions() {
        for bad in ["1.26.0", "abc.0.0.0", "", "1.26.0.25.1", "1..0.25", "1.26.0.-1", "1.26.0.+2", " 1.2.3.4"] {
            assert!(
                matches!(validate_version_id(bad), Err(PanelError::InvalidVersion(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn paths_derive_from_install_root() {
        let version = ServerVersion::new(Path::new("/srv/bedrock"), "1.21.50.07");
        assert_eq!(version.install_dir, PathBuf::from("/srv/bedrock/1.21.50.07"));
        assert_eq!(
            version.config_path,
            PathBuf::from("/srv/bedrock/1.21.50.07/server.properties")
        );
        assert_eq!(
            version.executable_path(),
            PathBuf::from("/srv/bedrock/1.21.50.07/bedrock_server.exe")
        );
    }
}
