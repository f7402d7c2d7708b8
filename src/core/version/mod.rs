pub mod model;
pub mod registry;

pub use model::{validate_version_id, ServerVersion, PROPERTIES_FILE, SERVER_EXECUTABLE};
pub use registry::{list_versions, VersionRegistry};
