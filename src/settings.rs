//! Local paths used by the command-line driver.

use std::path::PathBuf;

/// Default location of the exported storage snapshot.
pub fn default_snapshot_path() -> PathBuf {
    data_directory().join("storage.json")
}

/// Get the path to the application data directory.
pub fn data_directory() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    base.join("aad-session")
}
