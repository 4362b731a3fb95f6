//! Profiles shipped with the runner
//!
//! Built-in profiles are embedded at compile time and addressed by name.
//! Anything that is not a built-in name is treated as a path.

use isc_profile::{ProfileDocument, ProfileError};
use std::path::Path;

const HA_GCE: &str = include_str!("../profiles/ha-gce.toml");
const HA_SSH: &str = include_str!("../profiles/ha-ssh.toml");

const BUILTIN: &[(&str, &str)] = &[("ha-gce", HA_GCE), ("ha-ssh", HA_SSH)];

/// Source text of a built-in profile
pub fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(builtin_name, _)| *builtin_name == name)
        .map(|(_, source)| *source)
}

/// Names of the built-in profiles
pub fn list() -> Vec<&'static str> {
    BUILTIN.iter().map(|(name, _)| *name).collect()
}

/// Load a built-in profile by name, or a profile file by path
pub fn resolve_profile(name_or_path: &str) -> Result<ProfileDocument, ProfileError> {
    match builtin(name_or_path) {
        Some(source) => {
            isc_profile::log_debug!("Using built-in profile", "profile" => name_or_path);
            ProfileDocument::from_toml_str(source)
        }
        None => ProfileDocument::load_file(Path::new(name_or_path)),
    }
}
