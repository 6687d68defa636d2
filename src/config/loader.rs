// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Default config file name, looked up in the current working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Assetpipe.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (unknown task references, pipeline cycles, etc.). Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Parse TOML text into a `RawConfigFile`.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks task definitions, references, pipeline cycles and resource keys.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Figure out the project root for a config path.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetpipe.toml"),
///   that directory is the root.
/// - For a bare filename the current working directory is used.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_root_uses_config_parent() {
        assert_eq!(
            project_root(Path::new("site/Assetpipe.toml")),
            PathBuf::from("site")
        );
    }

    #[test]
    fn parse_applies_section_defaults() {
        let raw = parse_str(
            r#"
[task.clean]
action = "clean"
"#,
        )
        .unwrap();
        assert_eq!(raw.config.site, "build");
        assert_eq!(raw.config.debounce_ms, 150);
        assert_eq!(raw.server.port, 3000);
        assert!(raw.server.live_reload);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_str(
            r#"
[task.clean]
action = "clean"
colour = "blue"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("colour"));
    }
}
