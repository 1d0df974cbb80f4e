/// Cross-platform directory management for hook-taps
///
/// Uses the `dirs` crate to locate the configuration directory following OS
/// conventions:
/// - Linux/Unix: XDG Base Directory Specification
/// - macOS: Apple directory guidelines
/// - Windows: Windows directory standards
use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "hook-taps";

/// Get the config directory for hook-taps
///
/// Returns platform-specific config directory:
/// - Linux: `$XDG_CONFIG_HOME/hook-taps` or `~/.config/hook-taps`
/// - macOS: `~/Library/Application Support/hook-taps`
/// - Windows: `%APPDATA%\hook-taps`
pub fn config_dir() -> Result<PathBuf> {
    let base_dir =
        dirs::config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
    Ok(base_dir.join(APP_DIR))
}

/// Path of the hooks file used when none is given on the command line
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("hooks.toml"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir().unwrap();
        assert!(dir.ends_with(APP_DIR));

        if cfg!(target_os = "linux") {
            let config_str = dir.to_string_lossy();
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                assert!(
                    config_str.starts_with(&xdg_config),
                    "Config directory should start with XDG_CONFIG_HOME: {} but got: {}",
                    xdg_config,
                    config_str
                );
            } else if let Ok(home) = std::env::var("HOME") {
                let expected = format!("{}/.config", home);
                assert!(
                    config_str.starts_with(&expected),
                    "Config directory should start with $HOME/.config: {} but got: {}",
                    expected,
                    config_str
                );
            }
        }
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "hooks.toml");
        assert_eq!(path.parent().unwrap(), config_dir().unwrap());
    }

    #[test]
    fn test_ensure_dir() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
