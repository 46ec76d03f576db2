//! System-wide settings: the identity reported by `uname` and the well-known
//! paths the process layer relies on.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read \"{}\"", path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("invalid system configuration")]
    Parse(#[from] toml::de::Error),
}

/// Loaded from TOML; every key is optional.
///
/// ```toml
/// hostname = "devbox"
/// os_name = "vkernel"
/// os_version = "0.1.0"
/// tty_path = "/dev/tty"
/// proc_dir = "/proc"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    /// The terminal device spawned processes get as fds 0, 1 and 2.
    pub tty_path: String,
    /// Where `<pid>/fd/<fd>` links are published.
    pub proc_dir: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            os_name: "vkernel".to_string(),
            os_version: env!("CARGO_PKG_VERSION").to_string(),
            tty_path: "/dev/tty".to_string(),
            proc_dir: "/proc".to_string(),
        }
    }
}

impl SystemConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;

        Self::from_toml_str(&contents)
    }

    /// String-keyed access to the identity values: `hostname`, `os.name`
    /// and `os.version`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "hostname" => Some(&self.hostname),
            "os.name" => Some(&self.os_name),
            "os.version" => Some(&self.os_version),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = SystemConfig::from_toml_str("hostname = \"devbox\"").unwrap();

        assert_eq!(
            config,
            SystemConfig {
                hostname: "devbox".to_string(),
                ..SystemConfig::default()
            }
        );
        assert_eq!(config.tty_path, "/dev/tty");
        assert_eq!(config.proc_dir, "/proc");
    }

    #[test]
    fn empty_document_is_the_default() {
        assert_eq!(SystemConfig::from_toml_str("").unwrap(), SystemConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SystemConfig::from_toml_str("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
    }

    #[test]
    fn lookup_identity_keys() {
        let config = SystemConfig {
            os_name: "Linux".to_string(),
            os_version: "6.1".to_string(),
            ..Default::default()
        };

        assert_eq!(config.lookup("hostname"), Some("localhost"));
        assert_eq!(config.lookup("os.name"), Some("Linux"));
        assert_eq!(config.lookup("os.version"), Some("6.1"));
        assert_eq!(config.lookup("os.arch"), None);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "os_name = \"vkernel\"\nproc_dir = \"/run/proc\"").unwrap();

        let config = SystemConfig::from_file(file.path()).unwrap();
        assert_eq!(config.proc_dir, "/run/proc");

        let err = SystemConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "{err:?}");
    }
}
