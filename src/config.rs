//! Registration parameters for the host VFS
//!
//! The defaults match what SQLite expects from a general purpose VFS. A
//! config can also be loaded from TOML:
//!
//! ```toml
//! name = "hostvfs"
//! max_pathname = 1024
//! make_default = false
//! ```

use crate::error::{Result, VfsError};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Name the adapter registers under when none is configured
pub const DEFAULT_VFS_NAME: &str = "hostvfs";

/// Default `mxPathname` advertised to SQLite
pub const DEFAULT_MAX_PATHNAME: usize = 1024;

/// VFS registration parameters
///
/// # Examples
///
/// ```
/// use hostvfs::VfsConfig;
///
/// let config = VfsConfig::new().name("game-saves").max_pathname(512);
/// config.validate().unwrap();
/// assert_eq!(config.name, "game-saves");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Name SQLite resolves the VFS by
    pub name: String,

    /// Maximum path length advertised to SQLite (excluding the NUL)
    pub max_pathname: usize,

    /// Register as the process default VFS
    pub make_default: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        VfsConfig {
            name: DEFAULT_VFS_NAME.to_string(),
            max_pathname: DEFAULT_MAX_PATHNAME,
            make_default: false,
        }
    }
}

impl VfsConfig {
    /// Allowed characters in a VFS name
    const NAME_PATTERN: &'static str = r"^[A-Za-z0-9_-]+$";

    /// Longest VFS name accepted
    const MAX_NAME_LENGTH: usize = 64;

    /// Bounds for `max_pathname`
    const MIN_PATHNAME: usize = 64;
    const MAX_PATHNAME: usize = 65536;

    pub fn new() -> Self {
        Self::default()
    }

    /// Set the registered name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the maximum path length
    pub fn max_pathname(mut self, len: usize) -> Self {
        self.max_pathname = len;
        self
    }

    /// Make the VFS the process default on registration
    pub fn make_default(mut self, make_default: bool) -> Self {
        self.make_default = make_default;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: VfsConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against the limits SQLite and the adapter rely on
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(VfsError::InvalidConfig(
                "name cannot be empty".to_string(),
            ));
        }

        if self.name.len() > Self::MAX_NAME_LENGTH {
            return Err(VfsError::InvalidConfig(format!(
                "name too long (max {} characters)",
                Self::MAX_NAME_LENGTH
            )));
        }

        let re = Regex::new(Self::NAME_PATTERN)
            .map_err(|e| VfsError::InvalidConfig(format!("name pattern: {}", e)))?;
        if !re.is_match(&self.name) {
            return Err(VfsError::InvalidConfig(format!(
                "name '{}' may only contain letters, digits, '_' and '-'",
                self.name
            )));
        }

        if !(Self::MIN_PATHNAME..=Self::MAX_PATHNAME).contains(&self.max_pathname) {
            return Err(VfsError::InvalidConfig(format!(
                "max_pathname {} outside {}..={}",
                self.max_pathname,
                Self::MIN_PATHNAME,
                Self::MAX_PATHNAME
            )));
        }

        Ok(())
    }
}
