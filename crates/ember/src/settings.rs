//! Application settings

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use embercache::CacheConfig;
use serde::{Deserialize, Serialize};

/// Engine name reported to the graphics context
pub const ENGINE_NAME: &str = "Ember Engine";

/// Engine version
pub const ENGINE_VERSION: Version = Version::new(0, 1, 0);

/// Target graphics API version
pub const API_VERSION: Version = Version::new(1, 0, 2);

/// Presentation surface extension, always requested
pub const SURFACE_EXTENSION: &str = "VK_KHR_surface";

/// Semantic version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major version (10 bits when packed)
    pub major: u32,
    /// Minor version (10 bits when packed)
    pub minor: u32,
    /// Patch version (12 bits when packed)
    pub patch: u32,
}

impl Version {
    /// Create a version
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Graphics API encoding: `major << 22 | minor << 12 | patch`
    pub fn packed(&self) -> u32 {
        (self.major << 22) | (self.minor << 12) | self.patch
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parts: Vec<&str> = digits.split('.').collect();
        if parts.len() != 3 {
            bail!("invalid version '{}': expected major.minor.patch", s);
        }

        let field = |part: &str, name: &str, bits: u32| -> Result<u32> {
            let value: u32 = part
                .parse()
                .with_context(|| format!("invalid {} component in version '{}'", name, s))?;
            if value >= 1 << bits {
                bail!("{} component {} of version '{}' exceeds {} bits", name, value, s, bits);
            }
            Ok(value)
        };

        Ok(Version::new(
            field(parts[0], "major", 10)?,
            field(parts[1], "minor", 10)?,
            field(parts[2], "patch", 12)?,
        ))
    }
}

impl TryFrom<String> for Version {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

fn default_extensions() -> BTreeSet<String> {
    BTreeSet::from([SURFACE_EXTENSION.to_string()])
}

/// Settings for one application run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Application name
    pub app_name: String,

    /// Application version
    pub app_version: Version,

    /// Graphics extensions requested from the context
    #[serde(default = "default_extensions")]
    pub extensions: BTreeSet<String>,

    /// Validation layers requested from the context
    #[serde(default)]
    pub layers: BTreeSet<String>,

    /// Reference cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Stop the main loop after this many frames
    #[serde(default)]
    pub max_frames: Option<u64>,
}

impl AppSettings {
    /// Create settings with defaults for everything but name and version
    pub fn new(app_name: impl Into<String>, app_version: Version) -> Self {
        Self {
            app_name: app_name.into(),
            app_version,
            extensions: default_extensions(),
            layers: BTreeSet::new(),
            cache: CacheConfig::default(),
            max_frames: None,
        }
    }

    /// Load settings from a JSON file
    ///
    /// # Arguments
    /// * `path` - Settings file; `app_name` and `app_version` are required
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;

        settings.extensions.insert(SURFACE_EXTENSION.to_string());
        settings
            .cache
            .validate()
            .with_context(|| format!("invalid cache settings in {}", path.display()))?;
        Ok(settings)
    }

    /// Engine name
    pub fn engine_name(&self) -> &'static str {
        ENGINE_NAME
    }

    /// Engine version
    pub fn engine_version(&self) -> Version {
        ENGINE_VERSION
    }

    /// Target graphics API version
    pub fn api_version(&self) -> Version {
        API_VERSION
    }
}
