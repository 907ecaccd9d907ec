//! Layered configuration loading on top of figment.
//!
//! Sources, later ones winning:
//!
//! 1. [`SparkConfig::default`]
//! 2. values handed to [`ConfigLoader::merge`]
//! 3. `spark.<profile>.<ext>` next to the base file, if present
//! 4. the base file: either the one given to [`ConfigLoader::file`] or the
//!    first `spark.*` / `config.*` found on the search paths
//! 5. `SPARK_*` environment variables, nested with `__`
//!    (`SPARK_DISPATCH__PIPE_FAILURE=abort` sets `dispatch.pipe_failure`)
//!
//! Which file formats are recognised depends on the `toml-config` (default)
//! and `yaml-config` features.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .file("./config/spark.toml")
//!     .profile("prod")
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SparkConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "SPARK_";
const PROFILE_VAR: &str = "SPARK_PROFILE";
const APP_DIR: &str = "spark";

/// Deployment profile; selects the optional `spark.<profile>.<ext>` overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads `SPARK_PROFILE`. Unset means [`Profile::Development`].
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::from(name.as_str()))
            .unwrap_or_default()
    }
}

impl From<&str> for Profile {
    fn from(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "dev" | "development" => Self::Development,
            "prod" | "production" => Self::Production,
            _ => Self::Custom(name),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration file syntax enabled at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    const ENABLED: &'static [FileFormat] = &[
        #[cfg(feature = "toml-config")]
        FileFormat::Toml,
        #[cfg(feature = "yaml-config")]
        FileFormat::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(figment::providers::Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(figment::providers::Yaml::file(path)),
        }
    }
}

/// Builds a [`SparkConfig`] from layered sources.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    explicit_file: Option<PathBuf>,
    read_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader with the profile taken from `SPARK_PROFILE` and env reading on.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            explicit_file: None,
            read_env: true,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::from(profile.as_ref());
        self
    }

    /// Adds a directory to look for configuration files in.
    pub fn search_path<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.search_paths.push(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<user config dir>/spark`, e.g. `~/.config/spark` on Linux.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(APP_DIR)),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layers `config` over the defaults, below every file and the environment.
    pub fn merge(mut self, config: SparkConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<SparkConfig> {
        let profile = self.profile.clone();
        let config: SparkConfig = self.figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            %profile,
            prefix = %config.bot.prefix,
            pipe_failure = ?config.dispatch.pipe_failure,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(self) -> ConfigResult<Figment> {
        let mut figment =
            Figment::from(Serialized::defaults(SparkConfig::default())).merge(self.overrides.clone());

        figment = match &self.explicit_file {
            Some(path) => self.merge_explicit(figment, path)?,
            None => self.merge_searched(figment),
        };

        if self.read_env {
            trace!(prefix = ENV_PREFIX, "Reading environment overrides");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }
        Ok(figment)
    }

    fn merge_explicit(&self, figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let format = FileFormat::for_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        info!(path = %path.display(), "Loading configuration file");
        Ok(format.merge_into(figment, path))
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join(APP_DIR)))
            .collect()
    }

    /// For each enabled format, merges the first base file found on the
    /// search paths, preceded by its profile overlay.
    fn merge_searched(&self, mut figment: Figment) -> Figment {
        let dirs = self.search_dirs();
        let mut found = false;

        for &format in FileFormat::ENABLED {
            if let Some((overlay, base)) = self.find_files(format, &dirs) {
                if let Some(overlay) = overlay {
                    debug!(path = %overlay.display(), "Loading profile overlay");
                    figment = format.merge_into(figment, &overlay);
                }
                info!(path = %base.display(), "Loading configuration file");
                figment = format.merge_into(figment, &base);
                found = true;
            }
        }

        if !found {
            warn!(paths = ?dirs, "No configuration file found, using defaults");
        }
        figment
    }

    /// Returns the first `(profile overlay, base file)` pair for `format`.
    fn find_files(&self, format: FileFormat, dirs: &[PathBuf]) -> Option<(Option<PathBuf>, PathBuf)> {
        for dir in dirs {
            for stem in ["spark", "config"] {
                for ext in format.extensions() {
                    let base = dir.join(format!("{stem}.{ext}"));
                    if base.exists() {
                        let overlay = dir.join(format!("{stem}.{}.{ext}", self.profile));
                        return Some((overlay.exists().then_some(overlay), base));
                    }
                }
            }
        }
        None
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<SparkConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SparkConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
