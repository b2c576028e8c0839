/*
 * vSMTP mail transfer agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

//! Configuration of mailsign, written in a rhai script.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

/// Signing parameters.
pub mod dkim;
/// Errors of the configuration.
pub mod error;
/// Logging parameters and subscriber.
pub mod logs;

pub use dkim::DkimConfig;
pub use error::ConfigError;
pub use logs::{init_logs, Logs};

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, error::ConfigError>;

/// Getters for base configuration structures.
pub trait Config: serde::Serialize + serde::de::DeserializeOwned + Sized {
    /// Create a default configuration with the path of the script passed
    /// as parameter.
    ///
    /// This function provide the Rhai context with the returned configuration.
    /// Prefer to set any defaults in this function before it can be set by the
    /// user.
    ///
    /// # Errors
    fn with_path(path: &impl AsRef<std::path::Path>) -> ConfigResult<Self>;

    /// Create a configuration structure from a rhai file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the rhai script to create the configuration from.
    ///            The resolve path used is the parent of directory of this path.
    ///
    /// # Errors
    ///
    /// * the file cannot be read
    /// * see [`Config::from_rhai_script`]
    fn from_rhai_file(path: &impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let path_ref = path.as_ref();

        let config_dir = std::path::PathBuf::from(
            path_ref
                .parent()
                .ok_or_else(|| error::ConfigError::InvalidParentDirectory(path_ref.into()))?,
        );

        let script = std::fs::read_to_string(path_ref)
            .map_err(|error| error::ConfigError::FileOpen(path_ref.into(), error))?;

        Self::from_rhai_script(path, script, Some(&config_dir))
    }

    /// Create a configuration structure from a rhai script.
    ///
    /// The script must define `fn on_config(config)`, receiving the default
    /// configuration as an object map and returning the one to use.
    ///
    /// # Arguments
    ///
    /// * `script` - The rhai script to use to generate the config.
    /// * `resolve_path` - Path to resolve modules from.
    ///
    /// # Errors
    ///
    /// * the script does not compile, or fails
    /// * the returned map is not a valid configuration
    fn from_rhai_script(
        path: &impl AsRef<std::path::Path>,
        script: impl AsRef<str>,
        resolve_path: Option<&std::path::PathBuf>,
    ) -> ConfigResult<Self> {
        let script = script.as_ref();
        let mut engine = rhai::Engine::new();

        if let Some(resolve_path) = resolve_path.as_ref() {
            engine.set_module_resolver(
                rhai::module_resolvers::FileModuleResolver::new_with_path_and_extension(
                    resolve_path,
                    "rhai",
                ),
            );
        }

        let ast = engine.compile(script)?;

        let cfg = Self::with_path(path)?;
        let cfg = serde_json::to_string(&cfg)?;
        let cfg = rhai::Engine::new().parse_json(cfg, true)?;
        let cfg =
            engine.call_fn::<rhai::Map>(&mut rhai::Scope::new(), &ast, "on_config", (cfg,))?;
        let cfg = serde_json::to_string(&cfg)?;
        let mut cfg = serde_json::Deserializer::from_str(&cfg);
        let mut cfg: Self = serde_path_to_error::deserialize(&mut cfg)?;
        cfg.set_path(path.as_ref());

        tracing::debug!(path = %path.as_ref().display(), "Configuration loaded.");
        Ok(cfg)
    }

    /// Log configuration.
    fn logs(&self) -> &logs::Logs;

    /// Path on disk of the configuration file.
    fn path(&self) -> &std::path::Path;

    /// Restore the path, which is not part of the serialized configuration.
    fn set_path(&mut self, path: &std::path::Path);
}

/// Configuration of the `mailsign` program.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailsignConfig {
    /// Signing parameters, messages are not signed if absent.
    #[serde(default)]
    pub dkim: Option<DkimConfig>,
    /// logging configuration.
    #[serde(default)]
    pub logs: Logs,
    /// Path to the configuration script.
    #[serde(skip)]
    pub path: std::path::PathBuf,
}

impl MailsignConfig {
    /// Build the signing configuration, the key path being relative to the
    /// directory of the script.
    ///
    /// # Errors
    ///
    /// * see [`DkimConfig::build`]
    pub fn signing_config(&self) -> ConfigResult<Option<mailsign_auth::dkim::SigningConfig>> {
        let base = self.path.parent().unwrap_or_else(|| std::path::Path::new(""));

        self.dkim
            .as_ref()
            .map(|dkim| dkim.build(base).map_err(Into::into))
            .transpose()
    }
}

impl Config for MailsignConfig {
    #[allow(clippy::field_reassign_with_default)]
    fn with_path(path: &impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let mut config = Self::default();
        config.path = path.as_ref().into();

        Ok(config)
    }

    fn logs(&self) -> &logs::Logs {
        &self.logs
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn set_path(&mut self, path: &std::path::Path) {
        self.path = path.into();
    }
}
