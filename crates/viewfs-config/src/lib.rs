use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use viewfs::{ApplicationRoots, OverlayFileProvider, PhysicalStore};

mod logging;

pub use logging::{init_tracing, LoggingConfig};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "VIEWFS_CONFIG";

/// Where the hosting application's module lives, virtually and on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationConfig {
    /// Application name; the module path becomes `Areas/{name}`.
    ///
    /// Mutually exclusive with `module_path`.
    #[serde(default)]
    pub name: Option<String>,

    /// Explicit virtual module path (e.g. `Areas/MyApp`).
    #[serde(default)]
    pub module_path: Option<String>,

    /// On-disk directory mapped to the module path. Relative to the config file when relative.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Directory sub-resources resolve against. Defaults to `path`.
    #[serde(default)]
    pub base: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// How often polling change tokens check their file (in milliseconds).
    #[serde(default = "WatchConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WatchConfig {
    fn default_poll_interval_ms() -> u64 {
        viewfs::DEFAULT_POLL_INTERVAL.as_millis() as u64
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::default_poll_interval_ms(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewFsConfig {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory of the file this config was loaded from; anchors relative paths.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep only the message.
        ConfigError::Toml(redact_toml_message(err.message()))
    }
}

/// Removes config values from a toml error message.
///
/// `message()` has no snippet but still quotes scalars, e.g.
/// `invalid type: string "secret", expected u64`. Quoted strings are always redacted. Backticked
/// text is redacted only ahead of `, expected` in messages that echo user input (unknown
/// keys/variants, invalid types/values); field names in `missing field` and in the expected list
/// are kept.
fn redact_toml_message(message: &str) -> String {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let quoted = QUOTED.get_or_init(|| {
        // Escaped quotes inside the value must not end the match early.
        Regex::new(r#""(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'"#)
            .expect("quoted-string regex should compile")
    });
    let mut out = quoted
        .replace_all(message, |caps: &regex::Captures<'_>| {
            if caps[0].starts_with('\'') {
                "'<redacted>'"
            } else {
                "\"<redacted>\""
            }
        })
        .into_owned();

    let echoes_input = ["unknown field", "unknown variant", "invalid type:", "invalid value:"]
        .iter()
        .any(|kind| out.contains(kind));
    if echoes_input {
        let head = &out[..out.find(", expected").unwrap_or(out.len())];
        if let (Some(open), Some(close)) = (head.find('`'), head.rfind('`')) {
            if open < close {
                out.replace_range(open + 1..close, "<redacted>");
            }
        }
    }
    out
}

impl ViewFsConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::load_from_str(&text)?;
        config.config_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(target = "viewfs.config", path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Builds the application roots described by `[application]`.
    pub fn roots(&self) -> Result<ApplicationRoots, ConfigError> {
        let app = &self.application;
        let physical_root = app
            .path
            .as_deref()
            .map(|path| self.anchor(path))
            .ok_or_else(|| ConfigError::Invalid("`application.path` is required".to_owned()))?;

        let roots = match (app.name.as_deref(), app.module_path.as_deref()) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "`application.name` and `application.module_path` are mutually exclusive"
                        .to_owned(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "one of `application.name` or `application.module_path` is required"
                        .to_owned(),
                ))
            }
            (Some(name), None) => {
                if name.trim().is_empty() || name.contains(['/', '\\']) {
                    return Err(ConfigError::Invalid(format!(
                        "`application.name` must be a single non-empty segment, got {name:?}"
                    )));
                }
                ApplicationRoots::for_application(name, physical_root)
            }
            (None, Some(module_path)) => {
                if viewfs::normalize(module_path).is_empty() {
                    return Err(ConfigError::Invalid(
                        "`application.module_path` must not be empty".to_owned(),
                    ));
                }
                ApplicationRoots::new(module_path, physical_root)
            }
        };

        Ok(match app.base.as_deref() {
            Some(base) => roots.with_physical_base(self.anchor(base)),
            None => roots,
        })
    }

    /// Builds an [`OverlayFileProvider`] over the local disk.
    pub fn overlay_provider(&self) -> Result<OverlayFileProvider, ConfigError> {
        let roots = self.roots()?;
        tracing::debug!(
            target = "viewfs.config",
            module_path = roots.module_path(),
            physical_root = %roots.physical_root().display(),
            "configured application roots"
        );
        Ok(
            OverlayFileProvider::new(Arc::new(roots), Arc::new(PhysicalStore::new()))
                .with_poll_interval(self.watch.poll_interval()),
        )
    }

    fn anchor(&self, path: &Path) -> PathBuf {
        match &self.config_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Finds the config file for `dir`.
///
/// `VIEWFS_CONFIG` wins when set; otherwise `viewfs.toml` and then `.viewfs/config.toml` are
/// tried below `dir`.
pub fn discover_config_path(dir: &Path) -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        let explicit = PathBuf::from(explicit);
        return Some(if explicit.is_relative() {
            dir.join(explicit)
        } else {
            explicit
        });
    }

    ["viewfs.toml", ".viewfs/config.toml"]
        .into_iter()
        .map(|candidate| dir.join(candidate))
        .find(|candidate| candidate.is_file())
}

/// Loads the config for `dir`, or the defaults when no file is found.
pub fn load_for_dir(dir: &Path) -> Result<ViewFsConfig, ConfigError> {
    match discover_config_path(dir) {
        Some(path) => ViewFsConfig::load_from_path(path),
        None => Ok(ViewFsConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ViewFsConfig::load_from_str("").unwrap();
        assert_eq!(config, ViewFsConfig::default());
        assert_eq!(config.watch.poll_interval(), Duration::from_secs(4));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn name_builds_areas_module_path() {
        let config = ViewFsConfig::load_from_str(
            r#"
[application]
name = "Blog"
path = "/srv/blog"
"#,
        )
        .unwrap();
        let roots = config.roots().unwrap();
        assert_eq!(roots.module_path(), "Areas/Blog");
        assert_eq!(roots.physical_base(), Path::new("/srv/blog"));
    }

    #[test]
    fn explicit_module_path_and_base() {
        let config = ViewFsConfig::load_from_str(
            r#"
[application]
module_path = "/areas/app/"
path = "/srv/app"
base = "/srv/app/content"

[watch]
poll_interval_ms = 0
"#,
        )
        .unwrap();
        let roots = config.roots().unwrap();
        assert_eq!(roots.module_root(), "areas/app/");
        assert_eq!(roots.physical_root(), Path::new("/srv/app"));
        assert_eq!(roots.physical_base(), Path::new("/srv/app/content"));
        assert_eq!(config.watch.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn rejects_ambiguous_or_missing_module() {
        for text in [
            "[application]\npath = \"/srv\"",
            "[application]\npath = \"/srv\"\nname = \"A\"\nmodule_path = \"Areas/A\"",
            "[application]\npath = \"/srv\"\nname = \"A/B\"",
            "[application]\npath = \"/srv\"\nmodule_path = \"//\"",
            "[application]\nname = \"A\"",
        ] {
            let config = ViewFsConfig::load_from_str(text).unwrap();
            assert!(
                matches!(config.roots(), Err(ConfigError::Invalid(_))),
                "expected invalid config for {text:?}"
            );
        }
    }

    fn toml_message(text: &str) -> String {
        match ViewFsConfig::load_from_str(text) {
            Err(ConfigError::Toml(message)) => message,
            other => panic!("expected toml error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected_without_echoing_input() {
        let message = toml_message("[application]\nsecret_typo = \"hunter2\"");
        assert!(message.contains("unknown field"), "{message}");
        assert!(!message.contains("secret_typo"), "{message}");
        assert!(!message.contains("hunter2"), "{message}");
    }

    #[test]
    fn type_errors_do_not_echo_values() {
        let message = toml_message("[watch]\npoll_interval_ms = \"hunter2\"");
        assert!(message.contains("invalid type"), "{message}");
        assert!(!message.contains("hunter2"), "{message}");
    }

    #[test]
    fn redaction_keeps_schema_names() {
        assert_eq!(
            redact_toml_message(r#"invalid type: string "a\"b", expected u64"#),
            r#"invalid type: string "<redacted>", expected u64"#
        );
        assert_eq!(
            redact_toml_message("unknown field `token`, expected one of `name`, `path`"),
            "unknown field `<redacted>`, expected one of `name`, `path`"
        );
        assert_eq!(redact_toml_message("missing field `path`"), "missing field `path`");
    }
}
