//! Build configuration
//!
//! Settings are layered, later layers overriding earlier ones:
//! built-in defaults, the user config file
//! (`<config dir>/lazypack/lazypack.toml`), the project `lazypack.toml` (or an
//! explicit `--config` file), `LAZYPACK_*` environment variables, and finally
//! command line flags applied by the binary.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use etcetera::BaseStrategy;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_STYLE_MODE;

pub const PROJECT_CONFIG_FILE: &str = "lazypack.toml";

/// Language level the emitted code must run on
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceTarget {
    #[default]
    Es2017,
    /// Legacy dialect, requires a down-level transform
    Es5,
}

impl SourceTarget {
    pub fn is_legacy(self) -> bool {
        matches!(self, Self::Es5)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Es2017 => "es2017",
            Self::Es5 => "es5",
        }
    }
}

impl std::str::FromStr for SourceTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "es2017" => Ok(Self::Es2017),
            "es5" => Ok(Self::Es5),
            other => Err(anyhow!("unknown source target '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Output directories; every finished file is written to each of them
    pub destinations: Vec<PathBuf>,
    pub source_target: SourceTarget,
    pub minify_js: bool,
    /// Use content hashes as bundle identifiers
    pub hash_file_names: bool,
    pub hashed_file_name_length: usize,
    /// Appended to every bundle identifier, e.g. `.system`
    pub bundle_suffix: String,
    pub default_style_mode: String,
    /// Fail the build when a core bundle lacks the lazy data placeholder
    pub require_lazy_data_placeholder: bool,
    /// Program and arguments of the down-level transformer (code on stdin/stdout)
    pub transpile_command: Option<Vec<String>>,
    /// Program and arguments of the minifier (code on stdin/stdout)
    pub minify_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destinations: vec![PathBuf::from("dist")],
            source_target: SourceTarget::default(),
            minify_js: false,
            hash_file_names: false,
            hashed_file_name_length: 8,
            bundle_suffix: String::new(),
            default_style_mode: DEFAULT_STYLE_MODE.to_owned(),
            require_lazy_data_placeholder: false,
            transpile_command: None,
            minify_command: None,
        }
    }
}

impl Config {
    /// Load the layered configuration
    ///
    /// `explicit` replaces the project file lookup in `project_dir`. An
    /// explicit file that does not exist is an error; missing implicit files
    /// are skipped.
    pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<Self> {
        Self::load_with_user_config(user_config_path().as_deref(), explicit, project_dir)
    }

    /// [`Config::load`] with the user config file at `user_config`
    pub fn load_with_user_config(
        user_config: Option<&Path>,
        explicit: Option<&Path>,
        project_dir: &Path,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_path) = user_config.filter(|path| path.is_file()) {
            debug!("Applying user config {}", user_path.display());
            ConfigLayer::from_file(user_path)?.apply(&mut config);
        }

        match explicit {
            Some(path) => {
                debug!("Applying config {}", path.display());
                ConfigLayer::from_file(path)?.apply(&mut config);
            }
            None => {
                let project_path = project_dir.join(PROJECT_CONFIG_FILE);
                if project_path.is_file() {
                    debug!("Applying project config {}", project_path.display());
                    ConfigLayer::from_file(&project_path)?.apply(&mut config);
                }
            }
        }

        ConfigLayer::from_env()?.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.destinations.is_empty() {
            return Err(anyhow!("at least one output destination is required"));
        }
        if self.default_style_mode.is_empty() {
            return Err(anyhow!("default-style-mode must not be empty"));
        }
        if !(4..=64).contains(&self.hashed_file_name_length) {
            return Err(anyhow!(
                "hashed-file-name-length must be between 4 and 64, got {}",
                self.hashed_file_name_length
            ));
        }
        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    etcetera::choose_base_strategy()
        .ok()
        .map(|strategy| strategy.config_dir().join("lazypack").join(PROJECT_CONFIG_FILE))
}

/// One configuration source; unset fields leave the lower layer untouched
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLayer {
    destinations: Option<Vec<PathBuf>>,
    source_target: Option<SourceTarget>,
    minify_js: Option<bool>,
    hash_file_names: Option<bool>,
    hashed_file_name_length: Option<usize>,
    bundle_suffix: Option<String>,
    default_style_mode: Option<String>,
    require_lazy_data_placeholder: Option<bool>,
    transpile_command: Option<Vec<String>>,
    minify_command: Option<Vec<String>>,
}

impl ConfigLayer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `LAZYPACK_*` variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bool_var = |key: &str| -> Result<Option<bool>> {
            lookup(key)
                .map(|value| parse_bool(&value).with_context(|| format!("Invalid value for {key}")))
                .transpose()
        };

        Ok(Self {
            destinations: lookup("LAZYPACK_DESTINATIONS")
                .map(|value| std::env::split_paths(&value).collect()),
            source_target: lookup("LAZYPACK_SOURCE_TARGET")
                .map(|value| value.parse())
                .transpose()?,
            minify_js: bool_var("LAZYPACK_MINIFY_JS")?,
            hash_file_names: bool_var("LAZYPACK_HASH_FILE_NAMES")?,
            hashed_file_name_length: lookup("LAZYPACK_HASHED_FILE_NAME_LENGTH")
                .map(|value| {
                    value
                        .parse()
                        .context("Invalid value for LAZYPACK_HASHED_FILE_NAME_LENGTH")
                })
                .transpose()?,
            bundle_suffix: lookup("LAZYPACK_BUNDLE_SUFFIX"),
            default_style_mode: lookup("LAZYPACK_DEFAULT_STYLE_MODE"),
            require_lazy_data_placeholder: bool_var("LAZYPACK_REQUIRE_LAZY_DATA_PLACEHOLDER")?,
            transpile_command: None,
            minify_command: None,
        })
    }

    pub fn apply(self, config: &mut Config) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }

        overlay!(
            destinations,
            source_target,
            minify_js,
            hash_file_names,
            hashed_file_name_length,
            bundle_suffix,
            default_style_mode,
            require_lazy_data_placeholder,
        );

        if self.transpile_command.is_some() {
            config.transpile_command = self.transpile_command;
        }
        if self.minify_command.is_some() {
            config.minify_command = self.minify_command;
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_toml_layer_overrides_only_set_fields() {
        let layer = ConfigLayer::from_toml(
            r#"
            destinations = ["www/build", "dist/esm"]
            source-target = "es5"
            minify-js = true
            "#,
        )
        .unwrap();

        let mut config = Config::default();
        layer.apply(&mut config);

        assert_eq!(
            config.destinations,
            vec![PathBuf::from("www/build"), PathBuf::from("dist/esm")]
        );
        assert_eq!(config.source_target, SourceTarget::Es5);
        assert!(config.minify_js);
        assert_eq!(config.default_style_mode, DEFAULT_STYLE_MODE);
        assert_eq!(config.hashed_file_name_length, 8);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(ConfigLayer::from_toml("minify = true").is_err());
    }

    #[test]
    fn test_env_layer() {
        let vars: HashMap<&str, &str> = [
            ("LAZYPACK_MINIFY_JS", "yes"),
            ("LAZYPACK_SOURCE_TARGET", "ES5"),
            ("LAZYPACK_BUNDLE_SUFFIX", ".system"),
        ]
        .into_iter()
        .collect();

        let layer =
            ConfigLayer::from_lookup(|key| vars.get(key).map(|value| (*value).to_owned())).unwrap();
        let mut config = Config::default();
        layer.apply(&mut config);

        assert!(config.minify_js);
        assert_eq!(config.source_target, SourceTarget::Es5);
        assert_eq!(config.bundle_suffix, ".system");
    }

    #[test]
    fn test_env_layer_rejects_bad_bool() {
        let result = ConfigLayer::from_lookup(|key| {
            (key == "LAZYPACK_HASH_FILE_NAMES").then(|| "maybe".to_owned())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.destinations.clear();
        assert!(config.validate().is_err());

        let config = Config {
            hashed_file_name_length: 2,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    /// Sets an environment variable for the guard's lifetime, then restores
    /// whatever value it had before
    #[must_use = "EnvVarGuard must be held in scope to ensure cleanup"]
    struct EnvVarGuard {
        key: &'static str,
        original_value: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let original_value = std::env::var(key).ok();
            // SAFETY: only used from #[serial] tests, restored on drop
            unsafe {
                std::env::set_var(key, value);
            }
            Self {
                key,
                original_value,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            // SAFETY: restores the environment captured in `set`
            unsafe {
                match self.original_value.take() {
                    Some(original) => std::env::set_var(self.key, original),
                    None => std::env::remove_var(self.key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_project_file_and_env() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(PROJECT_CONFIG_FILE),
            "hash-file-names = true\nbundle-suffix = \".esm\"\n",
        )
        .unwrap();

        let _suffix = EnvVarGuard::set("LAZYPACK_BUNDLE_SUFFIX", ".cjs");
        let config = Config::load_with_user_config(None, None, temp_dir.path()).unwrap();

        assert!(config.hash_file_names);
        assert_eq!(config.bundle_suffix, ".cjs");
    }

    #[test]
    #[serial]
    fn test_env_guard_restores_previous_value() {
        let _outer = EnvVarGuard::set("LAZYPACK_DEFAULT_STYLE_MODE", "md");
        {
            let _inner = EnvVarGuard::set("LAZYPACK_DEFAULT_STYLE_MODE", "ios");
            assert_eq!(std::env::var("LAZYPACK_DEFAULT_STYLE_MODE").as_deref(), Ok("ios"));
        }
        assert_eq!(std::env::var("LAZYPACK_DEFAULT_STYLE_MODE").as_deref(), Ok("md"));
    }

    #[test]
    #[serial]
    fn test_project_file_overrides_user_file() {
        let temp_dir = TempDir::new().unwrap();
        let user_config = temp_dir.path().join("user.toml");
        fs::write(&user_config, "minify-js = true\nbundle-suffix = \".user\"\n").unwrap();
        fs::write(
            temp_dir.path().join(PROJECT_CONFIG_FILE),
            "bundle-suffix = \".project\"\n",
        )
        .unwrap();

        let config =
            Config::load_with_user_config(Some(&user_config), None, temp_dir.path()).unwrap();

        assert!(config.minify_js);
        assert_eq!(config.bundle_suffix, ".project");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(Config::load_with_user_config(None, Some(&missing), temp_dir.path()).is_err());
    }
}
