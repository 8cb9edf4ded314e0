use crate::config::error::{ConfigError, Result};
use config::{Config, Environment, File};
use labinv_model::PreparationDefaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the JSON documents live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Defaults applied when preparing materials
    #[serde(default)]
    pub preparation: PreparationDefaults,

    /// Log level and optional log file
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON document per material category
    #[serde(default = "default_material_data_dir")]
    pub material_data_dir: PathBuf,

    /// Directory holding one JSON document per fish dish
    #[serde(default = "default_dish_data_dir")]
    pub dish_data_dir: PathBuf,

    /// Copy the previous version of a document to `<name>.bak` before
    /// overwriting or deleting it
    #[serde(default = "default_true")]
    pub backups: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// Default value functions
fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("labinv")
}
fn default_material_data_dir() -> PathBuf {
    data_root().join("materials")
}
fn default_dish_data_dir() -> PathBuf {
    data_root().join("dishes")
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            material_data_dir: default_material_data_dir(),
            dish_data_dir: default_dish_data_dir(),
            backups: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Expand `~` and `$VAR` references in configured paths and check
    /// values that serde cannot.
    fn finish(mut self) -> Result<Self> {
        self.storage.material_data_dir = expand_path(&self.storage.material_data_dir)?;
        self.storage.dish_data_dir = expand_path(&self.storage.dish_data_dir)?;
        if let Some(file) = self.logging.file.take() {
            self.logging.file = Some(expand_path(&file)?);
        }

        for (name, path) in [
            ("storage.material_data_dir", &self.storage.material_data_dir),
            ("storage.dish_data_dir", &self.storage.dish_data_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        if self.preparation.agarose_expiration_days == 0 {
            return Err(ConfigError::Invalid(
                "preparation.agarose_expiration_days must be at least 1".to_string(),
            ));
        }
        if self.preparation.prepared_by.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "preparation.prepared_by must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Environment prefix; `LABINV_STORAGE__DISH_DATA_DIR` sets
/// `storage.dish_data_dir`.
const ENV_PREFIX: &str = "LABINV";

/// Builds an [`AppConfig`] from built-in defaults, an optional TOML file and
/// `LABINV_*` environment variables, later sources winning.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this file instead of searching the usual locations. The file
    /// must exist.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn load(&self) -> Result<AppConfig> {
        // Defaults go in as a JSON source so partial files only override
        // the keys they name.
        let defaults = serde_json::to_string(&AppConfig::default())?;
        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, config::FileFormat::Json));

        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.clone()));
            }
            builder = builder.add_source(File::from(path.as_path()));
        }

        let merged = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config = merged.try_deserialize::<AppConfig>()?.finish()?;
        tracing::debug!(
            config_path = ?self.config_path,
            material_dir = %config.storage.material_data_dir.display(),
            dish_dir = %config.storage.dish_data_dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// First existing file among `./labinv.toml`,
    /// `<config_dir>/labinv/config.toml` and `~/.labinv.toml`.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            Some(PathBuf::from("labinv.toml")),
            dirs::config_dir().map(|dir| dir.join("labinv").join("config.toml")),
            dirs::home_dir().map(|dir| dir.join(".labinv.toml")),
        ];
        candidates.into_iter().flatten().find(|path| path.exists())
    }

    /// Load using the first config file found, or none.
    pub fn load_default() -> Result<AppConfig> {
        match Self::find_config_file() {
            Some(path) => Self::new().with_file(path).load(),
            None => Self::new().load(),
        }
    }
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let Some(path_str) = path.to_str() else {
        return Ok(path.to_path_buf());
    };

    let home = || {
        dirs::home_dir()
            .ok_or_else(|| ConfigError::Expand("home directory unknown".to_string()))
    };
    let rest = if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = home()?;
        return Ok(home.join(expand_vars(stripped)?));
    } else if path_str == "~" {
        return home();
    } else {
        path_str
    };

    Ok(PathBuf::from(expand_vars(rest)?))
}

fn expand_vars(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let tail = &input[i + 1..];
        let (name, consumed) = if let Some(braced) = tail.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => {
                    return Err(ConfigError::Expand(format!(
                        "unterminated variable reference in {input:?}"
                    )));
                }
            }
        } else {
            let end = tail
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                .unwrap_or(tail.len());
            (&tail[..end], end)
        };
        if name.is_empty() {
            out.push('$');
            continue;
        }
        let value = std::env::var(name)
            .map_err(|e| ConfigError::Expand(format!("{name} referenced in {input:?}: {e}")))?;
        out.push_str(&value);
        for _ in 0..consumed {
            chars.next();
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        unsafe {
            env::remove_var("LABINV_STORAGE__DISH_DATA_DIR");
            env::remove_var("LABINV_STORAGE__MATERIAL_DATA_DIR");
            env::remove_var("LABINV_STORAGE__BACKUPS");
            env::remove_var("LABINV_PREPARATION__AGAROSE_EXPIRATION_DAYS");
        }
    }

    #[test]
    fn defaults_point_at_data_dir() {
        let config = AppConfig::default();
        assert!(config.storage.backups);
        assert!(config.storage.material_data_dir.ends_with("labinv/materials"));
        assert!(config.storage.dish_data_dir.ends_with("labinv/dishes"));
        assert_eq!(config.preparation.agarose_expiration_days, 60);
        assert_eq!(config.preparation.prepared_by, "Lab Staff");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, None);
    }

    #[test]
    #[serial]
    fn load_without_file_uses_defaults() {
        clear_env();
        let config = ConfigLoader::new()
            .load()
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(config.preparation, PreparationDefaults::default());
        assert!(config.storage.backups);
    }

    #[test]
    #[serial]
    fn env_overrides_file_overrides_defaults() {
        clear_env();
        let toml_content = r#"
[storage]
material_data_dir = "/srv/lab/materials"
dish_data_dir = "/srv/lab/dishes"

[preparation]
prepared_by = "Night Shift"
agarose_expiration_days = 30
"#;
        let temp_dir = tempfile::tempdir().unwrap_or_else(|e| panic!("temp dir: {e}"));
        let config_path = temp_dir.path().join("labinv.toml");
        std::fs::write(&config_path, toml_content).unwrap_or_else(|e| panic!("write: {e}"));

        unsafe {
            env::set_var("LABINV_STORAGE__DISH_DATA_DIR", "/tmp/override-dishes");
            env::set_var("LABINV_STORAGE__BACKUPS", "false");
        }

        let config = ConfigLoader::new()
            .with_file(&config_path)
            .load()
            .unwrap_or_else(|e| panic!("{e}"));
        clear_env();

        // env beats file
        assert_eq!(config.storage.dish_data_dir, PathBuf::from("/tmp/override-dishes"));
        assert!(!config.storage.backups);

        assert_eq!(config.storage.material_data_dir, PathBuf::from("/srv/lab/materials"));
        assert_eq!(config.preparation.prepared_by, "Night Shift");
        assert_eq!(config.preparation.agarose_expiration_days, 30);

        assert_eq!(config.preparation.pls_container, "50mL tube");
    }

    #[test]
    #[serial]
    fn zero_expiration_days_is_rejected() {
        clear_env();
        unsafe {
            env::set_var("LABINV_PREPARATION__AGAROSE_EXPIRATION_DAYS", "0");
        }
        let result = ConfigLoader::new().load();
        clear_env();
        assert!(matches!(result, Err(ConfigError::Invalid(_))), "{result:?}");
    }

    #[test]
    fn explicit_file_must_exist() {
        let result = ConfigLoader::new().with_file("/nonexistent/labinv.toml").load();
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    #[serial]
    fn expand_path_resolves_variables() {
        unsafe {
            env::set_var("LABINV_TEST_ROOT", "/data/fish");
        }
        assert_eq!(
            expand_path(Path::new("$LABINV_TEST_ROOT/dishes")).unwrap_or_else(|e| panic!("{e}")),
            PathBuf::from("/data/fish/dishes")
        );
        assert_eq!(
            expand_path(Path::new("${LABINV_TEST_ROOT}_old/x")).unwrap_or_else(|e| panic!("{e}")),
            PathBuf::from("/data/fish_old/x")
        );
        assert_eq!(
            expand_path(Path::new("/plain/$/path")).unwrap_or_else(|e| panic!("{e}")),
            PathBuf::from("/plain/$/path")
        );
        unsafe {
            env::remove_var("LABINV_TEST_ROOT");
        }
        assert!(matches!(
            expand_path(Path::new("$LABINV_TEST_ROOT/dishes")),
            Err(ConfigError::Expand(_))
        ));
        assert!(matches!(
            expand_path(Path::new("${UNCLOSED")),
            Err(ConfigError::Expand(_))
        ));
    }
}
