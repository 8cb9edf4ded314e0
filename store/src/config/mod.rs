//! Runtime settings: data directories, preparation defaults and logging.
//!
//! Sources are merged in order, later ones winning: built-in defaults, a
//! TOML file, then `LABINV_*` environment variables with `__` between
//! nested keys.
//!
//! ```no_run
//! use labinv_store::config::ConfigLoader;
//!
//! let config = ConfigLoader::load_default()?;
//! println!("dishes live in {}", config.storage.dish_data_dir.display());
//! # Ok::<(), labinv_store::config::ConfigError>(())
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigError, Result};
pub use loader::{AppConfig, ConfigLoader, LoggingConfig, StorageConfig, expand_path};
