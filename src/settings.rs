//! Persistent dashboard settings stored as TOML in the application directory.

mod config_defaults;
mod config_io;
mod config_types;

pub use config_io::{
    CONFIG_FILE_NAME, config_path, load_or_default, load_settings_from, save_to_path,
};
pub use config_types::{AppSettings, ConfigError, DataSettings, ModelSettings, ViewSettings};
