//! Service settings and the `.translate.json` file they can be read from.
/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Configuration types and settings
mod types;

pub use manager::ConfigManager;
pub use types::{
    ConfigError,
    TranslateSettings,
    ValidationError,
};
