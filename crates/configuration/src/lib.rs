use crate::error::ConfigError;
use config::builder::DefaultState;
use config::ConfigBuilder;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod telemetry;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, Logging, RouterSettings, Storage};
pub use telemetry::init_tracing;

/// The file read by [`load_config`].
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment overrides, e.g. `META_EXCHANGE__STORAGE__EXCHANGES_DIR`.
pub const ENV_PREFIX: &str = "META_EXCHANGE";

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the configuration file,
/// deserializes it into our strongly-typed `Config` struct, and returns it.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Loads the configuration from `path`, layering environment overrides on top.
///
/// A missing file is not an error: every setting has a default.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    finish(builder)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.build()?.try_deserialize::<Config>()?;
    validate(&config)?;
    Ok(config)
}

/// Rejects settings that deserialize but cannot work.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.storage.exchanges_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.exchanges_dir must not be empty".to_string(),
        ));
    }
    if config.logging.file_prefix.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "logging.file_prefix must not be empty".to_string(),
        ));
    }
    tracing_subscriber::EnvFilter::try_new(&config.logging.level)
        .map_err(|e| ConfigError::ValidationError(format!("logging.level: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::TieBreak;
    use std::path::PathBuf;

    fn parse(toml: &str) -> Result<Config, ConfigError> {
        finish(
            config::Config::builder()
                .add_source(config::File::from_str(toml, config::FileFormat::Toml)),
        )
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse("").unwrap();

        assert_eq!(config.storage.exchanges_dir, PathBuf::from("exchanges"));
        assert!(config.storage.pretty);
        assert_eq!(config.router.tie_break, TieBreak::ExchangeId);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(
            r#"
            [storage]
            exchanges_dir = "data/venues"
            pretty = false

            [router]
            tie_break = "largest_amount"

            [logging]
            level = "router=debug,info"
            directory = "logs"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.exchanges_dir, PathBuf::from("data/venues"));
        assert!(!config.storage.pretty);
        assert_eq!(config.router.tie_break, TieBreak::LargestAmount);
        assert_eq!(config.logging.directory, Some(PathBuf::from("logs")));
    }

    #[test]
    fn unknown_tie_break_is_rejected() {
        let result = parse("[router]\ntie_break = \"coin_flip\"");
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn empty_exchanges_dir_fails_validation() {
        let result = parse("[storage]\nexchanges_dir = \"\"");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config_from(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.router.tie_break, TieBreak::ExchangeId);
    }
}
