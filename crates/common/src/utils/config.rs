use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Loads configuration into a struct from an optional file, then from
/// environment variables named `<ENV_PREFIX>_<FIELD>`, later sources winning.
/// The file format (TOML, YAML, JSON, ...) follows its extension.
pub fn load_config<T: DeserializeOwned>(path: Option<&Path>, env_prefix: &str) -> Result<T> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    let settings = builder
        .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
        .build()
        .context("Failed to build configuration")?;

    settings.try_deserialize::<T>().context("Failed to deserialize configuration")
}
