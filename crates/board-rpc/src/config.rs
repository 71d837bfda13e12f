//! Server configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. the file given with `--config` (default `board.toml`, optional);
//! 2. `board.<environment>.toml` when `BOARD_ENVIRONMENT` is set (optional);
//! 3. `BOARD_*` environment variables, `__` between nested keys, e.g.
//!    `BOARD_OBSERVABILITY__TRACES_SAMPLE_RATE=0.2`.

use std::path::{Path, PathBuf};

use board_core::Validation;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::{observe::ObservabilityConfig, registrar::Credentials};

pub const ENVIRONMENT_VAR: &str = "BOARD_ENVIRONMENT";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:          String,
  pub rpc_port:      u16,
  pub http_port:     u16,
  pub store_path:    PathBuf,
  pub validation:    Validation,
  pub credentials:   Credentials,
  pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          "0.0.0.0".to_string(),
      rpc_port:      9095,
      http_port:     8080,
      store_path:    PathBuf::from("board.db"),
      validation:    Validation::default(),
      credentials:   Credentials::default(),
      observability: ObservabilityConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let environment = std::env::var(ENVIRONMENT_VAR).ok();

    let mut builder = Config::builder().add_source(File::from(path).required(false));
    if let Some(env) = &environment {
      builder = builder
        .set_default("observability.environment", env.as_str())?
        .add_source(File::with_name(&format!("board.{env}")).required(false));
    }

    builder
      .add_source(
        Environment::with_prefix("BOARD")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn rpc_address(&self) -> String { format!("{}:{}", self.host, self.rpc_port) }

  pub fn http_address(&self) -> String { format!("{}:{}", self.host, self.http_port) }
}
