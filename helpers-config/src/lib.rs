//! # helpers-config
//!
//! Load JSON or TOML config files into serde structs, expanding environment
//! references and secrets along the way.
//!
//! - `${NAME}` and `$NAME` expand from the process environment, then `.env`
//! - `gSecret://<path>` values are fetched from a [`SecretSource`]
//!
//! ```rust,no_run
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Config {
//!     env: String,
//!     db_uri: String,
//! }
//!
//! let config: Config = helpers_config::load_config("config.toml")?;
//! # Ok::<(), helpers_error::Error>(())
//! ```

mod env;
mod expand;
mod loader;
mod secrets;

pub use env::{Env, DEFAULT_ENV_FILE};
pub use expand::expand_env;
pub use loader::{load_config, ConfigLoader, Format};
pub use secrets::{secret_path, MemorySecrets, SecretSource, SECRET_PREFIX};
