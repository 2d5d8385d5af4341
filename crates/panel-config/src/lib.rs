//! Configuration, error types, and logging setup for dbpanel.
//!
//! The [`Config`] is assembled exactly once at startup (file, then
//! environment) and passed explicitly to the pool and the credential gate.

mod config;
mod error;
mod logging;

pub use config::{
    AuthConfig, AuthModeSetting, Config, DatabaseConfig, PoolSettings, ServerConfig,
    DEFAULT_ADMIN_TABLE, DEFAULT_BCRYPT_COST, DEFAULT_LOG_LEVEL, DEFAULT_PORT,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
