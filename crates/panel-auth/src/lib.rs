//! Credential gate for dbpanel.
//!
//! This crate provides:
//! - Login in static-secret or stored-admin mode
//! - Token checks for every protected request
//! - bcrypt hashing on the blocking pool
//! - Admin record storage over the shared connection pool

mod error;
mod gate;
pub mod password;
mod store;

#[cfg(test)]
mod tests;

pub use error::{AuthError, AuthResult};
pub use gate::{CredentialGate, LoginRequest};
pub use password::{hash_password, verify_password, DEFAULT_COST};
pub use store::{AdminRecord, AdminStore, PoolAdminStore};
