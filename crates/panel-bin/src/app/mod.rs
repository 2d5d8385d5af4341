//! Application wiring and lifecycle management.

mod admin;
mod init;
mod lifecycle;
mod state;

pub use admin::create_admin;
pub use init::run_server;
pub use state::AppState;

#[cfg(test)]
pub use admin::create_admin_in;
#[cfg(test)]
pub use init::{build_gate, serve};
