//! # CLI Module
//!
//! Command-line access to a configured service.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! ```bash
//! jsonrest routes --config handler.yaml
//! ```
//!
//! ### `call`
//!
//! ```bash
//! jsonrest call --config handler.yaml --path /echo --body '{"message":"hi"}'
//! jsonrest call --config handler.yaml --path /whoami --login ann
//! ```
//!
//! Prints the status code on the first line and the response body on the second.
//! Logs go to the config's `log_path` unless `JSONREST_LOG_PATH` says otherwise.

mod commands;
#[cfg(test)]
mod tests;

pub use commands::{default_registry, execute, run_cli, Cli, Commands};
