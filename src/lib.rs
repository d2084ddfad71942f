//! Interactive trading shell for BitMEX.
//!
//! The operator types short commands (`buy 100 9500`, `positions`,
//! `cancel <id>`) at a prompt; the shell parses them, confirms anything that
//! sends an order, forwards them to the exchange and prints the answer as a
//! box-drawing table or pretty JSON.
//!
//! Account reads can be served by polling the REST API or by the realtime
//! account feed; order placement and cancellation always go over REST.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`exchange`]: The [`exchange::Exchange`] trait, REST client, account feed and mock
//! - [`shell`]: Command parsing, confirmation, rendering and the command loop

pub mod config;
pub mod error;
pub mod exchange;
pub mod shell;

pub use config::{Config, Network};
pub use error::{Result, ShellError};
pub use shell::{Shell, Symbol};
