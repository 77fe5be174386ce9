//! Library half of the `tax-assistant` binary: configuration, logging and
//! the command implementations.

pub mod app;
pub mod config;
pub mod logging;
