// Library root
// ------------
// This crate exposes the library surface behind the `dcron-cli` binary.
//
// Module responsibilities:
// - `config`: the site configuration file (load, create on first use,
//   write back) and path expansion.
// - `selection`: picks the server of a site to talk to and builds its URI.
// - `cron`: five-field cron pattern validation.
// - `api`: blocking HTTP calls against a dcron node.
// - `logging`: one-shot logging setup from the active site and flags.
// - `cli`, `commands`, `ui`: argument parsing, subcommand flows and
//   terminal output.
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod cron;
pub mod error;
pub mod logging;
pub mod selection;
pub mod ui;

pub use error::{Error, Result};
