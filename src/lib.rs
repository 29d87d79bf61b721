//! CityTalk is a terminal chat client for backends that answer
//! natural-language questions about city data over a streaming channel.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the message log, the session lifecycle,
//!   the event-channel connector with its deadline watchdog, and
//!   configuration.
//! - [`ui`] renders the conversation as it streams into a line-oriented
//!   terminal.
//! - [`api`] defines the submission and health payloads exchanged with the
//!   backend.
//! - [`utils`] holds transcript logging and URL plumbing shared by the
//!   other layers.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which initializes and dispatches into
//! [`core::app`] for chat, one-shot, and health commands.

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
