//! Core library for Storyloom's AI provider gateway.
//!
//! Each module is kept small so the boundaries between responsibilities stay
//! obvious:
//! - [`agents`] resolves providers, maps models, runs fallback and talks to
//!   the provider HTTP APIs.
//! - [`model_manager`] is the entry point feature code calls for completions.
//! - [`settings`] reads the signed-in user and their stored preferences.
//! - [`db`] initialises the SQLite database and applies migrations.
//! - [`errors`] keeps the central error catalogue with stable codes.
//! - [`logging`] writes structured diagnostics to the event log table.
//! - [`services`] builds the long-lived objects once at startup.

pub mod agents;
pub mod db;
pub mod errors;
pub mod logging;
pub mod model_manager;
pub mod services;
pub mod settings;

pub use errors::{Result, StoryError};
