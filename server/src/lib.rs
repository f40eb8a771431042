//! Wiring for the mentorship booking server binary.
//!
//! - [`config`]: environment configuration
//! - [`app`]: pool, migrations, services and router assembly

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod config;

pub use app::{build_app, DatabaseProbe};
pub use config::Config;
