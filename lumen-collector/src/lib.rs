//! Lumen collector library.
//!
//! Exposes the collector's assembly and lifecycle for integration testing.
//! In production, `lumen-collector` is used as a binary (main.rs).

pub mod application;
pub mod cli;
pub mod components;
pub mod health;
pub mod logging;
pub mod metrics_server;
pub mod pipeline;

pub use application::{Application, check_config};
