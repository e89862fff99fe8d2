//! Shared library surface for the Skyward server and its tests.

pub mod activity_logger;
pub mod api;
pub mod config;
pub mod detection;
pub mod loops;
pub mod pilot;
pub mod state;
