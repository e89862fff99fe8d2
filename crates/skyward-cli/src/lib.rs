//! Skyward CLI - command line tools for the Skyward drone controller.
//!
//! Binaries:
//! - send_command: send operator text or a canonical command to a running server
//! - parse_commands: run the command parser over a script without a server

pub mod client;
pub mod script;

pub use client::PilotClient;
pub use script::script_lines;
