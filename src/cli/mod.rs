//! CLI subcommand implementations for the snipsave binary.

pub mod doctor;
pub mod install_cmd;
pub mod output;
pub mod run_cmd;
pub mod scan_cmd;
