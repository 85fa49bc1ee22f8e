// Copyright 2026 Snipsave Contributors
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code, unused_imports)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod augment;
mod browser;
mod cli;
mod error;
mod events;
mod export;
mod extract;
mod hosts;
mod page;
mod scan;
mod watch;

#[derive(Parser)]
#[command(
    name = "snipsave",
    about = "snipsave — Save button for the code behind every Copy button",
    version,
    after_help = "Run 'snipsave <command> --help' for details on each command.\nRun 'snipsave' with no command to watch the default chat page."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a chat page and keep Save buttons attached until Ctrl-C
    Run {
        /// Page to open (defaults to https://chatgpt.com/)
        url: Option<String>,
        /// Attach to a running browser over its DevTools websocket instead of launching one
        #[arg(long)]
        connect: Option<String>,
        /// Run the browser headless (prompts cannot be answered; mostly for debugging)
        #[arg(long)]
        headless: bool,
        /// Additional host to treat as a chat page. Can be repeated.
        #[arg(long = "allow-host")]
        allow_hosts: Vec<String>,
        /// Skip the host allowlist entirely
        #[arg(long)]
        any_host: bool,
        /// Navigation timeout in milliseconds
        #[arg(long, default_value = "30000")]
        nav_timeout: u64,
    },
    /// Report the copy controls on a page without attaching anything
    Scan {
        /// Page to scan (defaults to https://chatgpt.com/)
        url: Option<String>,
        /// Attach to a running browser over its DevTools websocket instead of launching one
        #[arg(long)]
        connect: Option<String>,
        /// Show the browser window while scanning
        #[arg(long)]
        headful: bool,
        /// Additional host to treat as a chat page. Can be repeated.
        #[arg(long = "allow-host")]
        allow_hosts: Vec<String>,
        /// Skip the host allowlist entirely
        #[arg(long)]
        any_host: bool,
        /// Navigation timeout in milliseconds
        #[arg(long, default_value = "30000")]
        nav_timeout: u64,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Set up Chromium
    Install,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("SNIPSAVE_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("SNIPSAVE_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("SNIPSAVE_VERBOSE", "1");
    }
    if cli.no_color {
        std::env::set_var("SNIPSAVE_NO_COLOR", "1");
    }

    cli::output::init_tracing();

    let result = match cli.command {
        // No subcommand → watch the default chat page
        None => cli::run_cmd::run(None, None, false, &[], false, 30_000).await,

        Some(Commands::Run {
            url,
            connect,
            headless,
            allow_hosts,
            any_host,
            nav_timeout,
        }) => {
            cli::run_cmd::run(
                url.as_deref(),
                connect.as_deref(),
                headless,
                &allow_hosts,
                any_host,
                nav_timeout,
            )
            .await
        }
        Some(Commands::Scan {
            url,
            connect,
            headful,
            allow_hosts,
            any_host,
            nav_timeout,
        }) => {
            cli::scan_cmd::run(
                url.as_deref(),
                connect.as_deref(),
                headful,
                &allow_hosts,
                any_host,
                nav_timeout,
            )
            .await
        }
        Some(Commands::Doctor) => cli::doctor::run().await,
        Some(Commands::Install) => cli::install_cmd::run().await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "snipsave", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
