//! Output helpers shared by the CLI commands.
//!
//! Global flags are exported as environment variables by `main` so any
//! module can check them without plumbing a config value through.

/// Whether `--json` was passed.
pub fn is_json() -> bool {
    flag("SNIPSAVE_JSON")
}

/// Whether `--quiet` was passed.
pub fn is_quiet() -> bool {
    flag("SNIPSAVE_QUIET")
}

/// Whether `--verbose` was passed.
pub fn is_verbose() -> bool {
    flag("SNIPSAVE_VERBOSE")
}

/// Whether color output is disabled (`--no-color` or the conventional
/// `NO_COLOR` variable).
pub fn no_color() -> bool {
    flag("SNIPSAVE_NO_COLOR") || std::env::var("NO_COLOR").is_ok()
}

fn flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

/// Install the global tracing subscriber, honoring `--verbose`.
/// Called once by `main` before command dispatch, so every subcommand
/// logs through it.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_directive().parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn log_directive() -> &'static str {
    if is_verbose() {
        "snipsave=debug"
    } else {
        "snipsave=info"
    }
}

/// Print one JSON value as a single machine-readable line on stdout.
pub fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string()));
}

/// ANSI styling for human output, disabled under `--no-color`.
pub struct Styled {
    color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self { color: !no_color() }
    }

    pub fn ok_sym(&self) -> String {
        self.paint("\x1b[32m", "✓")
    }

    pub fn warn_sym(&self) -> String {
        self.paint("\x1b[33m", "!")
    }

    pub fn err_sym(&self) -> String {
        self.paint("\x1b[31m", "✗")
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint("\x1b[2m", s)
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.color {
            format!("{code}{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }
}
