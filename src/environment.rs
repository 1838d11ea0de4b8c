//! Resolve the runtime environment for a build.
//!
//! The process arguments and variables are inspected once, up front,
//! and the result is passed into composition as plain data.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Build mode, selected by the `NODE_ENV` variable.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Development build with fast rebuild oriented defaults.
    Development,
    /// Production build with deterministic, minified output.
    Production,
}

impl Mode {
    /// Whether this is a production build.
    pub fn is_production(&self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Development
    }
}

/// Bundle analyzer mode requested via the `ANALYZE` variable.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzeMode {
    /// Serve the analyzer report over HTTP.
    Server,
    /// Write a static report file.
    Static,
}

/// The resolved runtime environment.
#[derive(Clone, Debug)]
pub struct Environment {
    /// Build mode.
    pub mode: Mode,
    /// Whether the dev server is running (`serve` appears in the arguments).
    pub serve: bool,
    /// Bind host from a `--host` flag pair.
    pub host: Option<String>,
    /// Port from a `--port` flag pair or a bare numeric argument.
    pub port_arg: Option<u16>,
    /// Port from the `PORT` variable.
    pub port_var: Option<u16>,
    /// Bundle analyzer request.
    pub analyze: Option<AnalyzeMode>,
    /// Directory holding the per-user TLS certificate pair.
    pub ssl_dir: PathBuf,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            mode: Default::default(),
            serve: false,
            host: None,
            port_arg: None,
            port_var: None,
            analyze: None,
            ssl_dir: PathBuf::from(".canopy-ssl"),
        }
    }
}

impl Environment {
    /// Resolve an environment from an argument list and a variable lookup.
    pub fn resolve<F>(args: &[String], var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match var("NODE_ENV").as_deref() {
            Some("production") => Mode::Production,
            _ => Mode::Development,
        };

        // Matches any invocation style: `serve`, `webpack serve`, `--serve`.
        let serve = args.iter().any(|arg| arg.contains("serve"));

        let host = flag_value(args, "--host");

        let port_arg = flag_value(args, "--port")
            .or_else(|| {
                args.iter()
                    .find(|arg| !arg.is_empty() && arg.chars().all(|c| c.is_ascii_digit()))
                    .cloned()
            })
            .and_then(|port| port.parse().ok());

        let port_var = var("PORT").and_then(|port| port.parse().ok());

        let analyze = match var("ANALYZE").as_deref() {
            Some("server") => Some(AnalyzeMode::Server),
            Some("static") => Some(AnalyzeMode::Static),
            _ => None,
        };

        let ssl_dir = var("HOME")
            .map(|home| PathBuf::from(home).join(".canopy-ssl"))
            .unwrap_or_else(|| PathBuf::from(".canopy-ssl"));

        log::debug!(
            "Resolved environment mode={:?} serve={} host={:?}",
            mode,
            serve,
            host
        );

        Environment {
            mode,
            serve,
            host,
            port_arg,
            port_var,
            analyze,
            ssl_dir,
        }
    }

    /// Resolve from the current process arguments and variables.
    pub fn from_process() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Environment::resolve(&args, |key| std::env::var(key).ok())
    }
}

// The value following a flag, when both are present.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .filter(|value| !value.is_empty())
        .cloned()
}
