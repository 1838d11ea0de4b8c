//! Generate bundler configurations for canopy micro-applications.
//!
//! Each micro-application is built and deployed on its own but runs
//! inside a shell application that provides the shared dependencies at
//! runtime. This crate computes the build configuration for one
//! application: entry points, output layout, resolution and transform
//! rules, dev-server settings and, most importantly, the externals
//! decision that keeps shell-provided modules out of the bundle.
//!
//! ```no_run
//! use canopy_bundle_config::{compose_config, ConfigOptions, Override};
//!
//! let options = ConfigOptions {
//!     typescript: true,
//!     ..Default::default()
//! };
//! let config = compose_config("app-loader-ui", Override::default(), &options)?;
//! # Ok::<(), canopy_bundle_config::Error>(())
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod externals;

pub use config::{
    builder::{compose, ConfigOptions, Override, DEFAULT_HOST, DEFAULT_PORT, OUTPUT_DIR},
    BuildConfig, ConfigOverrides, DevServer, Devtool, Merge, Output, TlsMaterial,
};
pub use environment::{AnalyzeMode, Environment, Mode};
pub use error::{Error, Result};
pub use externals::{built_in_rules, is_external, ExternalRule, ExternalsMatcher};

/// Compose a configuration using the current process environment.
///
/// Resolves arguments and variables once and delegates to [compose];
/// certificate files are re-read on every call.
pub fn compose_config(
    name: &str,
    overrides: Override,
    options: &ConfigOptions,
) -> Result<BuildConfig> {
    let env = Environment::from_process();
    compose(name, overrides, options, &env)
}
