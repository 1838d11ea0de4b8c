//! Types for generated build configurations.
//!
//! A [BuildConfig] is produced by the builder from the application name,
//! the options and the resolved environment, then customized by merging
//! a [ConfigOverrides] record over it. Mapping-valued fields merge
//! recursively with override keys winning; sequence-valued fields are
//! replaced wholesale by an override.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    environment::{AnalyzeMode, Mode},
    externals::{ExternalRule, ExternalsMatcher},
};

pub mod builder;

/// Trait for the merge operation.
pub trait Merge<O> {
    /// Apply overrides from `from`.
    fn merge(&mut self, from: &O);
}

/// A complete bundler configuration for one micro-application.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Build mode.
    pub mode: Mode,
    /// Entry mapping from logical name to source path.
    pub entry: IndexMap<String, String>,
    /// Output layout.
    pub output: Output,
    /// Module resolution settings.
    pub resolve: ResolveOptions,
    /// Source transformation rules.
    pub module: ModuleOptions,
    /// Vendor plugin descriptors, passed through to the bundler.
    pub plugins: Vec<Plugin>,
    /// Source map style.
    pub devtool: Devtool,
    /// Decides which imports are left external to the bundle.
    pub externals: ExternalsMatcher,
    /// Dev-server settings, present only when the dev server is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServer>,
}

/// Output layout descriptor.
#[derive(Serialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    /// Target directory.
    pub path: String,
    /// Entry bundle filename.
    pub filename: String,
    /// Library identifier exposed by the bundle.
    pub library: String,
    /// Filename pattern for split chunks.
    pub chunk_filename: String,
    /// Emit native ES modules.
    pub module: bool,
}

/// Module resolution descriptor.
#[derive(Serialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Extensions tried for extensionless imports.
    pub extensions: Vec<String>,
    /// Directories searched for bare specifiers.
    pub modules: Vec<String>,
    /// Require import specifiers to carry an extension.
    pub fully_specified: bool,
}

/// Container for the transformation rule list.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct ModuleOptions {
    /// Rules applied to matching source files.
    pub rules: Vec<ModuleRule>,
}

/// One source transformation rule.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRule {
    /// Pattern selecting the files this rule applies to.
    pub test: String,
    /// Pattern excluding files from the rule.
    pub exclude: String,
    /// Loader invoked for matching files.
    pub loader: String,
    /// Transpilation presets handed to the loader.
    pub presets: Vec<String>,
}

/// A vendor plugin wired into the build with fixed parameters.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum Plugin {
    /// Empty the output directory before each build.
    #[serde(rename_all = "camelCase")]
    Clean {
        /// Glob patterns selecting what to remove.
        patterns: Vec<String>,
    },
    /// Produce a bundle size report.
    #[serde(rename_all = "camelCase")]
    BundleAnalyzer {
        /// Report delivery mode.
        mode: AnalyzeMode,
        /// Open the report in a browser when serving.
        open_analyzer: bool,
    },
}

/// Source map style.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq)]
pub enum Devtool {
    /// Full, slow source maps for production output.
    #[serde(rename = "source-map")]
    SourceMap,
    /// Fast rebuild source maps for development.
    #[serde(rename = "eval-source-map")]
    EvalSourceMap,
}

/// Dev-server descriptor.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DevServer {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// TLS material; the server runs plaintext when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsMaterial>,
    /// Response headers attached to every served asset.
    pub headers: IndexMap<String, String>,
    /// Host names the server accepts requests for.
    pub allowed_hosts: String,
    /// Hot module replacement. Off: not supported with ESM output.
    pub hot: bool,
    /// Full page reload on rebuild.
    pub live_reload: bool,
}

impl DevServer {
    /// Whether the server will terminate TLS.
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }
}

/// Certificate and key material for the dev server.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TlsMaterial {
    /// Where the certificate was read from.
    pub cert_path: PathBuf,
    /// Where the private key was read from.
    pub key_path: PathBuf,
    /// Certificate bytes, not validated by this layer.
    #[serde(skip)]
    pub cert: Vec<u8>,
    /// Key bytes, not validated by this layer.
    #[serde(skip)]
    pub key: Vec<u8>,
}

/// Partial configuration record deep-merged over the computed defaults.
#[derive(Deserialize, Default, Clone, Debug)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverrides {
    /// Override the build mode.
    pub mode: Option<Mode>,
    /// Entries merged into the entry mapping, key by key.
    pub entry: Option<IndexMap<String, String>>,
    /// Output overrides, merged field by field.
    pub output: Option<OutputOverrides>,
    /// Resolution overrides, merged field by field.
    pub resolve: Option<ResolveOverrides>,
    /// Replacement transformation rule list.
    pub module: Option<ModuleOptions>,
    /// Replacement plugin list.
    pub plugins: Option<Vec<Plugin>>,
    /// Override the source map style.
    pub devtool: Option<Devtool>,
    /// Replacement externals rule list.
    pub externals: Option<Vec<ExternalRule>>,
    /// Dev-server overrides; ignored when no dev server is running.
    pub dev_server: Option<DevServerOverrides>,
}

/// Partial output overrides.
#[derive(Deserialize, Default, Clone, Debug)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputOverrides {
    pub path: Option<String>,
    pub filename: Option<String>,
    pub library: Option<String>,
    pub chunk_filename: Option<String>,
    pub module: Option<bool>,
}

/// Partial resolution overrides. The sequence fields replace wholesale.
#[derive(Deserialize, Default, Clone, Debug)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOverrides {
    pub extensions: Option<Vec<String>>,
    pub modules: Option<Vec<String>>,
    pub fully_specified: Option<bool>,
}

/// Partial dev-server overrides.
#[derive(Deserialize, Default, Clone, Debug)]
#[serde(default, rename_all = "camelCase")]
pub struct DevServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Headers merged over the defaults, key by key.
    pub headers: Option<IndexMap<String, String>>,
    pub allowed_hosts: Option<String>,
    pub hot: Option<bool>,
    pub live_reload: Option<bool>,
}

impl Merge<ConfigOverrides> for BuildConfig {
    fn merge(&mut self, from: &ConfigOverrides) {
        if let Some(mode) = from.mode {
            self.mode = mode;
        }
        if let Some(entry) = &from.entry {
            for (name, path) in entry.iter() {
                self.entry.insert(name.clone(), path.clone());
            }
        }
        if let Some(output) = &from.output {
            self.output.merge(output);
        }
        if let Some(resolve) = &from.resolve {
            self.resolve.merge(resolve);
        }
        if let Some(module) = &from.module {
            self.module = module.clone();
        }
        if let Some(plugins) = &from.plugins {
            self.plugins = plugins.clone();
        }
        if let Some(devtool) = from.devtool {
            self.devtool = devtool;
        }
        if let Some(externals) = &from.externals {
            self.externals.set_rules(externals.clone());
        }
        if let (Some(server), Some(overrides)) = (self.dev_server.as_mut(), &from.dev_server) {
            server.merge(overrides);
        }
    }
}

impl Merge<OutputOverrides> for Output {
    fn merge(&mut self, from: &OutputOverrides) {
        if let Some(path) = &from.path {
            self.path = path.clone();
        }
        if let Some(filename) = &from.filename {
            self.filename = filename.clone();
        }
        if let Some(library) = &from.library {
            self.library = library.clone();
        }
        if let Some(chunk_filename) = &from.chunk_filename {
            self.chunk_filename = chunk_filename.clone();
        }
        if let Some(module) = from.module {
            self.module = module;
        }
    }
}

impl Merge<ResolveOverrides> for ResolveOptions {
    fn merge(&mut self, from: &ResolveOverrides) {
        if let Some(extensions) = &from.extensions {
            self.extensions = extensions.clone();
        }
        if let Some(modules) = &from.modules {
            self.modules = modules.clone();
        }
        if let Some(fully_specified) = from.fully_specified {
            self.fully_specified = fully_specified;
        }
    }
}

impl Merge<DevServerOverrides> for DevServer {
    fn merge(&mut self, from: &DevServerOverrides) {
        if let Some(host) = &from.host {
            self.host = host.clone();
        }
        if let Some(port) = from.port {
            self.port = port;
        }
        if let Some(headers) = &from.headers {
            for (name, value) in headers.iter() {
                self.headers.insert(name.clone(), value.clone());
            }
        }
        if let Some(allowed_hosts) = &from.allowed_hosts {
            self.allowed_hosts = allowed_hosts.clone();
        }
        if let Some(hot) = from.hot {
            self.hot = hot;
        }
        if let Some(live_reload) = from.live_reload {
            self.live_reload = live_reload;
        }
    }
}
