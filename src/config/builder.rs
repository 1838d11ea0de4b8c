//! Compose a build configuration from the application name, the
//! options and the resolved environment, then apply the caller override.

use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;

use super::{
    BuildConfig, ConfigOverrides, DevServer, Devtool, Merge, ModuleOptions, ModuleRule, Output,
    Plugin, ResolveOptions, TlsMaterial,
};
use crate::{
    environment::{AnalyzeMode, Environment},
    error::{Error, Result},
    externals::{built_in_rules, ExternalRule, ExternalsMatcher},
};

/// Directory bundles are written to.
pub const OUTPUT_DIR: &str = "build";

/// Dev-server port used when nothing else provides one.
pub const DEFAULT_PORT: u16 = 8080;

/// Wildcard bind host used when no `--host` flag is present.
pub const DEFAULT_HOST: &str = "0.0.0.0";

const CERT_FILE: &str = "public.pem";
const KEY_FILE: &str = "key.pem";

/// Options recognized by composition.
#[derive(Default, Debug)]
pub struct ConfigOptions {
    /// Application sources are TypeScript; selects the entry extension
    /// and the type-stripping preset.
    pub typescript: bool,
    /// Rules appended to the built-in externals list.
    pub additional_externals: Vec<ExternalRule>,
    /// Explicit dev-server port, taking priority over the environment.
    pub port: Option<u16>,
}

/// Caller override applied to the computed default configuration.
pub enum Override {
    /// Partial record deep-merged over the defaults.
    Record(ConfigOverrides),
    /// Function of `(defaults, environment)` whose return value is used
    /// as the final configuration with no further merging.
    Function(Box<dyn Fn(&BuildConfig, &Environment) -> BuildConfig>),
}

impl std::fmt::Debug for Override {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Override::Record(overrides) => f.debug_tuple("Record").field(overrides).finish(),
            Override::Function(_) => f.debug_tuple("Function").finish(),
        }
    }
}

impl Default for Override {
    fn default() -> Self {
        Override::Record(Default::default())
    }
}

impl From<ConfigOverrides> for Override {
    fn from(record: ConfigOverrides) -> Self {
        Override::Record(record)
    }
}

impl Override {
    /// Function override.
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&BuildConfig, &Environment) -> BuildConfig + 'static,
    {
        Override::Function(Box::new(func))
    }

    /// Record override parsed from a JSON value.
    ///
    /// Only an object is accepted; anything else violates the override
    /// contract.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value)
                .map(Override::Record)
                .map_err(|err| Error::InvalidArgument {
                    argument: "override",
                    expected: "a configuration record",
                    received: err.to_string(),
                }),
            other => Err(Error::InvalidArgument {
                argument: "override",
                expected: "a configuration record or a function",
                received: json_type(&other).to_string(),
            }),
        }
    }
}

/// Compose the final configuration for a micro-application.
///
/// Builds the default configuration, attaches the dev-server descriptor
/// when the environment says the dev server is running, then applies the
/// override: a record is deep-merged over the defaults, a function
/// replaces them with its return value.
pub fn compose(
    name: &str,
    overrides: Override,
    options: &ConfigOptions,
    env: &Environment,
) -> Result<BuildConfig> {
    if name.is_empty() {
        return Err(Error::InvalidArgument {
            argument: "name",
            expected: "a non-empty application name",
            received: "an empty string".to_string(),
        });
    }

    let extension = if options.typescript { "ts" } else { "js" };
    let mut entry = IndexMap::new();
    entry.insert(name.to_string(), format!("./src/{}.{}", name, extension));

    let output = Output {
        path: OUTPUT_DIR.to_string(),
        filename: format!("{}.js", name),
        library: kebab_to_camel(name),
        chunk_filename: if env.mode.is_production() {
            "[name]-[hash].js".to_string()
        } else {
            "[name].js".to_string()
        },
        module: true,
    };

    let mut rules = built_in_rules().to_vec();
    rules.extend(options.additional_externals.iter().cloned());
    let externals = ExternalsMatcher::new(rules);

    let resolve = ResolveOptions {
        extensions: if options.typescript {
            string_vec(&[".tsx", ".ts", ".js", ".jsx", ".json"])
        } else {
            string_vec(&[".js", ".jsx", ".json"])
        },
        modules: string_vec(&[".", "node_modules"]),
        fully_specified: false,
    };

    let mut presets = string_vec(&["@babel/preset-env", "@babel/preset-react"]);
    if options.typescript {
        presets.push("@babel/preset-typescript".to_string());
    }
    let module = ModuleOptions {
        rules: vec![ModuleRule {
            test: r"\.(js|jsx|ts|tsx)$".to_string(),
            exclude: "node_modules".to_string(),
            loader: "babel-loader".to_string(),
            presets,
        }],
    };

    let mut plugins = vec![Plugin::Clean {
        patterns: string_vec(&["**/*", "!.gitkeep"]),
    }];
    match env.analyze {
        Some(AnalyzeMode::Server) => plugins.push(Plugin::BundleAnalyzer {
            mode: AnalyzeMode::Server,
            open_analyzer: true,
        }),
        Some(AnalyzeMode::Static) => plugins.push(Plugin::BundleAnalyzer {
            mode: AnalyzeMode::Static,
            open_analyzer: false,
        }),
        None => {}
    }

    let devtool = if env.mode.is_production() {
        Devtool::SourceMap
    } else {
        Devtool::EvalSourceMap
    };

    let dev_server = if env.serve {
        Some(dev_server(options, env)?)
    } else {
        None
    };

    let config = BuildConfig {
        mode: env.mode,
        entry,
        output,
        resolve,
        module,
        plugins,
        devtool,
        externals,
        dev_server,
    };

    log::debug!("Composed default configuration for {}", name);

    Ok(match overrides {
        Override::Function(func) => func(&config, env),
        Override::Record(record) => {
            let mut config = config;
            config.merge(&record);
            config
        }
    })
}

fn dev_server(options: &ConfigOptions, env: &Environment) -> Result<DevServer> {
    let port = options
        .port
        .or(env.port_var)
        .or(env.port_arg)
        .unwrap_or(DEFAULT_PORT);

    let host = env
        .host
        .clone()
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let tls = load_tls_material(&env.ssl_dir)?;
    if tls.is_some() {
        log::debug!("Dev server uses TLS material from {}", env.ssl_dir.display());
    }

    let mut headers = IndexMap::new();
    headers.insert(
        "Access-Control-Allow-Origin".to_string(),
        "*".to_string(),
    );
    headers.insert(
        "Access-Control-Allow-Methods".to_string(),
        "GET, POST, PUT, DELETE, PATCH, OPTIONS".to_string(),
    );
    headers.insert(
        "Access-Control-Allow-Headers".to_string(),
        "X-Requested-With, content-type, Authorization".to_string(),
    );

    Ok(DevServer {
        host,
        port,
        tls,
        headers,
        allowed_hosts: "all".to_string(),
        hot: false,
        live_reload: true,
    })
}

/// Load the per-user certificate pair.
///
/// Both files must be present to attach TLS material; either missing
/// means the dev server runs plaintext, which is not an error.
fn load_tls_material(dir: &Path) -> Result<Option<TlsMaterial>> {
    let cert_path = dir.join(CERT_FILE);
    let key_path = dir.join(KEY_FILE);

    let cert = match read_optional(&cert_path)? {
        Some(bytes) => bytes,
        None => return Ok(None),
    };
    let key = match read_optional(&key_path)? {
        Some(bytes) => bytes,
        None => return Ok(None),
    };

    Ok(Some(TlsMaterial {
        cert_path,
        key_path,
        cert,
        key,
    }))
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::FileSystem {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

/// Library identifier for an application name, `app-loader-ui` to
/// `appLoaderUi`.
pub fn kebab_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_lowercase() {
                    chars.next();
                    out.push(next.to_ascii_uppercase());
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn string_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a configuration record",
    }
}
