use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use canopy_bundle_config::{
    built_in_rules, compose, is_external, ConfigOptions, Environment, Override,
};

#[derive(StructOpt)]
#[structopt(about = "Canopy bundler configuration factory")]
enum ConfigCommands {
    /// Print the composed configuration for an application
    Print {
        /// Application sources are TypeScript
        #[structopt(short, long)]
        typescript: bool,

        /// Explicit dev-server port
        #[structopt(short, long)]
        port: Option<u16>,

        /// JSON file with configuration overrides
        #[structopt(short, long, parse(from_os_str))]
        overrides: Option<PathBuf>,

        /// Application name
        name: String,
    },

    /// Report the built-in externals decision for module identifiers
    External {
        /// Module identifiers to classify
        module: Vec<String>,
    },
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").ok().is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let args = ConfigCommands::from_args();
    match args {
        ConfigCommands::Print {
            typescript,
            port,
            overrides,
            name,
        } => {
            let overrides = match overrides {
                Some(path) => {
                    let content = std::fs::read_to_string(path)?;
                    Override::from_json(serde_json::from_str(&content)?)?
                }
                None => Override::default(),
            };
            let options = ConfigOptions {
                typescript,
                port,
                ..Default::default()
            };
            let env = Environment::from_process();
            let config = compose(&name, overrides, &options, &env)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::External { module } => {
            for id in module.iter() {
                let external = is_external(id, built_in_rules())?;
                println!("{}\t{}", if external { "external" } else { "bundled" }, id);
            }
        }
    }
    Ok(())
}
