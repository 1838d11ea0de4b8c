use std::collections::HashMap;

use anyhow::Result;

use canopy_bundle_config::{AnalyzeMode, Environment, Mode};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn resolve(arg_list: &[&str], var_pairs: &[(&str, &str)]) -> Environment {
    let vars = vars(var_pairs);
    Environment::resolve(&args(arg_list), |key| vars.get(key).cloned())
}

#[test]
fn defaults_without_arguments() -> Result<()> {
    let env = resolve(&[], &[]);
    assert_eq!(env.mode, Mode::Development);
    assert!(!env.serve);
    assert!(env.host.is_none());
    assert!(env.port_arg.is_none());
    assert!(env.port_var.is_none());
    assert!(env.analyze.is_none());
    Ok(())
}

#[test]
fn serve_is_detected_in_any_argument() -> Result<()> {
    assert!(resolve(&["serve"], &[]).serve);
    assert!(resolve(&["webpack", "serve"], &[]).serve);
    assert!(resolve(&["--serve"], &[]).serve);
    assert!(!resolve(&["build"], &[]).serve);
    Ok(())
}

#[test]
fn host_flag_pair() -> Result<()> {
    let env = resolve(&["serve", "--host", "localhost"], &[]);
    assert_eq!(env.host.as_deref(), Some("localhost"));

    // A trailing flag with no value is ignored.
    let env = resolve(&["serve", "--host"], &[]);
    assert!(env.host.is_none());
    Ok(())
}

#[test]
fn port_from_flag_or_bare_numeric_token() -> Result<()> {
    let env = resolve(&["serve", "--port", "9000"], &[]);
    assert_eq!(env.port_arg, Some(9000));

    let env = resolve(&["serve", "8123"], &[]);
    assert_eq!(env.port_arg, Some(8123));

    // The flag pair wins over a bare token.
    let env = resolve(&["--port", "9000", "8123"], &[]);
    assert_eq!(env.port_arg, Some(9000));
    Ok(())
}

#[test]
fn port_variable_is_kept_separately() -> Result<()> {
    let env = resolve(&["serve", "8123"], &[("PORT", "7777")]);
    assert_eq!(env.port_var, Some(7777));
    assert_eq!(env.port_arg, Some(8123));
    Ok(())
}

#[test]
fn production_mode_from_node_env() -> Result<()> {
    assert_eq!(resolve(&[], &[("NODE_ENV", "production")]).mode, Mode::Production);
    assert_eq!(resolve(&[], &[("NODE_ENV", "test")]).mode, Mode::Development);
    Ok(())
}

#[test]
fn analyze_modes() -> Result<()> {
    assert_eq!(
        resolve(&[], &[("ANALYZE", "server")]).analyze,
        Some(AnalyzeMode::Server)
    );
    assert_eq!(
        resolve(&[], &[("ANALYZE", "static")]).analyze,
        Some(AnalyzeMode::Static)
    );
    assert!(resolve(&[], &[("ANALYZE", "bogus")]).analyze.is_none());
    Ok(())
}

#[test]
fn ssl_dir_under_home() -> Result<()> {
    let env = resolve(&[], &[("HOME", "/home/someone")]);
    assert_eq!(
        env.ssl_dir,
        std::path::PathBuf::from("/home/someone/.canopy-ssl")
    );
    Ok(())
}
