//! tspec
//!
//! Resolves a Go type declaration into JSON-Schema definitions.

mod frontend;
mod resolver;
mod types;
mod utils;

use clap::{CommandFactory, Parser};
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use log::info;

use frontend::module::FsModuleResolver;
use resolver::Resolver;

/// tspec
#[derive(Parser, Debug)]
#[command(name = "tspec")]
#[command(author = "Z1529")]
#[command(version = "0.1.0")]
#[command(about = "Generate JSON-Schema definitions from Go type declarations")]
struct Cli {
    /// Package to load: an import path or a directory
    #[arg(short, long, value_name = "PKG", default_value = ".")]
    package: String,

    /// Type to resolve: `Name` or `pkg.Name`
    #[arg(short, long = "expression", visible_alias = "expr", value_name = "EXPR")]
    expression: Option<String>,

    /// Type to resolve; takes precedence over --expression
    #[arg(value_name = "EXPR")]
    expr: Option<String>,

    /// Extra module search root (repeatable)
    #[arg(short = 'I', long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let Some(expression) = cli.expr.clone().or_else(|| cli.expression.clone()) else {
        // nothing to resolve
        if let Err(e) = Cli::command().print_help() {
            eprintln!("error: {}", e);
            process::exit(1);
        }
        println!();
        return;
    };

    match run(&cli, &expression) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli, expression: &str) -> anyhow::Result<String> {
    let mut modules = FsModuleResolver::from_env();
    for dir in &cli.search_paths {
        modules.add_search_path(dir.clone());
    }
    let resolver = Resolver::new(modules);

    let cwd = env::current_dir().context("reading current directory")?;
    let unit = resolver
        .import_path(&cli.package, &cwd)
        .with_context(|| format!("loading package {}", cli.package))?;
    info!("loaded package {} from {}", unit.name, unit.dir.display());

    resolver.resolve(&unit, expression)?;

    let json = serde_json::to_string_pretty(&resolver.definitions())?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["tspec", "-p", "./samples", "--expr", "A", "-I", "/go/src", "-I", "/opt/src"]).unwrap();
        assert_eq!(cli.package, "./samples");
        assert_eq!(cli.expression.as_deref(), Some("A"));
        assert_eq!(cli.expr, None);
        assert_eq!(cli.search_paths, vec![PathBuf::from("/go/src"), PathBuf::from("/opt/src")]);

        let cli = Cli::try_parse_from(["tspec", "-e", "A", "pkga.A"]).unwrap();
        assert_eq!(cli.package, ".");
        assert_eq!(cli.expr.as_deref(), Some("pkga.A"));
    }

    #[test]
    fn test_run_prints_definitions() {
        let testdata = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata");
        let cli = Cli::try_parse_from(["tspec", "-p", testdata.join("samples").to_str().unwrap()]).unwrap();

        let json = run(&cli, "D").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["samples.D"]["properties"]["DArray"]["items"]["type"], "string");

        let err = run(&cli, "InvalidMap").unwrap_err();
        assert!(format!("{:#}", err).ends_with("unsupported map key type int"));
    }
}
