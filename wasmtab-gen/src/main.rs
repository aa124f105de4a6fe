//! wasmtab-gen CLI
//!
//! Validates a table set and writes its Markdown reference and/or Lua module.

use std::env;
use std::fs;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use log::info;

use wasmtab_core::config::DEFAULT_MODULE_NAME;
use wasmtab_core::{TableSet, logging, tables};

#[derive(Default)]
struct Options {
    defs: Option<String>,
    doc: Option<String>,
    lua: Option<String>,
    check: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{arg} expects a file path"))
        };
        match arg.as_str() {
            "--defs" => options.defs = Some(value()?),
            "--doc" => options.doc = Some(value()?),
            "--lua" => options.lua = Some(value()?),
            "--check" => options.check = true,
            other => bail!("unknown argument `{other}`"),
        }
    }
    if !options.check && options.doc.is_none() && options.lua.is_none() {
        bail!("nothing to do");
    }
    Ok(options)
}

fn load(defs: Option<&str>) -> Result<Arc<TableSet>> {
    match defs {
        Some(path) => {
            let source =
                fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
            let set = TableSet::from_json(&source).with_context(|| format!("invalid {path}"))?;
            Ok(Arc::new(set))
        }
        None => tables::builtin().context("invalid built-in definitions"),
    }
}

fn run(options: &Options) -> Result<()> {
    let set = load(options.defs.as_deref())?;
    info!("{} tables", set.len());

    if let Some(path) = &options.doc {
        fs::write(path, wasmtab_gen::render_markdown(&set))
            .with_context(|| format!("failed to write {path}"))?;
        info!("wrote {path}");
    }
    if let Some(path) = &options.lua {
        fs::write(path, wasmtab_gen::render_lua_module(&set, DEFAULT_MODULE_NAME))
            .with_context(|| format!("failed to write {path}"))?;
        info!("wrote {path}");
    }
    Ok(())
}

fn main() {
    logging::init();
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("wasmtab-gen");

    let options = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e}");
            print_usage(program);
            process::exit(2);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!("wasmtab table generator");
    eprintln!("Usage: {program} [--defs FILE] [--doc FILE] [--lua FILE] [--check]");
    eprintln!("  --defs FILE   table definitions (JSON); built-in WebAssembly tables if omitted");
    eprintln!("  --doc FILE    write the Markdown reference");
    eprintln!("  --lua FILE    write the Lua module");
    eprintln!("  --check       only validate the definitions");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_outputs() {
        let options = parse_args(&args(&["--doc", "t.md", "--lua", "wasm.lua"])).unwrap();
        assert_eq!(options.doc.as_deref(), Some("t.md"));
        assert_eq!(options.lua.as_deref(), Some("wasm.lua"));
        assert!(options.defs.is_none());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["--doc"])).is_err());
        assert!(parse_args(&args(&["--verbose"])).is_err());
        assert!(parse_args(&args(&["--check"])).is_ok());
    }

    #[test]
    fn builtin_set_loads() {
        assert_eq!(load(None).unwrap().len(), 27);
    }
}
