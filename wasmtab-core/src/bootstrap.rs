//! The bootstrap sequence and the process entry point built on it.

use std::process::ExitCode;

use log::{error, info};

use crate::config::RuntimeConfig;
use crate::error::{BootstrapError, RegistrationError};
use crate::logging;
use crate::runtime::{GeneratedTables, LuaHost, Ready, Runtime, RuntimeHost, TableProvider};

/// Create a runtime, load its standard library, then register `provider`'s tables.
///
/// Each step consumes the previous step's runtime, so a failure at any point drops (and
/// releases) the runtime built so far before the error is returned.
pub fn bootstrap_with<H, P>(host: &mut H, provider: &P) -> Result<Runtime<Ready>, BootstrapError>
where
    H: RuntimeHost + ?Sized,
    P: TableProvider + ?Sized,
{
    let runtime = host.create_runtime()?;
    let runtime = host.load_standard_library(runtime)?;
    runtime.register(provider)
}

/// Bootstrap with a [`LuaHost`] and the built-in WebAssembly tables.
pub fn bootstrap(config: &RuntimeConfig) -> Result<Runtime<Ready>, BootstrapError> {
    let mut provider = GeneratedTables::builtin().map_err(RegistrationError::Schema)?;
    if let Some(name) = &config.module_name {
        provider = provider.with_module(name.as_str());
    }
    let mut host = LuaHost::new(config.clone());
    bootstrap_with(&mut host, &provider)
}

/// Entry point used by the `wasmtab` binary. Arguments are not consulted.
pub fn run() -> ExitCode {
    logging::init();
    run_with(&RuntimeConfig::default())
}

/// Bootstrap with `config`, release the runtime and map the outcome to an exit status.
pub fn run_with(config: &RuntimeConfig) -> ExitCode {
    match bootstrap(config) {
        Ok(runtime) => {
            info!(
                "runtime ready, {} globals",
                runtime.global_names().map(|n| n.len()).unwrap_or(0)
            );
            drop(runtime);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
