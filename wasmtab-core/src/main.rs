use std::process::ExitCode;

fn main() -> ExitCode {
    wasmtab_core::run()
}
