use std::env;
use std::io::ErrorKind;

use humkern_cli::{CliError, CliResult};

fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    match humkern_cli::run_in_shell_env(env::args()) {
        // The BrokenPipe case occurs when stdout tries to communicate with a process that has already terminated.
        // Annotation runs are repeatable, so it is okay to ignore this error and terminate successfully.
        Err(CliError::IoError(err)) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
