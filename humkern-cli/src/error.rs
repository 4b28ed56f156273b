//! Context-carrying error conversion for the per-file batch loops.

use std::fmt::Debug;

use crate::{CliError, CliResult};

/// Wraps a failure as a [`CliError`] with a leading context line, so the
/// batch logger prints what was being attempted before the underlying cause.
pub trait ResultExt<T> {
    fn handle_error(self, context: &str) -> CliResult<T>;
}

impl<T, E: Debug> ResultExt<T> for Result<T, E> {
    fn handle_error(self, context: &str) -> CliResult<T> {
        self.map_err(|err| CliError::CommandError(format!("{context}\n{err:#?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_line_precedes_the_cause() {
        let failed: Result<(), &str> = Err("boom");
        let err = failed.handle_error("Could not parse table").unwrap_err();
        assert_eq!(
            format!("{err:?}"),
            "The command failed / Could not parse table\n\"boom\""
        );
    }
}
