//! Per-file batch processing: collect inputs, process each one, report and
//! move on when a single file fails.

use std::fs;
use std::path::{Path, PathBuf};

use humkern::annotate::Warning;

use crate::{CliError, CliResult};

/// The score files to process: the path itself if it is a file, otherwise all
/// entries of the directory carrying the extension, sorted by name.
pub fn input_files(path: &Path, extension: &str) -> CliResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(CliError::CommandError(format!(
            "{} is neither a file nor a directory",
            path.display()
        )));
    }
    let mut files: Vec<PathBuf> = fs::read_dir(path)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(extension))
        .collect();
    files.sort();
    Ok(files)
}

/// Runs `process` for every file. A failing file is logged and skipped; the
/// batch continues and still counts as a success overall.
pub fn process_all(
    files: &[PathBuf],
    mut process: impl FnMut(&Path) -> CliResult<()>,
) -> CliResult<()> {
    for file in files {
        if let Err(err) = process(file) {
            log::error!("{}: {:?}", file.display(), err);
        }
    }
    Ok(())
}

pub fn log_warnings(path: &Path, warnings: &[Warning]) {
    for warning in warnings {
        match warning {
            Warning::UnterminatedSpines => {
                log::warn!("{}: not all spines are terminated", path.display());
            }
            Warning::LabelMiss { measure, beat_cell } => {
                log::warn!(
                    "{}: no label for measure {measure}, beat {beat_cell}",
                    path.display()
                );
            }
            Warning::TempoRuleMiss {
                name,
                meter,
                measure,
            } => {
                log::warn!(
                    "{}: no tempo for {} {} (measure {measure})",
                    path.display(),
                    name.as_deref().unwrap_or("<no OMD>"),
                    meter.as_deref().unwrap_or("<no meter>"),
                );
            }
        }
    }
}

/// The piece identifier encoded in a score or import file name.
pub fn piece_id(path: &Path) -> CliResult<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.trim_end_matches("_reviewed").to_owned())
        .ok_or_else(|| CliError::CommandError(format!("{} has no usable file name", path.display())))
}
