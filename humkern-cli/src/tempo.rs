//! `humkern tempo` — insert `*MM` metronome rows from the tempo rule table.

use std::fs;
use std::path::Path;

use clap::Args;
use humkern::annotate::{annotate, Cleanup, Mode};
use humkern::stream::{RowKind, ScoreStream};
use humkern::tempo::TempoTable;

use crate::{batch, CliResult};

#[derive(Args)]
pub struct TempoOptions {
    /// Score file or directory of .krn files, rewritten in place
    #[arg(default_value = "kern")]
    pub path: std::path::PathBuf,
}

impl TempoOptions {
    pub fn run(&self) -> CliResult<()> {
        let table = TempoTable::corelli();
        let files = batch::input_files(&self.path, "krn")?;
        batch::process_all(&files, |file| process(file, &table))
    }
}

fn process(file: &Path, table: &TempoTable) -> CliResult<()> {
    let score = fs::read_to_string(file)?;
    let stream = ScoreStream::parse(&score)?;

    // Movements without an OMD record have nothing to resolve tempi against.
    let omd = stream.rows().iter().find_map(|row| {
        (row.kind() == RowKind::GlobalComment)
            .then(|| row.cell(0).strip_prefix("!!!OMD:"))
            .flatten()
            .map(|name| name.trim().to_owned())
    });
    let omd = match omd {
        Some(omd) => omd,
        None => {
            log::warn!("No OMD found in {}", file.display());
            return Ok(());
        }
    };

    let annotated = annotate(&stream, &Mode::InsertTempoMarks(table))?;
    batch::log_warnings(file, &annotated.warnings);
    // In-place rewrite: only interpretation rows are pruned, so spacer lines
    // the source file carries stay put.
    let cleaned = annotate(
        &annotated.stream,
        &Mode::DeleteRedundantState(Cleanup::Interpretations),
    )?;

    fs::write(file, cleaned.stream.render())?;
    log::info!("Inserted MM lines for {} ({omd})", file.display());
    Ok(())
}
