//! `humkern modulations` — insert `*key:` changes at the timepoints listed in
//! the modulation table.

use std::fs;
use std::path::Path;

use clap::Args;
use humkern::annotate::{annotate, Cleanup, Mode, BEAT_SPINE_PREFIX};
use humkern::filter::{CommandFilter, StreamFilter};
use humkern::position::Timepoint;
use humkern::stream::ScoreStream;

use crate::{batch, tables, CliResult};

#[derive(Args)]
pub struct ModulationsOptions {
    /// Directory containing the .krn scores, rewritten in place
    #[arg(long, default_value = "kern")]
    pub scores_dir: std::path::PathBuf,

    /// Table of modulations per piece
    #[arg(long, default_value = "modulations.yaml")]
    pub modulations: std::path::PathBuf,

    /// Beat-annotation pipeline the scores are piped through
    #[arg(long, default_value = "meter -f")]
    pub filter_cmd: String,
}

impl ModulationsOptions {
    pub fn run(&self) -> CliResult<()> {
        let modulations = tables::load_piece_labels(&self.modulations)?;
        let filter = CommandFilter::new(&self.filter_cmd);
        // The table drives the batch: only pieces it lists are touched.
        for (piece, labels) in &modulations {
            let file = self.scores_dir.join(format!("{piece}.krn"));
            let result = tables::parse_entries(labels)
                .and_then(|entries| process(&file, &entries, &filter));
            if let Err(err) = result {
                log::error!("{}: {:?}", file.display(), err);
            }
        }
        Ok(())
    }
}

fn process(file: &Path, entries: &[(Timepoint, String)], filter: &dyn StreamFilter) -> CliResult<()> {
    let score = fs::read_to_string(file)?;
    let with_beats = filter.filter(&score)?;
    let stream = ScoreStream::parse(&with_beats)?;

    let annotated = annotate(&stream, &Mode::InsertKeyChanges(entries))?;
    batch::log_warnings(file, &annotated.warnings);
    let stripped = annotate(&annotated.stream, &Mode::StripSpines(BEAT_SPINE_PREFIX))?;
    let cleaned = annotate(
        &stripped.stream,
        &Mode::DeleteRedundantState(Cleanup::Interpretations),
    )?;

    fs::write(file, cleaned.stream.render())?;
    log::info!("Added modulations for {}", file.display());
    Ok(())
}
