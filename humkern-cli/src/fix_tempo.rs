//! `humkern fix-tempo` — splice corrected `!!!OMD:` designations at the
//! timepoints listed in the tempo-fix table.

use std::fs;
use std::path::Path;

use clap::Args;
use humkern::annotate::{annotate, Mode, BEAT_SPINE_PREFIX};
use humkern::filter::{CommandFilter, StreamFilter};
use humkern::position::Timepoint;
use humkern::stream::ScoreStream;

use crate::{batch, tables, CliResult};

#[derive(Args)]
pub struct FixTempoOptions {
    /// Score file or directory of .krn files, rewritten in place
    #[arg(default_value = "kern")]
    pub path: std::path::PathBuf,

    /// Table of corrected designations per piece
    #[arg(long, default_value = "tempo-fixes.yaml")]
    pub fixes: std::path::PathBuf,

    /// Beat-annotation pipeline the scores are piped through
    #[arg(long, default_value = "meter -f")]
    pub filter_cmd: String,
}

impl FixTempoOptions {
    pub fn run(&self) -> CliResult<()> {
        let fixes = tables::load_piece_labels(&self.fixes)?;
        let filter = CommandFilter::new(&self.filter_cmd);
        let files = batch::input_files(&self.path, "krn")?;
        batch::process_all(&files, |file| {
            let id = batch::piece_id(file)?;
            match fixes.get(&id) {
                Some(labels) if !labels.is_empty() => {
                    let entries = tables::parse_entries(labels)?;
                    process(file, &entries, &filter)
                }
                _ => Ok(()),
            }
        })
    }
}

fn process(file: &Path, entries: &[(Timepoint, String)], filter: &dyn StreamFilter) -> CliResult<()> {
    let score = fs::read_to_string(file)?;
    let with_beats = filter.filter(&score)?;
    let stream = ScoreStream::parse(&with_beats)?;

    let annotated = annotate(&stream, &Mode::InsertTempoDesignations(entries))?;
    batch::log_warnings(file, &annotated.warnings);
    let stripped = annotate(&annotated.stream, &Mode::StripSpines(BEAT_SPINE_PREFIX))?;

    fs::write(file, stripped.stream.render())?;
    log::info!("Fixed movement designations (OMD) for {}", file.display());
    Ok(())
}
