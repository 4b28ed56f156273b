//! `humkern harm` — insert DCML chord labels as a `**harm` spine.

use std::fs;
use std::path::Path;

use clap::Args;
use humkern::annotate::{annotate, Cleanup, Mode, BEAT_SPINE_PREFIX};
use humkern::filter::{CommandFilter, StreamFilter};
use humkern::stream::ScoreStream;
use humkern::table::LabelTable;

use crate::error::ResultExt;
use crate::{batch, CliError, CliResult};

#[derive(Args)]
pub struct HarmOptions {
    /// Score file or directory of .krn files
    #[arg(default_value = "kern")]
    pub path: std::path::PathBuf,

    /// Local cache of DCML reviewed-label TSV downloads
    #[arg(long, default_value = "dcml-annotations")]
    pub labels_dir: std::path::PathBuf,

    /// Output directory for the annotated scores
    #[arg(long, default_value = "annotated-kern")]
    pub out_dir: std::path::PathBuf,

    /// Clear the label cache before processing
    #[arg(long)]
    pub force_download: bool,

    /// Beat-annotation pipeline the scores are piped through
    #[arg(long, default_value = "meter -zfr")]
    pub filter_cmd: String,
}

impl HarmOptions {
    pub fn run(&self) -> CliResult<()> {
        if self.force_download && self.labels_dir.is_dir() {
            fs::remove_dir_all(&self.labels_dir)?;
        }
        if self.out_dir.is_dir() {
            fs::remove_dir_all(&self.out_dir)?;
        }
        fs::create_dir_all(&self.out_dir)?;

        let filter = CommandFilter::new(&self.filter_cmd);
        let files = batch::input_files(&self.path, "krn")?;
        batch::process_all(&files, |file| self.process(file, &filter))
    }

    fn process(&self, file: &Path, filter: &dyn StreamFilter) -> CliResult<()> {
        let id = batch::piece_id(file)?;
        let labels_file = self.labels_dir.join(format!("{id}_reviewed.tsv"));
        let tsv = fs::read_to_string(&labels_file).handle_error(&format!(
            "No cached labels at {} (labels are downloaded outside this tool)",
            labels_file.display()
        ))?;
        let table = LabelTable::from_reviewed_tsv(&tsv)?;

        let score = fs::read_to_string(file)?;
        let with_beats = filter.filter(&score)?;
        let stream = ScoreStream::parse(&with_beats)?;

        let annotated = annotate(&stream, &Mode::InsertLabels(&table))?;
        batch::log_warnings(file, &annotated.warnings);
        let stripped = annotate(&annotated.stream, &Mode::StripSpines(BEAT_SPINE_PREFIX))?;
        let cleaned = annotate(&stripped.stream, &Mode::DeleteRedundantState(Cleanup::Full))?;

        let file_name = file
            .file_name()
            .ok_or_else(|| CliError::CommandError(format!("{} has no file name", file.display())))?;
        fs::write(self.out_dir.join(file_name), cleaned.stream.render())?;
        log::info!("Added DCML labels for {id}");
        Ok(())
    }
}
