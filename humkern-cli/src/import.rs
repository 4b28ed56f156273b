//! `humkern import` — convert labeled-span JSON exports into the YAML
//! annotation tables.
//!
//! Span exports reference score lines by number. The toolchain derives a
//! line-number → timepoint map for the piece's score; spans are translated
//! through it and grouped into the modulation, cadence, and sequence tables.

use std::collections::HashMap;
use std::path::Path;

use clap::Args;
use humkern::filter::{CommandFilter, StreamFilter};
use humkern::position::barline_measure;

use crate::error::ResultExt;
use crate::tables::{ImportFile, PieceLabels, PieceSpans, SpanLabel};
use crate::{batch, tables, CliError, CliResult};

/// Derives per-line measure/beat metadata: one output line per score line,
/// `<beat>\t<line number>` for data lines, barlines passed through.
const DEFAULT_FILTER: &str = "lnnr -p | composite | meter -r | extractxx -s 2,3 | ridxx -LGTIglid";

#[derive(Args)]
pub struct ImportOptions {
    /// Span-export JSON file or directory of .json files
    pub path: std::path::PathBuf,

    /// Directory containing the .krn scores the exports refer to
    #[arg(long, default_value = "kern")]
    pub scores_dir: std::path::PathBuf,

    /// Directory holding the YAML tables to merge into
    #[arg(long, default_value = ".")]
    pub tables_dir: std::path::PathBuf,

    /// Merge the converted annotations into the YAML tables
    #[arg(short, long)]
    pub overwrite: bool,

    /// Pipeline deriving the line-number → timepoint map
    #[arg(long, default_value = DEFAULT_FILTER)]
    pub filter_cmd: String,
}

impl ImportOptions {
    pub fn run(&self) -> CliResult<()> {
        let filter = CommandFilter::new(&self.filter_cmd);
        self.run_with_filter(&filter)
    }

    pub fn run_with_filter(&self, filter: &dyn StreamFilter) -> CliResult<()> {
        let files = batch::input_files(&self.path, "json")?;
        if files.is_empty() {
            log::warn!("No .json files found in {}", self.path.display());
            return Ok(());
        }

        let mut modulations = PieceLabels::new();
        let mut cadences = PieceSpans::new();
        let mut sequences = PieceSpans::new();
        batch::process_all(&files, |file| {
            self.process(file, filter, &mut modulations, &mut cadences, &mut sequences)
        })?;

        print_table("modulations.yaml", &modulations)?;
        print_table("cadences.yaml", &cadences)?;
        print_table("sequences.yaml", &sequences)?;

        if self.overwrite {
            log::info!("Overwriting existing YAML tables...");
            tables::merge_piece_table(&self.tables_dir.join("modulations.yaml"), &modulations)?;
            tables::merge_piece_table(&self.tables_dir.join("cadences.yaml"), &cadences)?;
            tables::merge_piece_table(&self.tables_dir.join("sequences.yaml"), &sequences)?;
        } else {
            log::info!("Tables not saved (pass --overwrite or -o to merge into the YAML files)");
        }
        Ok(())
    }

    fn process(
        &self,
        file: &Path,
        filter: &dyn StreamFilter,
        modulations: &mut PieceLabels,
        cadences: &mut PieceSpans,
        sequences: &mut PieceSpans,
    ) -> CliResult<()> {
        let import = ImportFile::read(file)?;
        let score_file = self.scores_dir.join(format!("{}.krn", import.piece_id));
        let score = std::fs::read_to_string(&score_file)?;
        let timepoints = line_timepoints(&filter.filter(&score)?)?;
        let lookup = |line: u32| {
            timepoints.get(&line).cloned().ok_or_else(|| {
                CliError::CommandError(format!(
                    "No timepoint for line {line} of {}",
                    score_file.display()
                ))
            })
        };

        let mut piece_modulations = Vec::new();
        for span in &import.modulations {
            let key = span.key.as_deref().ok_or_else(|| {
                CliError::CommandError(format!("Modulation without a key in {}", file.display()))
            })?;
            piece_modulations.push((lookup(span.start_line)?, key.trim().to_owned()));
        }
        modulations.insert(import.piece_id.clone(), piece_modulations);
        cadences.insert(import.piece_id.clone(), convert_spans(&import.cadences, &lookup)?);
        sequences.insert(import.piece_id.clone(), convert_spans(&import.sequences, &lookup)?);

        log::info!("Imported annotations for {}", import.piece_id);
        Ok(())
    }
}

fn convert_spans(
    spans: &[SpanLabel],
    lookup: &dyn Fn(u32) -> CliResult<String>,
) -> CliResult<Vec<(String, String, Vec<String>)>> {
    spans
        .iter()
        .map(|span| {
            let start = lookup(span.start_line)?;
            let end = lookup(span.end_line.unwrap_or(span.start_line))?;
            let tags = span.tags.iter().map(|tag| tag.trim().to_owned()).collect();
            Ok((start, end, tags))
        })
        .collect()
}

/// Parses the toolchain's measure/line output into a line-number → timepoint
/// map (`"measure/beat"` per score line).
fn line_timepoints(output: &str) -> CliResult<HashMap<u32, String>> {
    let mut map = HashMap::new();
    let mut measure = 0;
    for line in output.lines() {
        if line.starts_with('=') {
            if let Some(number) = barline_measure(line.split('\t').next().unwrap_or(line))? {
                measure = number;
            }
            continue;
        }
        let mut cells = line.split('\t');
        let beat = match cells.next() {
            Some(beat) => beat.replace('r', ""),
            None => continue,
        };
        if let Some(Ok(line_number)) = cells.next().map(str::parse::<u32>) {
            map.insert(line_number, format!("{measure}/{beat}"));
        }
    }
    Ok(map)
}

fn print_table<T: serde::Serialize>(name: &str, table: &T) -> CliResult<()> {
    let rendered = serde_yaml::to_string(table).handle_error("Could not render YAML table")?;
    println!();
    println!("Add to {name}:");
    println!("{}", "=".repeat(name.len() + 8));
    println!();
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_map_tracks_measures() {
        let output = "=1\n2r\t5\n3\t6\n=2\n1\t8";
        let map = line_timepoints(output).unwrap();
        assert_eq!(map[&5], "1/2");
        assert_eq!(map[&6], "1/3");
        assert_eq!(map[&8], "2/1");
        assert!(!map.contains_key(&7));
    }
}
